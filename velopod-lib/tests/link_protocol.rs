//! Tests for the ready/ack/interrupt handshake, fragment reassembly,
//! and outbound segmentation

mod common;

use common::*;
use std::thread;

fn wire(packet: &Packet) -> Vec<u8> {
    packet.wire_value().to_vec()
}

#[test]
fn read_packet_skips_line_noise() {
    let (channel, written) = ScriptedChannel::from_bytes(&[&[0x13, 0x37], &wire(&Packet::Ready)]);
    let mut link = SerialLink::new(channel, LinkRole::Device);
    assert_eq!(link.read_packet().unwrap(), Packet::Ready);
    assert!(written.borrow().is_empty(), "noise must not provoke an interrupt");
}

#[test]
fn read_packet_interrupts_on_bad_checksum_and_recovers() {
    let mut corrupted = wire(&Packet::message(Bytes::from_static(b"abc")));
    let last = corrupted.len() - 1;
    corrupted[last] ^= 0xFF;

    let good = Packet::message(Bytes::from_static(b"xyz"));
    let (channel, written) = ScriptedChannel::from_bytes(&[&corrupted, &wire(&good)]);
    let mut link = SerialLink::new(channel, LinkRole::Device);

    assert_eq!(link.read_packet().unwrap(), good);
    assert_eq!(written.borrow().as_slice(), &[0xA0], "one interrupt for the bad frame");
}

#[test]
fn read_packet_interrupts_on_mid_frame_timeout() {
    let script: Vec<Step> = [0xF7u8, 0x7F, 0x0A]
        .iter()
        .map(|b| Step::Byte(*b))
        .chain([Step::Timeout])
        .chain(wire(&Packet::Ack).into_iter().map(Step::Byte))
        .collect();
    let (channel, written) = ScriptedChannel::new(script);
    let mut link = SerialLink::new(channel, LinkRole::Device);

    assert_eq!(link.read_packet().unwrap(), Packet::Ack);
    assert_eq!(written.borrow().as_slice(), &[0xA0]);
}

#[test]
fn read_message_reassembles_two_fragments() {
    // Ready, 63-byte fragment, Ready, 10-byte terminal fragment.
    let first: Vec<u8> = (0..63).collect();
    let second: Vec<u8> = (63..73).collect();
    let (channel, written) = ScriptedChannel::from_bytes(&[
        &wire(&Packet::Ready),
        &wire(&Packet::message(Bytes::from(first.clone()))),
        &wire(&Packet::Ready),
        &wire(&Packet::message(Bytes::from(second.clone()))),
    ]);
    let mut link = SerialLink::new(channel, LinkRole::Device);

    let message = link.read_message().unwrap();
    assert_eq!(message.len(), 73);
    assert_eq!(&message[..63], first.as_slice());
    assert_eq!(&message[63..], second.as_slice());

    // Ack per handshake step, CommandAck to finish (device side).
    assert_eq!(written.borrow().as_slice(), &[0x90, 0x90, 0x90, 0x00]);
}

#[test]
fn read_message_host_side_finishes_with_ack() {
    let (channel, written) = ScriptedChannel::from_bytes(&[
        &wire(&Packet::Ready),
        &wire(&Packet::message(Bytes::from_static(b"\x0a\x12\x34"))),
    ]);
    let mut link = SerialLink::new(channel, LinkRole::Host);

    assert_eq!(link.read_message().unwrap().as_ref(), b"\x0a\x12\x34");
    assert_eq!(written.borrow().as_slice(), &[0x90, 0x90]);
}

#[test]
fn read_message_interrupts_unexpected_packet_then_recovers() {
    let (channel, written) = ScriptedChannel::from_bytes(&[
        &wire(&Packet::Ack), // out of place
        &wire(&Packet::Ready),
        &wire(&Packet::message(Bytes::from_static(b"ok"))),
    ]);
    let mut link = SerialLink::new(channel, LinkRole::Device);

    assert_eq!(link.read_message().unwrap().as_ref(), b"ok");
    assert_eq!(written.borrow().as_slice(), &[0xA0, 0x90, 0x00]);
}

#[test]
fn write_message_none_is_a_lone_command_ack() {
    let (channel, written) = ScriptedChannel::new([]);
    let mut link = SerialLink::new(channel, LinkRole::Device);
    link.write_message(None).unwrap();
    assert_eq!(written.borrow().as_slice(), &[0x00]);
}

#[test]
fn write_message_aborts_when_ready_is_not_acked() {
    let (channel, written) = ScriptedChannel::from_bytes(&[&wire(&Packet::Interrupt)]);
    let mut link = SerialLink::new(channel, LinkRole::Host);
    link.write_message(Some(b"payload")).unwrap();
    // Ready went out, then the interrupt reply provoked our own.
    assert_eq!(written.borrow().as_slice(), &[0x80, 0xA0]);
}

/// Drive a writer and a reader over the in-memory pipe and hand back
/// the reassembled message.
fn round_trip_message(payload: Vec<u8>) -> Vec<u8> {
    let (host_end, device_end) = pipe();
    let reader = thread::spawn(move || {
        let mut link = SerialLink::new(device_end, LinkRole::Device);
        link.read_message().map(|m| m.to_vec())
    });
    let mut link = SerialLink::new(host_end, LinkRole::Host);
    link.write_message(Some(&payload)).unwrap();
    reader.join().expect("reader thread panicked").unwrap()
}

#[test]
fn segmentation_round_trips_at_boundaries() {
    for len in [0usize, 1, 62, 63, 64, 126, 127, 200, 1000] {
        let payload: Vec<u8> = (0..len).map(|i| (i % 251) as u8).collect();
        assert_eq!(
            round_trip_message(payload.clone()),
            payload,
            "length {len} failed"
        );
    }
}

#[test]
fn device_to_host_response_round_trips() {
    let payload: Vec<u8> = (0..130u32).map(|i| (i * 7 % 256) as u8).collect();
    let (host_end, device_end) = pipe();
    let writer = thread::spawn(move || {
        let mut link = SerialLink::new(device_end, LinkRole::Device);
        link.write_message(Some(&payload.clone())).map(|_| payload)
    });
    let mut link = SerialLink::new(host_end, LinkRole::Host);
    let received = link.read_message().unwrap();
    let sent = writer.join().expect("writer thread panicked").unwrap();
    assert_eq!(received.as_ref(), sent.as_slice());
}
