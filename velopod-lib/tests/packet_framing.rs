//! Tests for frame encoding, parsing, and checksums

mod common;

use common::*;

#[test]
fn empty_message_wire_form() {
    let packet = Packet::message(Bytes::new());
    assert_eq!(packet.wire_value().as_ref(), &[0xF7, 0x7F, 0x00, 0xFF]);
    assert_eq!(Packet::parse(&[0xF7, 0x7F, 0x00, 0xFF]), Some(packet));
}

#[test]
fn three_byte_message_wire_form() {
    // 0xFF ^ 0x03 ^ 0x01 ^ 0x02 ^ 0x03 = 0xFC
    let packet = Packet::message(Bytes::from_static(&[0x01, 0x02, 0x03]));
    assert_eq!(
        packet.wire_value().as_ref(),
        &[0xF7, 0x7F, 0x03, 0x01, 0x02, 0x03, 0xFC]
    );
}

#[test]
fn parse_inverts_wire_value_for_every_kind() {
    let packets = [
        Packet::CommandAck,
        Packet::Ready,
        Packet::Ack,
        Packet::Interrupt,
        Packet::message(Bytes::new()),
        Packet::message(Bytes::from_static(b"hello")),
        Packet::message(Bytes::from(vec![0xAB; 127])),
    ];
    for packet in packets {
        let wire = packet.wire_value();
        assert_eq!(
            Packet::parse(&wire),
            Some(packet.clone()),
            "round trip failed for {packet:?}"
        );
    }
}

#[test]
fn checksum_matches_definition() {
    for data in [&b""[..], b"\x01", b"\x01\x02\x03", &[0xFF; 127]] {
        let expected = data
            .iter()
            .fold(0xFFu8 ^ data.len() as u8, |acc, b| acc ^ b);
        assert_eq!(message_checksum(data), expected);
    }
}

#[test]
fn corrupted_checksum_is_rejected() {
    let mut wire = Packet::message(Bytes::from_static(b"abc")).wire_value().to_vec();
    let last = wire.len() - 1;
    wire[last] ^= 0x01;
    assert_eq!(Packet::parse(&wire), None);
}

#[test]
fn declared_length_must_match_buffer() {
    // Claims 5 data bytes but carries 3.
    let wire = [0xF7, 0x7F, 0x05, 0x01, 0x02, 0x03, 0xF8];
    assert_eq!(Packet::parse(&wire), None);
}

#[test]
fn oversized_length_is_rejected() {
    let mut wire = vec![0xF7, 0x7F, 0x80];
    wire.extend(std::iter::repeat_n(0u8, 0x80));
    wire.push(message_checksum(&wire[3..]));
    assert_eq!(Packet::parse(&wire), None);
}

#[test]
fn terminal_boundary_is_63() {
    assert!(Packet::message(Bytes::from(vec![0u8; 62])).is_terminal());
    assert!(!Packet::message(Bytes::from(vec![0u8; 63])).is_terminal());
    assert!(Packet::message(Bytes::new()).is_terminal());
}

#[test]
fn control_packet_wire_forms() {
    assert_eq!(Packet::CommandAck.wire_value().as_ref(), &[0x00]);
    assert_eq!(Packet::Ready.wire_value().as_ref(), &[0x80]);
    assert_eq!(Packet::Ack.wire_value().as_ref(), &[0x90]);
    assert_eq!(Packet::Interrupt.wire_value().as_ref(), &[0xA0]);
}
