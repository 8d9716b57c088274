//! Half-duplex message carrier over a byte channel.
//!
//! Both ends of the wire run the same state machine; only the ack
//! emitted (and expected) when a message completes differs between
//! the host and the device. The handshake for each fragment is
//!
//! ```text
//! sender            receiver
//!   Ready   ------->
//!           <-------  Ack
//!   Message ------->
//!           <-------  Ack            (mid-message fragment)
//!           <-------  completion ack (terminal fragment)
//! ```
//!
//! Anything unexpected is answered with an `Interrupt`, after which
//! both sides fall back to hunting for the next recognizable frame.

use crate::channel::ByteChannel;
use crate::constants::{MESSAGE_SPLIT, SHORT_TIMEOUT};
use crate::error::NewtonError;
use crate::packet::{Packet, PacketTag};
use bytes::{Bytes, BytesMut};
use tracing::{debug, trace, warn};

/// Which party this end of the link plays.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkRole {
    Host,
    Device,
}

pub struct SerialLink<C> {
    channel: C,
    role: LinkRole,
}

impl<C: ByteChannel> SerialLink<C> {
    pub fn new(channel: C, role: LinkRole) -> Self {
        Self { channel, role }
    }

    pub fn role(&self) -> LinkRole {
        self.role
    }

    /// The ack that finishes an inbound message.
    fn ack_to_send(&self) -> Packet {
        match self.role {
            LinkRole::Device => Packet::CommandAck,
            LinkRole::Host => Packet::Ack,
        }
    }

    /// The ack the peer owes us after the terminal outbound fragment.
    fn expected_write_ack(&self) -> Packet {
        match self.role {
            LinkRole::Device => Packet::Ack,
            LinkRole::Host => Packet::CommandAck,
        }
    }

    /// Block until a complete, well-formed packet arrives.
    ///
    /// Unrecognized bytes between frames are dropped without comment
    /// (the device's UART is noisy at power-up). Once a frame has
    /// begun, a malformed prefix, checksum failure, or mid-frame
    /// timeout discards the frame and announces the damage with an
    /// `Interrupt`.
    pub fn read_packet(&mut self) -> Result<Packet, NewtonError> {
        'resync: loop {
            self.channel.set_read_timeout(None)?;
            let mut first = [0u8; 1];
            if self.channel.read(&mut first)? == 0 {
                continue;
            }
            if PacketTag::try_from(first[0]).is_err() {
                trace!(byte = format_args!("{:02x}", first[0]), "skipping noise byte");
                continue;
            }

            let mut frame = vec![first[0]];
            self.channel.set_read_timeout(Some(SHORT_TIMEOUT))?;
            loop {
                let Some(remain) = Packet::read_length(&frame) else {
                    warn!(frame = %hex::encode(&frame), "unparseable frame prefix");
                    self.write_packet(&Packet::Interrupt)?;
                    continue 'resync;
                };
                if remain == 0 {
                    break;
                }
                let mut chunk = vec![0u8; remain];
                let got = self.channel.read_fully(&mut chunk)?;
                frame.extend_from_slice(&chunk[..got]);
                if got < remain {
                    warn!(
                        frame = %hex::encode(&frame),
                        missing = remain - got,
                        "timeout inside frame"
                    );
                    self.write_packet(&Packet::Interrupt)?;
                    continue 'resync;
                }
            }

            match Packet::parse(&frame) {
                Some(packet) => {
                    debug!(?packet, "received packet");
                    return Ok(packet);
                }
                None => {
                    warn!(frame = %hex::encode(&frame), "invalid packet");
                    self.write_packet(&Packet::Interrupt)?;
                    continue 'resync;
                }
            }
        }
    }

    /// Put one packet on the wire. A short write is logged and left
    /// for the peer to time out on.
    pub fn write_packet(&mut self, packet: &Packet) -> Result<(), NewtonError> {
        self.channel.set_read_timeout(Some(SHORT_TIMEOUT))?;
        let wire = packet.wire_value();
        trace!(tx = %hex::encode(&wire), "wire write");
        let written = self.channel.write(&wire)?;
        if written == wire.len() {
            debug!(?packet, "sent packet");
        } else {
            warn!(?packet, written, expected = wire.len(), "short write");
        }
        Ok(())
    }

    /// Receive one complete application message, reassembling its
    /// fragments. Fragments already received survive an interrupted
    /// handshake; the peer resumes with the next fragment.
    pub fn read_message(&mut self) -> Result<Bytes, NewtonError> {
        let mut assembled = BytesMut::new();
        loop {
            let packet = self.read_packet()?;
            if packet != Packet::Ready {
                warn!(?packet, "expected ready");
                self.write_packet(&Packet::Interrupt)?;
                continue;
            }
            self.write_packet(&Packet::Ack)?;

            let packet = self.read_packet()?;
            let Packet::Message { data } = packet else {
                warn!(?packet, "expected message fragment");
                self.write_packet(&Packet::Interrupt)?;
                continue;
            };
            let terminal = data.len() < MESSAGE_SPLIT;
            assembled.extend_from_slice(&data);

            if terminal {
                self.write_packet(&self.ack_to_send())?;
                let message = assembled.freeze();
                debug!(len = message.len(), data = %hex::encode(&message), "read message");
                return Ok(message);
            }
            self.write_packet(&Packet::Ack)?;
            debug!(assembled = assembled.len(), "read partial message");
        }
    }

    /// Send an application message, or the lone `CommandAck` that
    /// stands in for "command accepted, nothing to say" when `message`
    /// is `None`.
    ///
    /// The payload goes out in fragments of exactly 63 bytes with a
    /// final short fragment; a payload that is a multiple of 63 bytes
    /// (including the empty one) gets an empty terminal fragment so
    /// the receiver always sees an end marker. An interrupted
    /// handshake quiesces the link and abandons the message.
    pub fn write_message(&mut self, message: Option<&[u8]>) -> Result<(), NewtonError> {
        let Some(message) = message else {
            self.write_packet(&Packet::CommandAck)?;
            return Ok(());
        };

        let mut parts: Vec<&[u8]> = message.chunks(MESSAGE_SPLIT).collect();
        if message.len() % MESSAGE_SPLIT == 0 {
            parts.push(&[]);
        }
        for part in parts {
            // Non-terminal fragments are acknowledged with a plain
            // Ack; only the terminal fragment draws the role-specific
            // completion ack.
            let expected = if part.len() < MESSAGE_SPLIT {
                self.expected_write_ack()
            } else {
                Packet::Ack
            };
            if !self.write_message_part(part, expected)? {
                return Ok(());
            }
        }
        debug!(len = message.len(), "wrote message");
        Ok(())
    }

    fn write_message_part(&mut self, part: &[u8], expected_ack: Packet) -> Result<bool, NewtonError> {
        self.write_packet(&Packet::Ready)?;
        let packet = self.read_packet()?;
        if packet != Packet::Ack {
            warn!(?packet, "unexpected reply to ready");
            self.write_packet(&Packet::Interrupt)?;
            return Ok(false);
        }

        self.write_packet(&Packet::message(Bytes::copy_from_slice(part)))?;
        let packet = self.read_packet()?;
        if packet != expected_ack {
            warn!(?packet, ?expected_ack, "unexpected completion ack");
            self.write_packet(&Packet::Interrupt)?;
            return Ok(false);
        }
        trace!(len = part.len(), "wrote message fragment");
        Ok(true)
    }
}
