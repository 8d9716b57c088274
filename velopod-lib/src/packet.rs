use crate::constants::*;
use bytes::{BufMut, Bytes, BytesMut};
use num_enum::{IntoPrimitive, TryFromPrimitive};
use strum_macros::Display;

/// The recognized first bytes of a frame. Everything else on the wire
/// is line noise and gets skipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, IntoPrimitive, TryFromPrimitive)]
#[repr(u8)]
pub enum PacketTag {
    CommandAck = TAG_COMMAND_ACK,
    Ready = TAG_READY,
    Ack = TAG_ACK,
    Interrupt = TAG_INTERRUPT,
    Message = TAG_MESSAGE,
}

/// A single link-layer frame.
///
/// Four singleton control packets carry the handshake; `Message`
/// carries up to 127 bytes of application payload behind an
/// `F7 7F <len>` prefix and a trailing XOR checksum.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Packet {
    CommandAck,
    Ready,
    Ack,
    Interrupt,
    Message { data: Bytes },
}

/// XOR fold of the length byte and every data byte, inverted.
pub fn message_checksum(data: &[u8]) -> u8 {
    data.iter().fold(0xFF ^ data.len() as u8, |acc, b| acc ^ b)
}

impl Packet {
    pub fn message(data: impl Into<Bytes>) -> Packet {
        let data = data.into();
        debug_assert!(data.len() <= MAX_MESSAGE_DATA);
        Packet::Message { data }
    }

    pub fn tag(&self) -> PacketTag {
        match self {
            Packet::CommandAck => PacketTag::CommandAck,
            Packet::Ready => PacketTag::Ready,
            Packet::Ack => PacketTag::Ack,
            Packet::Interrupt => PacketTag::Interrupt,
            Packet::Message { .. } => PacketTag::Message,
        }
    }

    /// How many more bytes are needed before [`Packet::parse`] can be
    /// attempted on `prefix`. `None` means the frame cannot become
    /// valid and must be discarded.
    ///
    /// Control packets are complete at one byte. A data packet
    /// declares its payload length in the third byte, so the answer
    /// is exact once three bytes have arrived.
    pub fn read_length(prefix: &[u8]) -> Option<usize> {
        match PacketTag::try_from(*prefix.first()?).ok()? {
            PacketTag::Message => {
                if prefix.len() < 3 {
                    return Some(MESSAGE_OVERHEAD - prefix.len());
                }
                if prefix[1] != MESSAGE_PREFIX_1 {
                    return None;
                }
                let total = prefix[2] as usize + MESSAGE_OVERHEAD;
                Some(total.saturating_sub(prefix.len()))
            }
            _ => Some(0),
        }
    }

    /// Exact-length parse of a complete frame. Returns `None` on a bad
    /// prefix, a length mismatch, an oversized payload, or a checksum
    /// failure.
    pub fn parse(buf: &[u8]) -> Option<Packet> {
        match PacketTag::try_from(*buf.first()?).ok()? {
            PacketTag::CommandAck if buf.len() == 1 => Some(Packet::CommandAck),
            PacketTag::Ready if buf.len() == 1 => Some(Packet::Ready),
            PacketTag::Ack if buf.len() == 1 => Some(Packet::Ack),
            PacketTag::Interrupt if buf.len() == 1 => Some(Packet::Interrupt),
            PacketTag::Message => {
                if buf.len() < MESSAGE_OVERHEAD || buf[1] != MESSAGE_PREFIX_1 {
                    return None;
                }
                let len = buf[2] as usize;
                if len > MAX_MESSAGE_DATA || len + MESSAGE_OVERHEAD != buf.len() {
                    return None;
                }
                let data = &buf[3..3 + len];
                if message_checksum(data) != buf[buf.len() - 1] {
                    return None;
                }
                Some(Packet::Message {
                    data: Bytes::copy_from_slice(data),
                })
            }
            _ => None,
        }
    }

    /// The exact bytes this packet occupies on the wire.
    pub fn wire_value(&self) -> Bytes {
        match self {
            Packet::Message { data } => {
                let mut buf = BytesMut::with_capacity(data.len() + MESSAGE_OVERHEAD);
                buf.put_u8(TAG_MESSAGE);
                buf.put_u8(MESSAGE_PREFIX_1);
                buf.put_u8(data.len() as u8);
                buf.put_slice(data);
                buf.put_u8(message_checksum(data));
                buf.freeze()
            }
            other => Bytes::copy_from_slice(&[other.tag().into()]),
        }
    }

    /// A terminal fragment ends an application message: its payload is
    /// strictly shorter than the 63-byte split boundary.
    pub fn is_terminal(&self) -> bool {
        match self {
            Packet::Message { data } => data.len() < MESSAGE_SPLIT,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn checksum_of_empty_data_is_ff() {
        assert_eq!(message_checksum(&[]), 0xFF);
    }

    #[test]
    fn control_packets_need_no_more_bytes() {
        for tag in [TAG_COMMAND_ACK, TAG_READY, TAG_ACK, TAG_INTERRUPT] {
            assert_eq!(Packet::read_length(&[tag]), Some(0));
        }
    }

    #[test]
    fn unknown_tag_is_rejected() {
        assert_eq!(Packet::read_length(&[0x42]), None);
        assert_eq!(Packet::parse(&[0x42]), None);
    }

    #[test]
    fn message_prefix_mismatch_is_rejected() {
        assert_eq!(Packet::read_length(&[TAG_MESSAGE, 0x00, 0x05]), None);
    }

    #[test]
    fn message_read_length_counts_down() {
        assert_eq!(Packet::read_length(&[TAG_MESSAGE]), Some(3));
        assert_eq!(Packet::read_length(&[TAG_MESSAGE, MESSAGE_PREFIX_1]), Some(2));
        // Three bytes in: 3 payload bytes plus the checksum remain.
        assert_eq!(
            Packet::read_length(&[TAG_MESSAGE, MESSAGE_PREFIX_1, 0x03]),
            Some(4)
        );
    }
}
