//! Line based framing: `tag field field\n`.

use alloc::{string::ToString, vec::Vec};
use log::warn;

use crate::{
    packet::parse_tag, CodecError, Field, FrameEncoding, OutboundPacket, Packet, MAX_PACKET_LEN,
};

#[derive(Debug, Default)]
pub struct AsciiDecoder {
    buffer: Vec<u8>,
    /// Set once the current line overflowed; everything up to the next
    /// newline is thrown away.
    discarding: bool,
}

impl AsciiDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, byte: u8) -> Option<Packet> {
        match byte {
            b'\r' => None,
            b'\n' => {
                let body = core::mem::take(&mut self.buffer);
                if core::mem::replace(&mut self.discarding, false) {
                    warn!("Dropping ASCII packet: {}", CodecError::Overflow);
                    return None;
                }
                match parse(&body) {
                    Ok(packet) => Some(packet),
                    Err(CodecError::Empty) => None,
                    Err(e) => {
                        warn!("Dropping ASCII packet: {}", e);
                        None
                    }
                }
            }
            _ if self.discarding => None,
            _ => {
                if self.buffer.len() >= MAX_PACKET_LEN {
                    self.buffer.clear();
                    self.discarding = true;
                } else {
                    self.buffer.push(byte);
                }
                None
            }
        }
    }
}

fn parse(line: &[u8]) -> Result<Packet, CodecError> {
    let start = line
        .iter()
        .position(|b| *b != b' ')
        .ok_or(CodecError::Empty)?;
    let line = &line[start..];
    let tag_end = line.iter().position(|b| *b == b' ').unwrap_or(line.len());
    let tag = parse_tag(&line[..tag_end])?;

    Ok(Packet::new(
        FrameEncoding::Ascii,
        tag,
        line[tag_end..].to_vec(),
    ))
}

pub fn encode(packet: &OutboundPacket) -> Vec<u8> {
    let mut out = Vec::with_capacity(MAX_PACKET_LEN);
    out.extend_from_slice(packet.tag().as_bytes());
    for field in packet.fields() {
        out.push(b' ');
        match field {
            Field::Int(value) => out.extend_from_slice(value.to_string().as_bytes()),
            Field::Str(value) => out.extend_from_slice(value.as_bytes()),
        }
    }
    out.push(b'\n');
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feed(decoder: &mut AsciiDecoder, bytes: &[u8]) -> Vec<Packet> {
        bytes.iter().filter_map(|b| decoder.push(*b)).collect()
    }

    #[test]
    fn test_encode_layout() {
        let packet = OutboundPacket::new("WiFi")
            .int(1)
            .string("HomeNet")
            .string("secret123")
            .string("10.0.0.2");
        assert_eq!(encode(&packet), b"WiFi 1 HomeNet secret123 10.0.0.2\n".to_vec());
    }

    #[test]
    fn test_partial_packets_wait_for_newline() {
        let mut decoder = AsciiDecoder::new();
        assert!(feed(&mut decoder, b"sLP 0 1").is_empty());

        let packets = feed(&mut decoder, b" 0\r\n");
        assert_eq!(packets.len(), 1);
        let mut fields = packets[0].fields();
        assert_eq!(
            (fields.next_int(), fields.next_int(), fields.next_int()),
            (0, 1, 0)
        );
    }

    #[test]
    fn test_blank_lines_are_ignored() {
        let mut decoder = AsciiDecoder::new();
        assert!(feed(&mut decoder, b"\n   \n\r\n").is_empty());
    }

    #[test]
    fn test_overflow_resynchronises() {
        let mut decoder = AsciiDecoder::new();
        let mut bytes = b"WiFi ".to_vec();
        bytes.extend(core::iter::repeat(b'x').take(MAX_PACKET_LEN * 2));
        bytes.push(b'\n');
        assert!(feed(&mut decoder, &bytes).is_empty());

        let packets = feed(&mut decoder, b"gIP 10.0.0.9\n");
        assert_eq!(packets.len(), 1);
        assert!(packets[0].full_match("gIP"));
    }
}
