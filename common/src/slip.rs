//! Binary framing, RFC 1055 SLIP.
//!
//! Body layout: tag bytes, NUL, then the fields. Integers are 4 bytes little
//! endian, strings are NUL terminated.

use alloc::vec::Vec;
use log::warn;

use crate::{
    packet::parse_tag, CodecError, Field, FrameEncoding, OutboundPacket, Packet, MAX_PACKET_LEN,
};

pub const END: u8 = 0xC0;
pub const ESC: u8 = 0xDB;
pub const ESC_END: u8 = 0xDC;
pub const ESC_ESC: u8 = 0xDD;

#[derive(Debug, Default)]
pub struct SlipDecoder {
    buffer: Vec<u8>,
    escaped: bool,
    /// Current packet is broken, skip to the next END
    discarding: bool,
}

impl SlipDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, byte: u8) -> Option<Packet> {
        if byte == END {
            let body = core::mem::take(&mut self.buffer);
            let escaped = core::mem::replace(&mut self.escaped, false);
            if core::mem::replace(&mut self.discarding, false) {
                return None;
            }
            if escaped {
                warn!("Dropping SLIP packet: {}", CodecError::BadEscape);
                return None;
            }
            return match parse(&body) {
                Ok(packet) => Some(packet),
                Err(CodecError::Empty) => None,
                Err(e) => {
                    warn!("Dropping SLIP packet: {}", e);
                    None
                }
            };
        }

        if self.discarding {
            return None;
        }

        let value = if self.escaped {
            self.escaped = false;
            match byte {
                ESC_END => END,
                ESC_ESC => ESC,
                _ => {
                    self.discard(CodecError::BadEscape);
                    return None;
                }
            }
        } else if byte == ESC {
            self.escaped = true;
            return None;
        } else {
            byte
        };

        if self.buffer.len() >= MAX_PACKET_LEN {
            self.discard(CodecError::Overflow);
        } else {
            self.buffer.push(value);
        }
        None
    }

    fn discard(&mut self, reason: CodecError) {
        warn!("Dropping SLIP packet: {}", reason);
        self.buffer.clear();
        self.escaped = false;
        self.discarding = true;
    }
}

fn parse(body: &[u8]) -> Result<Packet, CodecError> {
    if body.is_empty() {
        return Err(CodecError::Empty);
    }
    let tag_end = body.iter().position(|b| *b == 0).ok_or(CodecError::BadTag)?;
    let tag = parse_tag(&body[..tag_end])?;

    Ok(Packet::new(
        FrameEncoding::Slip,
        tag,
        body[tag_end + 1..].to_vec(),
    ))
}

pub fn encode(packet: &OutboundPacket) -> Vec<u8> {
    let mut body = Vec::with_capacity(MAX_PACKET_LEN);
    body.extend_from_slice(packet.tag().as_bytes());
    body.push(0);
    for field in packet.fields() {
        match field {
            Field::Int(value) => body.extend_from_slice(&value.to_le_bytes()),
            Field::Str(value) => {
                body.extend_from_slice(value.as_bytes());
                body.push(0);
            }
        }
    }

    let mut out = Vec::with_capacity(body.len() + 2);
    out.push(END);
    for byte in body {
        match byte {
            END => out.extend_from_slice(&[ESC, ESC_END]),
            ESC => out.extend_from_slice(&[ESC, ESC_ESC]),
            _ => out.push(byte),
        }
    }
    out.push(END);
    out
}
