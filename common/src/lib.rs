//! Wire protocol shared between the camera node and its controller board.
//!
//! Frames are short tagged records: a tag followed by positional integer and
//! string fields. Two framings exist, a line based ASCII one and a binary
//! SLIP one. Both decode incrementally, one byte at a time, and never fail
//! loudly: malformed input is dropped and the decoder resynchronises on the
//! next delimiter.
#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

use alloc::vec::Vec;
use core::fmt;
use serde::{Deserialize, Serialize};

pub mod ascii;
pub mod frame;
pub mod packet;
pub mod slip;

pub use frame::*;
pub use packet::*;

/// Largest packet body (tag and fields, without delimiters) a decoder buffers.
pub const MAX_PACKET_LEN: usize = 256;

/// Which framing is spoken on the serial line.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum FrameEncoding {
    /// `tag field field\n`
    #[default]
    Ascii,
    /// RFC 1055 framed binary records
    Slip,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CodecError {
    /// Nothing between two delimiters
    Empty,
    /// The packet outgrew `MAX_PACKET_LEN` and was discarded
    Overflow,
    /// Tag missing, too long or not printable ASCII
    BadTag,
    /// SLIP escape byte followed by something other than ESC_END/ESC_ESC
    BadEscape,
}

impl fmt::Display for CodecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CodecError::Empty => write!(f, "empty packet"),
            CodecError::Overflow => write!(f, "packet longer than {} bytes", MAX_PACKET_LEN),
            CodecError::BadTag => write!(f, "invalid tag"),
            CodecError::BadEscape => write!(f, "invalid escape sequence"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for CodecError {}

/// Incremental decoder for either framing.
#[derive(Debug)]
pub enum Decoder {
    Ascii(ascii::AsciiDecoder),
    Slip(slip::SlipDecoder),
}

impl Decoder {
    pub fn new(encoding: FrameEncoding) -> Self {
        match encoding {
            FrameEncoding::Ascii => Decoder::Ascii(ascii::AsciiDecoder::new()),
            FrameEncoding::Slip => Decoder::Slip(slip::SlipDecoder::new()),
        }
    }

    /// Feed one byte. Returns a packet once a complete, well-formed record
    /// has been accumulated.
    pub fn push(&mut self, byte: u8) -> Option<Packet> {
        match self {
            Decoder::Ascii(decoder) => decoder.push(byte),
            Decoder::Slip(decoder) => decoder.push(byte),
        }
    }
}

/// Serialize a packet in the given framing, delimiters included.
pub fn encode(encoding: FrameEncoding, packet: &OutboundPacket) -> Vec<u8> {
    match encoding {
        FrameEncoding::Ascii => ascii::encode(packet),
        FrameEncoding::Slip => slip::encode(packet),
    }
}
