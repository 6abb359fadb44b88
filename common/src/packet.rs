use alloc::{string::String, vec::Vec};

use crate::{CodecError, FrameEncoding};

/// Longest tag accepted on the wire
pub const MAX_TAG_LEN: usize = 15;

pub type Tag = heapless::String<MAX_TAG_LEN>;

/// A complete inbound record: its tag plus the still untyped field bytes.
/// Fields are read positionally through [`Packet::fields`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Packet {
    encoding: FrameEncoding,
    tag: Tag,
    body: Vec<u8>,
}

impl Packet {
    pub(crate) fn new(encoding: FrameEncoding, tag: Tag, body: Vec<u8>) -> Self {
        Self {
            encoding,
            tag,
            body,
        }
    }

    pub fn tag(&self) -> &str {
        self.tag.as_str()
    }

    /// Exact, case sensitive tag comparison
    pub fn full_match(&self, tag: &str) -> bool {
        self.tag.as_str() == tag
    }

    pub fn fields(&self) -> FieldReader<'_> {
        FieldReader {
            encoding: self.encoding,
            rest: &self.body,
        }
    }
}

/// Cursor over the fields of a packet. Reading past the last field yields
/// zero for integers and an empty string for strings.
pub struct FieldReader<'a> {
    encoding: FrameEncoding,
    rest: &'a [u8],
}

impl<'a> FieldReader<'a> {
    pub fn next_int(&mut self) -> i32 {
        match self.encoding {
            FrameEncoding::Ascii => self.next_token().map(parse_decimal).unwrap_or(0),
            FrameEncoding::Slip => {
                if self.rest.len() < 4 {
                    self.rest = &[];
                    return 0;
                }
                let mut word = [0u8; 4];
                word.copy_from_slice(&self.rest[..4]);
                self.rest = &self.rest[4..];
                i32::from_le_bytes(word)
            }
        }
    }

    /// Next field as a string of at most `N` bytes, truncated on a character
    /// boundary.
    pub fn next_string<const N: usize>(&mut self) -> heapless::String<N> {
        let raw = match self.encoding {
            FrameEncoding::Ascii => self.next_token(),
            FrameEncoding::Slip => self.next_terminated(),
        };
        raw.map(bounded_from_bytes).unwrap_or_default()
    }

    pub fn is_exhausted(&self) -> bool {
        match self.encoding {
            FrameEncoding::Ascii => self.rest.iter().all(|b| *b == b' '),
            FrameEncoding::Slip => self.rest.is_empty(),
        }
    }

    fn next_token(&mut self) -> Option<&'a [u8]> {
        let start = self.rest.iter().position(|b| *b != b' ')?;
        let rest = &self.rest[start..];
        let end = rest.iter().position(|b| *b == b' ').unwrap_or(rest.len());
        self.rest = &rest[end..];
        Some(&rest[..end])
    }

    fn next_terminated(&mut self) -> Option<&'a [u8]> {
        if self.rest.is_empty() {
            return None;
        }
        let end = self.rest.iter().position(|b| *b == 0).unwrap_or(self.rest.len());
        let value = &self.rest[..end];
        self.rest = self.rest.get(end + 1..).unwrap_or(&[]);
        Some(value)
    }
}

/// A single outbound field
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Field {
    Int(i32),
    Str(String),
}

/// Builder for a record to be encoded and written to the line.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OutboundPacket {
    tag: String,
    fields: Vec<Field>,
}

impl OutboundPacket {
    pub fn new(tag: &str) -> Self {
        Self {
            tag: String::from(tag),
            fields: Vec::new(),
        }
    }

    pub fn int(mut self, value: i32) -> Self {
        self.fields.push(Field::Int(value));
        self
    }

    pub fn string(mut self, value: &str) -> Self {
        self.fields.push(Field::Str(String::from(value)));
        self
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }
}

/// Copy `text` into a bounded string, cutting it at the last character
/// boundary that fits.
pub fn bounded<const N: usize>(text: &str) -> heapless::String<N> {
    let mut end = text.len().min(N);
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    let mut out = heapless::String::new();
    // Cannot fail, `end <= N`
    let _ = out.push_str(&text[..end]);
    out
}

fn bounded_from_bytes<const N: usize>(bytes: &[u8]) -> heapless::String<N> {
    match core::str::from_utf8(bytes) {
        Ok(text) => bounded(text),
        Err(e) => bounded(core::str::from_utf8(&bytes[..e.valid_up_to()]).unwrap_or("")),
    }
}

pub(crate) fn parse_tag(bytes: &[u8]) -> Result<Tag, CodecError> {
    if bytes.is_empty() || bytes.len() > MAX_TAG_LEN || !bytes.iter().all(u8::is_ascii_graphic) {
        return Err(CodecError::BadTag);
    }
    let text = core::str::from_utf8(bytes).map_err(|_| CodecError::BadTag)?;
    Ok(bounded(text))
}

/// `atoi` semantics: optional sign, leading digits, anything else ends the
/// number. No digits reads as zero.
fn parse_decimal(token: &[u8]) -> i32 {
    let (negative, digits) = match token.first() {
        Some(b'-') => (true, &token[1..]),
        Some(b'+') => (false, &token[1..]),
        _ => (false, token),
    };

    let mut value: i64 = 0;
    for digit in digits.iter().take_while(|b| b.is_ascii_digit()) {
        value = (value * 10 + i64::from(digit - b'0')).min(i64::from(i32::MAX) + 1);
    }
    if negative {
        value = -value;
    }
    value.clamp(i64::from(i32::MIN), i64::from(i32::MAX)) as i32
}
