//! String content representations.
//!
//! A [`MutableString`](crate::MutableString) owns exactly one [`Content`].
//! Each variant owns its storage outright; a representation switch replaces
//! the whole variant and drops the old storage.
//!
//! Native units: the text variants count UTF-16 code units, the byte
//! variants count bytes.

mod compare;
mod mutate;
mod search;
mod text;

use std::borrow::Cow;
use std::sync::Arc;

use crate::encoding::Encoding;
use crate::error::{Result, StringError};

pub(crate) use search::{find, rfind};
pub(crate) use text::TextContent;

/// Which representation currently backs a string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Representation {
    /// Immutable shared text, as produced by literals.
    Text,
    /// Mutable UTF-16 buffer.
    Chars,
    /// Mutable byte buffer.
    Bytes,
    /// Mutable byte buffer whose bytes are read directly as characters.
    ByteChars,
}

#[derive(Clone, Debug)]
pub(crate) enum Content {
    Text(TextContent),
    Chars(Vec<u16>),
    Bytes(Vec<u8>),
    ByteChars(Vec<u8>),
}

impl Default for Content {
    fn default() -> Self {
        Content::Chars(Vec::new())
    }
}

impl Content {
    pub(crate) fn text(data: Arc<str>) -> Self {
        Content::Text(TextContent::new(data))
    }

    /// Byte-backed content; legacy single-byte encodings get the
    /// byte-as-char variant.
    pub(crate) fn binary(data: Vec<u8>, encoding: &Encoding) -> Self {
        if encoding.is_legacy_single_byte() {
            Content::ByteChars(data)
        } else {
            Content::Bytes(data)
        }
    }

    pub(crate) fn representation(&self) -> Representation {
        match self {
            Content::Text(_) => Representation::Text,
            Content::Chars(_) => Representation::Chars,
            Content::Bytes(_) => Representation::Bytes,
            Content::ByteChars(_) => Representation::ByteChars,
        }
    }

    /// Length in native units.
    pub(crate) fn len(&self) -> usize {
        match self {
            Content::Text(text) => text.len(),
            Content::Chars(units) => units.len(),
            Content::Bytes(bytes) | Content::ByteChars(bytes) => bytes.len(),
        }
    }

    pub(crate) fn is_binary(&self) -> bool {
        matches!(self, Content::Bytes(_) | Content::ByteChars(_))
    }

    pub(crate) fn is_ascii(&self) -> bool {
        match self {
            Content::Text(text) => text.is_ascii(),
            Content::Chars(units) => units.iter().all(|&u| u < 0x80),
            Content::Bytes(bytes) | Content::ByteChars(bytes) => bytes.is_ascii(),
        }
    }

    /// Whether character indexes and byte indexes coincide for byte content.
    pub(crate) fn bytes_are_chars(bytes: &[u8], encoding: &Encoding) -> bool {
        encoding.is_single_byte() || bytes.is_ascii()
    }

    pub(crate) fn char_count(&self, encoding: &Encoding) -> usize {
        match self {
            Content::Text(text) => text.len(),
            Content::Chars(units) => units.len(),
            Content::ByteChars(bytes) => bytes.len(),
            Content::Bytes(bytes) => encoding.char_len(bytes),
        }
    }

    pub(crate) fn byte_count(&self, encoding: &Encoding) -> Result<usize> {
        match self {
            Content::Bytes(bytes) | Content::ByteChars(bytes) => Ok(bytes.len()),
            Content::Text(text) if text.is_ascii() => Ok(text.len()),
            _ => Ok(self.bytes(encoding)?.len()),
        }
    }

    /// UTF-16 view of the content. Byte content is decoded lossily.
    pub(crate) fn units(&self, encoding: &Encoding) -> Cow<'_, [u16]> {
        match self {
            Content::Text(text) => Cow::Owned(text.to_units()),
            Content::Chars(units) => Cow::Borrowed(units),
            Content::Bytes(bytes) | Content::ByteChars(bytes) => {
                Cow::Owned(encoding.decode_lossy(bytes))
            }
        }
    }

    /// Byte image of the content in `encoding`.
    pub(crate) fn bytes(&self, encoding: &Encoding) -> Result<Cow<'_, [u8]>> {
        match self {
            Content::Bytes(bytes) | Content::ByteChars(bytes) => Ok(Cow::Borrowed(bytes)),
            Content::Text(text) => encoding.encode_str(text.as_str()),
            Content::Chars(units) => Ok(Cow::Owned(encoding.encode_units(units)?)),
        }
    }

    /// Byte image that never fails; unrepresentable characters become `?`.
    pub(crate) fn bytes_lossy(&self, encoding: &Encoding) -> Cow<'_, [u8]> {
        match self.bytes(encoding) {
            Ok(bytes) => bytes,
            Err(_) => Cow::Owned(encoding.encode_units_lossy(&self.units(encoding))),
        }
    }

    pub(crate) fn char_at(&self, index: usize, encoding: &Encoding) -> Result<u16> {
        let unit = match self {
            Content::Text(text) => text.unit_at(index),
            Content::Chars(units) => units.get(index).copied(),
            Content::ByteChars(bytes) => bytes.get(index).map(|&b| encoding.decode_byte(b)),
            Content::Bytes(bytes) if Self::bytes_are_chars(bytes, encoding) => {
                bytes.get(index).map(|&b| encoding.decode_byte(b))
            }
            Content::Bytes(_) => self.units(encoding).get(index).copied(),
        };
        unit.ok_or_else(|| StringError::out_of_range(index, self.char_count(encoding)))
    }

    pub(crate) fn byte_at(&self, index: usize, encoding: &Encoding) -> Result<u8> {
        let byte = match self {
            Content::Bytes(bytes) | Content::ByteChars(bytes) => bytes.get(index).copied(),
            Content::Text(text) if text.is_ascii() => text.as_str().as_bytes().get(index).copied(),
            _ => self.bytes(encoding)?.get(index).copied(),
        };
        match byte {
            Some(byte) => Ok(byte),
            None => Err(StringError::out_of_range(index, self.byte_count(encoding)?)),
        }
    }

    /// Strict copy-out as a Rust string.
    pub(crate) fn to_text(&self, encoding: &Encoding) -> Result<String> {
        match self {
            Content::Text(text) => Ok(text.as_str().to_owned()),
            Content::Chars(units) => units_to_string(units),
            Content::Bytes(bytes) | Content::ByteChars(bytes) => encoding.decode_to_string(bytes),
        }
    }

    /// Strict decode into a fresh UTF-16 buffer.
    pub(crate) fn to_units(&self, encoding: &Encoding) -> Result<Vec<u16>> {
        match self {
            Content::Text(text) => Ok(text.to_units()),
            Content::Chars(units) => Ok(units.clone()),
            Content::Bytes(bytes) | Content::ByteChars(bytes) => encoding.decode(bytes),
        }
    }

    /// Sub-range in native units, keeping the representation.
    pub(crate) fn slice(&self, start: usize, count: usize) -> Result<Content> {
        let end = check_range(start, count, self.len())?;
        Ok(match self {
            Content::Text(text) => match text.slice(start, count) {
                Some(sliced) => Content::Text(sliced),
                None => Content::Chars(text.to_units()[start..end].to_vec()),
            },
            Content::Chars(units) => Content::Chars(units[start..end].to_vec()),
            Content::Bytes(bytes) => Content::Bytes(bytes[start..end].to_vec()),
            Content::ByteChars(bytes) => Content::ByteChars(bytes[start..end].to_vec()),
        })
    }
}

/// End of `start..start + count`, or `IndexOutOfRange` when it leaves `len`.
pub(crate) fn check_range(start: usize, count: usize, len: usize) -> Result<usize> {
    if start > len {
        return Err(StringError::out_of_range(start, len));
    }
    match start.checked_add(count) {
        Some(end) if end <= len => Ok(end),
        _ => Err(StringError::out_of_range(start.saturating_add(count), len)),
    }
}

pub(crate) fn units_to_string(units: &[u16]) -> Result<String> {
    let mut out = String::with_capacity(units.len());
    for (offset, decoded) in char::decode_utf16(units.iter().copied()).enumerate() {
        match decoded {
            Ok(c) => out.push(c),
            Err(_) => {
                return Err(StringError::InvalidByteSequence {
                    encoding: "UTF-16",
                    offset,
                });
            }
        }
    }
    Ok(out)
}
