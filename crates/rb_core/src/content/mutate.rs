//! Mutations and representation switches.
//!
//! Character writes go to the UTF-16 buffer unless the bytes already are
//! characters; byte writes always go to a byte buffer. Whichever write first
//! needs the other representation converts the content once.

use super::{Content, check_range};
use crate::encoding::Encoding;
use crate::error::{Result, StringError};

impl Content {
    /// Switches to the mutable UTF-16 buffer, decoding bytes strictly.
    pub(crate) fn make_chars(&mut self, encoding: &Encoding) -> Result<&mut Vec<u16>> {
        if !matches!(self, Content::Chars(_)) {
            let units = self.to_units(encoding)?;
            tracing::trace!(from = ?self.representation(), encoding = encoding.name(), "switch to chars");
            *self = Content::Chars(units);
        }
        match self {
            Content::Chars(units) => Ok(units),
            _ => unreachable!("content was switched to chars above"),
        }
    }

    /// Switches to a byte buffer, encoding text strictly.
    pub(crate) fn make_binary(&mut self, encoding: &Encoding) -> Result<&mut Vec<u8>> {
        if !self.is_binary() {
            let bytes = self.bytes(encoding)?.into_owned();
            tracing::trace!(from = ?self.representation(), encoding = encoding.name(), "switch to binary");
            *self = Content::binary(bytes, encoding);
        }
        match self {
            Content::Bytes(bytes) | Content::ByteChars(bytes) => Ok(bytes),
            _ => unreachable!("content was switched to bytes above"),
        }
    }

    /// Re-selects the byte variant after the owning string changed encoding.
    pub(crate) fn retag(&mut self, encoding: &Encoding) {
        if self.is_binary() {
            match std::mem::take(self) {
                Content::Bytes(bytes) | Content::ByteChars(bytes) => {
                    *self = Content::binary(bytes, encoding);
                }
                other => *self = other,
            }
        }
    }

    pub(crate) fn append_units(&mut self, units: &[u16], encoding: &Encoding) -> Result<()> {
        match self {
            Content::Bytes(bytes) | Content::ByteChars(bytes) => {
                let encoded = encoding.encode_units(units)?;
                bytes.extend_from_slice(&encoded);
            }
            _ => self.make_chars(encoding)?.extend_from_slice(units),
        }
        Ok(())
    }

    pub(crate) fn append_str(&mut self, text: &str, encoding: &Encoding) -> Result<()> {
        match self {
            Content::Bytes(bytes) | Content::ByteChars(bytes) => {
                let encoded = encoding.encode_str(text)?;
                bytes.extend_from_slice(&encoded);
            }
            _ => self.make_chars(encoding)?.extend(text.encode_utf16()),
        }
        Ok(())
    }

    pub(crate) fn append_bytes(&mut self, data: &[u8], encoding: &Encoding) -> Result<()> {
        self.make_binary(encoding)?.extend_from_slice(data);
        Ok(())
    }

    /// Appends `count` native units of `other` starting at `start`.
    pub(crate) fn append_content(
        &mut self,
        other: &Content,
        start: usize,
        count: usize,
        encoding: &Encoding,
        other_encoding: &Encoding,
    ) -> Result<()> {
        let end = check_range(start, count, other.len())?;
        match other {
            Content::Bytes(bytes) | Content::ByteChars(bytes) => {
                self.append_bytes(&bytes[start..end], encoding)
            }
            Content::Chars(units) => self.append_units(&units[start..end], encoding),
            Content::Text(_) => {
                let units = other.units(other_encoding);
                self.append_units(&units[start..end], encoding)
            }
        }
    }

    /// Inserts UTF-16 units at a character index.
    pub(crate) fn insert_units(&mut self, index: usize, units: &[u16], encoding: &Encoding) -> Result<()> {
        let len = self.char_count(encoding);
        if index > len {
            return Err(StringError::out_of_range(index, len));
        }
        match self {
            Content::ByteChars(bytes) => {
                let encoded = encoding.encode_units(units)?;
                bytes.splice(index..index, encoded);
            }
            Content::Bytes(bytes) if Self::bytes_are_chars(bytes, encoding) => {
                let encoded = encoding.encode_units(units)?;
                bytes.splice(index..index, encoded);
            }
            _ => {
                self.make_chars(encoding)?
                    .splice(index..index, units.iter().copied());
            }
        }
        Ok(())
    }

    /// Inserts bytes at a byte index.
    pub(crate) fn insert_bytes(&mut self, index: usize, data: &[u8], encoding: &Encoding) -> Result<()> {
        let bytes = self.make_binary(encoding)?;
        if index > bytes.len() {
            return Err(StringError::out_of_range(index, bytes.len()));
        }
        bytes.splice(index..index, data.iter().copied());
        Ok(())
    }

    /// Removes `count` native units starting at `start`.
    pub(crate) fn remove(&mut self, start: usize, count: usize, encoding: &Encoding) -> Result<()> {
        let end = check_range(start, count, self.len())?;
        match self {
            Content::Chars(units) => {
                units.drain(start..end);
            }
            Content::Bytes(bytes) | Content::ByteChars(bytes) => {
                bytes.drain(start..end);
            }
            Content::Text(_) => {
                self.make_chars(encoding)?.drain(start..end);
            }
        }
        Ok(())
    }

    /// Overwrites the character at `index`.
    pub(crate) fn set_unit(&mut self, index: usize, unit: u16, encoding: &Encoding) -> Result<()> {
        let len = self.char_count(encoding);
        if index >= len {
            return Err(StringError::out_of_range(index, len));
        }
        let in_place = match self {
            Content::ByteChars(_) => true,
            Content::Bytes(bytes) => Self::bytes_are_chars(bytes, encoding),
            _ => false,
        };
        if in_place {
            if let Some(byte) = encoding.encode_unit(unit) {
                if let Content::Bytes(bytes) | Content::ByteChars(bytes) = self {
                    bytes[index] = byte;
                }
                return Ok(());
            }
            if matches!(self, Content::ByteChars(_)) {
                return Err(StringError::Unencodable {
                    encoding: encoding.name(),
                    code_point: unit as u32,
                });
            }
        }
        self.make_chars(encoding)?[index] = unit;
        Ok(())
    }

    pub(crate) fn set_byte(&mut self, index: usize, byte: u8, encoding: &Encoding) -> Result<()> {
        let bytes = self.make_binary(encoding)?;
        match bytes.get_mut(index) {
            Some(slot) => {
                *slot = byte;
                Ok(())
            }
            None => Err(StringError::out_of_range(index, bytes.len())),
        }
    }

    /// Reverses by characters; surrogate pairs stay in order.
    pub(crate) fn reverse(&mut self, encoding: &Encoding) -> Result<()> {
        match self {
            Content::ByteChars(bytes) => bytes.reverse(),
            Content::Bytes(bytes) if Self::bytes_are_chars(bytes, encoding) => bytes.reverse(),
            _ => {
                let units = self.make_chars(encoding)?;
                let mut reversed = Vec::with_capacity(units.len());
                let mut i = units.len();
                while i > 0 {
                    let unit = units[i - 1];
                    if is_low_surrogate(unit) && i >= 2 && is_high_surrogate(units[i - 2]) {
                        reversed.extend_from_slice(&units[i - 2..i]);
                        i -= 2;
                    } else {
                        reversed.push(unit);
                        i -= 1;
                    }
                }
                *units = reversed;
            }
        }
        Ok(())
    }

    pub(crate) fn clear(&mut self) {
        match self {
            Content::Chars(units) => units.clear(),
            Content::Bytes(bytes) | Content::ByteChars(bytes) => bytes.clear(),
            Content::Text(_) => *self = Content::Chars(Vec::new()),
        }
    }
}

fn is_high_surrogate(unit: u16) -> bool {
    (0xD800..0xDC00).contains(&unit)
}

fn is_low_surrogate(unit: u16) -> bool {
    (0xDC00..0xE000).contains(&unit)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::Representation;
    use crate::encoding::{ISO_8859_1, UTF_8};
    use std::sync::Arc;

    #[test]
    fn appending_bytes_to_text_switches_to_byte_buffer() {
        let mut content = Content::text(Arc::from("héllo"));
        content.append_bytes(b"!", &UTF_8).unwrap();
        assert_eq!(content.representation(), Representation::Bytes);
        assert_eq!(content.bytes(&UTF_8).unwrap().as_ref(), "héllo!".as_bytes());
    }

    #[test]
    fn char_writes_into_legacy_bytes_stay_in_place() {
        let mut content = Content::binary(b"caf".to_vec(), &ISO_8859_1);
        content.append_units(&[0x00E9], &ISO_8859_1).unwrap();
        assert_eq!(content.representation(), Representation::ByteChars);
        assert_eq!(content.bytes(&ISO_8859_1).unwrap().as_ref(), b"caf\xE9");
        let err = content.append_units(&[0x4E2D], &ISO_8859_1).unwrap_err();
        assert!(matches!(err, StringError::Unencodable { code_point: 0x4E2D, .. }));
    }

    #[test]
    fn reverse_keeps_surrogate_pairs() {
        let mut content = Content::text(Arc::from("a😀b"));
        content.reverse(&UTF_8).unwrap();
        assert_eq!(content.to_text(&UTF_8).unwrap(), "b😀a");
    }
}
