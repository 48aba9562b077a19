use std::fmt;

use super::MutableString;
use crate::content::{Content, check_range};
use crate::encoding::Encoding;
use crate::error::{Result, StringError};

impl MutableString {
    /// Runs a single content write. The write either completes or leaves
    /// the value as it was, so the version moves only on success.
    fn apply(&mut self, f: impl FnOnce(&mut Self) -> Result<()>) -> Result<&mut Self> {
        self.check_frozen()?;
        f(self)?;
        self.mutated();
        Ok(self)
    }

    /// Runs a multi-step edit against a snapshot: on failure the content,
    /// encoding and state are put back.
    fn edit(&mut self, f: impl FnOnce(&mut Self) -> Result<()>) -> Result<&mut Self> {
        self.check_frozen()?;
        let content = self.content.clone();
        let encoding = self.encoding;
        let state = self.state;
        if let Err(err) = f(self) {
            self.content = content;
            self.encoding = encoding;
            self.state = state;
            return Err(err);
        }
        self.mutated();
        Ok(self)
    }

    /// Adopts `encoding` ahead of combining with another string.
    fn adopt_encoding(&mut self, encoding: &'static Encoding) {
        if encoding != self.encoding {
            tracing::trace!(from = self.encoding.name(), to = encoding.name(), "string encoding promoted");
            self.encoding = encoding;
            self.content.retag(encoding);
        }
    }

    pub fn append_char(&mut self, c: char) -> Result<&mut Self> {
        self.apply(|s| {
            let mut buf = [0u16; 2];
            s.content.append_units(c.encode_utf16(&mut buf), s.encoding)?;
            s.state.ascii_valid &= c.is_ascii();
            Ok(())
        })
    }

    pub fn append_char_repeat(&mut self, c: char, repeat: usize) -> Result<&mut Self> {
        self.apply(|s| {
            let mut buf = [0u16; 2];
            let units = c.encode_utf16(&mut buf).repeat(repeat);
            s.content.append_units(&units, s.encoding)?;
            s.state.ascii_valid &= c.is_ascii() || repeat == 0;
            Ok(())
        })
    }

    pub fn append_byte(&mut self, byte: u8) -> Result<&mut Self> {
        self.append_bytes(&[byte])
    }

    pub fn append_byte_repeat(&mut self, byte: u8, repeat: usize) -> Result<&mut Self> {
        self.append_bytes(&vec![byte; repeat])
    }

    pub fn append_str(&mut self, text: &str) -> Result<&mut Self> {
        self.apply(|s| {
            s.content.append_str(text, s.encoding)?;
            s.state.ascii_valid &= text.is_ascii();
            Ok(())
        })
    }

    /// Appends raw bytes. Text content switches to a byte buffer first.
    pub fn append_bytes(&mut self, bytes: &[u8]) -> Result<&mut Self> {
        self.apply(|s| {
            s.content.append_bytes(bytes, s.encoding)?;
            s.state.ascii_valid &= bytes.is_ascii();
            Ok(())
        })
    }

    /// Appends another string, promoting the encoding when the two differ.
    /// Taint carries over.
    pub fn append_string(&mut self, other: &MutableString) -> Result<&mut Self> {
        self.append_string_range(other, 0, other.len())
    }

    /// Appends `count` native units of `other` starting at `start`.
    pub fn append_string_range(
        &mut self,
        other: &MutableString,
        start: usize,
        count: usize,
    ) -> Result<&mut Self> {
        self.check_frozen()?;
        check_range(start, count, other.len())?;
        let encoding = self.combined_encoding(other)?;
        let previous = self.encoding;
        // appends leave the value alone when they fail; only the retag needs
        // undoing
        self.apply(|s| {
            s.adopt_encoding(encoding);
            let appended = s
                .content
                .append_content(&other.content, start, count, encoding, other.encoding);
            if appended.is_err() {
                s.encoding = previous;
                s.content.retag(previous);
            }
            appended?;
            s.state.ascii_valid &= other.is_ascii();
            s.state.tainted |= other.state.tainted;
            Ok(())
        })
    }

    pub fn append_multiple<'a>(
        &mut self,
        others: impl IntoIterator<Item = &'a MutableString>,
    ) -> Result<&mut Self> {
        for other in others {
            self.append_string(other)?;
        }
        Ok(self)
    }

    pub fn append_format(&mut self, args: fmt::Arguments<'_>) -> Result<&mut Self> {
        match args.as_str() {
            Some(text) => self.append_str(text),
            None => self.append_str(&args.to_string()),
        }
    }

    /// Inserts a character at a character index.
    pub fn insert_char(&mut self, index: usize, c: char) -> Result<&mut Self> {
        self.apply(|s| {
            let mut buf = [0u16; 2];
            s.content
                .insert_units(index, c.encode_utf16(&mut buf), s.encoding)?;
            s.state.ascii_valid &= c.is_ascii();
            Ok(())
        })
    }

    pub fn insert_str(&mut self, index: usize, text: &str) -> Result<&mut Self> {
        self.apply(|s| {
            let units: Vec<u16> = text.encode_utf16().collect();
            s.content.insert_units(index, &units, s.encoding)?;
            s.state.ascii_valid &= text.is_ascii();
            Ok(())
        })
    }

    /// Inserts a byte at a byte index.
    pub fn insert_byte(&mut self, index: usize, byte: u8) -> Result<&mut Self> {
        self.insert_bytes(index, &[byte])
    }

    pub fn insert_bytes(&mut self, index: usize, bytes: &[u8]) -> Result<&mut Self> {
        self.apply(|s| {
            s.content.insert_bytes(index, bytes, s.encoding)?;
            s.state.ascii_valid &= bytes.is_ascii();
            Ok(())
        })
    }

    /// Inserts another string at a native-unit index of this one.
    pub fn insert_string(&mut self, index: usize, other: &MutableString) -> Result<&mut Self> {
        self.check_frozen()?;
        if index > self.len() {
            return Err(StringError::out_of_range(index, self.len()));
        }
        let encoding = self.combined_encoding(other)?;
        self.edit(|s| {
            s.adopt_encoding(encoding);
            s.insert_content(index, other, encoding)
        })
    }

    fn insert_content(
        &mut self,
        index: usize,
        other: &MutableString,
        encoding: &'static Encoding,
    ) -> Result<()> {
        if self.content.is_binary() {
            let bytes = other.content.bytes(encoding)?;
            self.content.insert_bytes(index, &bytes, encoding)?;
        } else {
            let units = other.content.to_units(other.encoding)?;
            self.content.insert_units(index, &units, encoding)?;
        }
        self.state.ascii_valid &= other.is_ascii();
        self.state.tainted |= other.state.tainted;
        Ok(())
    }

    /// Removes `count` native units starting at `start`.
    pub fn remove(&mut self, start: usize, count: usize) -> Result<&mut Self> {
        self.check_frozen()?;
        check_range(start, count, self.len())?;
        self.apply(|s| s.content.remove(start, count, s.encoding))
    }

    pub fn remove_from(&mut self, start: usize) -> Result<&mut Self> {
        let len = self.len();
        let count = len
            .checked_sub(start)
            .ok_or_else(|| StringError::out_of_range(start, len))?;
        self.remove(start, count)
    }

    /// Shortens the string to `len` native units; longer lengths keep it.
    pub fn truncate(&mut self, len: usize) -> Result<&mut Self> {
        let len = len.min(self.len());
        self.remove_from(len)
    }

    /// Keeps only `count` native units starting at `start`.
    pub fn trim(&mut self, start: usize, count: usize) -> Result<&mut Self> {
        self.check_frozen()?;
        let end = check_range(start, count, self.len())?;
        self.edit(|s| {
            let len = s.len();
            s.content.remove(end, len - end, s.encoding)?;
            s.content.remove(0, start, s.encoding)
        })
    }

    pub fn clear(&mut self) -> Result<&mut Self> {
        self.apply(|s| {
            s.content.clear();
            s.state.ascii_valid = true;
            Ok(())
        })
    }

    /// Replaces `count` native units at `start` with `other`.
    pub fn replace(&mut self, start: usize, count: usize, other: &MutableString) -> Result<&mut Self> {
        self.check_frozen()?;
        check_range(start, count, self.len())?;
        let encoding = self.combined_encoding(other)?;
        self.edit(|s| {
            s.adopt_encoding(encoding);
            s.content.remove(start, count, encoding)?;
            s.insert_content(start, other, encoding)
        })
    }

    /// Overwrites the UTF-16 unit at a character index.
    pub fn set_char(&mut self, index: usize, unit: u16) -> Result<&mut Self> {
        self.check_frozen()?;
        let len = self.char_count();
        if index >= len {
            return Err(StringError::out_of_range(index, len));
        }
        self.apply(|s| {
            s.content.set_unit(index, unit, s.encoding)?;
            s.state.ascii_valid &= unit < 0x80;
            Ok(())
        })
    }

    pub fn set_byte(&mut self, index: usize, byte: u8) -> Result<&mut Self> {
        self.check_frozen()?;
        let len = self.byte_count()?;
        if index >= len {
            return Err(StringError::out_of_range(index, len));
        }
        self.apply(|s| {
            s.content.set_byte(index, byte, s.encoding)?;
            s.state.ascii_valid &= byte < 0x80;
            Ok(())
        })
    }

    pub fn reverse(&mut self) -> Result<&mut Self> {
        self.apply(|s| s.content.reverse(s.encoding))
    }

    /// Re-tags the string with another encoding, keeping its bytes.
    pub fn force_encoding(&mut self, encoding: &'static Encoding) -> Result<&mut Self> {
        self.apply(|s| {
            if !s.content.is_ascii() {
                s.content.make_binary(s.encoding)?;
            }
            s.encoding = encoding;
            s.content.retag(encoding);
            s.state.ascii_valid = s.content.is_ascii();
            Ok(())
        })
    }

    /// Converts the characters into another encoding. Fails without changing
    /// anything when a character has no representation there.
    pub fn transcode(&mut self, encoding: &'static Encoding) -> Result<&mut Self> {
        self.check_frozen()?;
        let units = self.content.to_units(self.encoding)?;
        let content = if self.content.is_binary() {
            Content::binary(encoding.encode_units(&units)?, encoding)
        } else {
            encoding.encode_units(&units)?;
            Content::Chars(units)
        };
        self.apply(|s| {
            s.content = content;
            s.encoding = encoding;
            Ok(())
        })
    }

    /// Converts to a byte buffer. The value, version and hash are unchanged.
    pub fn switch_to_binary(&mut self) -> Result<&mut Self> {
        self.content.make_binary(self.encoding)?;
        Ok(self)
    }

    /// Converts to a UTF-16 buffer. The value, version and hash are unchanged.
    pub fn switch_to_text(&mut self) -> Result<&mut Self> {
        self.content.make_chars(self.encoding)?;
        Ok(self)
    }

    pub fn set_tainted(&mut self, tainted: bool) -> Result<&mut Self> {
        self.check_frozen()?;
        self.state.tainted = tainted;
        Ok(self)
    }

    /// Taints this string when `other` is tainted.
    pub fn taint_by(&mut self, other: &MutableString) -> Result<&mut Self> {
        if other.is_tainted() {
            self.set_tainted(true)?;
        }
        Ok(self)
    }

    /// New string holding `self` followed by `other`.
    pub fn concat(&self, other: &MutableString) -> Result<MutableString> {
        let mut result = self.clone();
        result.append_string(other)?;
        Ok(result)
    }
}

impl fmt::Write for MutableString {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.append_str(s).map(|_| ()).map_err(|_| fmt::Error)
    }
}
