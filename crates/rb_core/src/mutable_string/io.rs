//! Byte-level access used by stream wrappers.

use std::io::Read;

use super::MutableString;
use crate::error::Result;

impl MutableString {
    /// Reads up to `byte_count` bytes from `reader` straight into the byte
    /// buffer. Returns the number of bytes read; a short read means the
    /// reader hit end of input.
    pub fn append_from_reader<R: Read + ?Sized>(&mut self, reader: &mut R, byte_count: usize) -> Result<usize> {
        self.mutate()?;
        let buffer = self.content.make_binary(self.encoding)?;
        let start = buffer.len();
        buffer.reserve(byte_count);
        let read = reader.take(byte_count as u64).read_to_end(buffer)?;
        let appended_ascii = buffer[start..].is_ascii();
        self.state.ascii_valid &= appended_ascii;
        tracing::trace!(requested = byte_count, read, "appended from reader");
        Ok(read)
    }

    /// Direct access to the backing byte buffer, switching to bytes first.
    ///
    /// Counts as a mutation: the version is bumped and cached state dropped
    /// up front, since the caller may write through the returned buffer.
    pub fn byte_buffer_mut(&mut self) -> Result<&mut Vec<u8>> {
        self.mutate()?;
        self.state.ascii_valid = false;
        self.content.make_binary(self.encoding)
    }
}

#[cfg(test)]
mod tests {
    use crate::MutableString;
    use crate::encoding::UTF_8;
    use crate::error::StringError;
    use std::io::Cursor;

    #[test]
    fn append_from_reader_stops_at_end_of_input() {
        let mut s = MutableString::create_text("ab", &UTF_8);
        let mut input = Cursor::new(b"cdef".to_vec());
        assert_eq!(s.append_from_reader(&mut input, 2).unwrap(), 2);
        assert_eq!(s.append_from_reader(&mut input, 10).unwrap(), 2);
        assert_eq!(s.to_bytes().unwrap(), b"abcdef");
    }

    #[test]
    fn byte_buffer_writes_are_visible() {
        let mut s = MutableString::from("hi");
        s.byte_buffer_mut().unwrap().extend_from_slice(b"!!");
        assert_eq!(s.to_text().unwrap(), "hi!!");
        assert!(s.is_ascii());
    }

    #[test]
    fn frozen_string_refuses_buffer_access() {
        let mut s = MutableString::from("x");
        s.freeze();
        assert!(matches!(s.byte_buffer_mut(), Err(StringError::Frozen)));
    }
}
