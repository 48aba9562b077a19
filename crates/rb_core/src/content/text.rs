use std::sync::Arc;

/// Immutable text shared with literals. Lengths and indexes are in UTF-16
/// units; the first mutation copies the text into a char buffer.
#[derive(Clone, Debug)]
pub(crate) struct TextContent {
    data: Arc<str>,
    units: usize,
    ascii: bool,
}

impl TextContent {
    pub(crate) fn new(data: Arc<str>) -> Self {
        let ascii = data.is_ascii();
        let units = if ascii {
            data.len()
        } else {
            data.encode_utf16().count()
        };
        Self { data, units, ascii }
    }

    pub(crate) fn as_str(&self) -> &str {
        &self.data
    }

    pub(crate) fn len(&self) -> usize {
        self.units
    }

    pub(crate) fn is_ascii(&self) -> bool {
        self.ascii
    }

    pub(crate) fn unit_at(&self, index: usize) -> Option<u16> {
        if index >= self.units {
            return None;
        }
        if self.ascii {
            return Some(self.data.as_bytes()[index] as u16);
        }
        self.data.encode_utf16().nth(index)
    }

    pub(crate) fn to_units(&self) -> Vec<u16> {
        if self.ascii {
            return self.data.bytes().map(u16::from).collect();
        }
        self.data.encode_utf16().collect()
    }

    /// Byte offset of the unit boundary at `index`; `None` when the index
    /// falls between the halves of a surrogate pair.
    fn byte_offset(&self, index: usize) -> Option<usize> {
        if self.ascii {
            return Some(index);
        }
        let mut units = 0;
        for (offset, c) in self.data.char_indices() {
            if units == index {
                return Some(offset);
            }
            units += c.len_utf16();
            if units > index {
                return None;
            }
        }
        (units == index).then_some(self.data.len())
    }

    /// Sub-range as text, or `None` when the range splits a surrogate pair.
    pub(crate) fn slice(&self, start: usize, count: usize) -> Option<TextContent> {
        let from = self.byte_offset(start)?;
        let to = self.byte_offset(start + count)?;
        Some(TextContent::new(Arc::from(&self.data[from..to])))
    }
}
