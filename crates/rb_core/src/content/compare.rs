use std::cmp::Ordering;
use std::hash::Hasher;

use super::Content;
use crate::encoding::Encoding;

impl Content {
    /// Ordinal comparison of byte images. The text side is encoded on the
    /// fly instead of being converted, so the order does not depend on the
    /// representation. UTF-8 byte order is code point order.
    pub(crate) fn ordinal_cmp(
        &self,
        encoding: &Encoding,
        other: &Content,
        other_encoding: &Encoding,
    ) -> Ordering {
        match (self, other) {
            (Content::Text(a), Content::Text(b)) if a.is_ascii() && b.is_ascii() => {
                a.as_str().cmp(b.as_str())
            }
            _ => self
                .bytes_lossy(encoding)
                .as_ref()
                .cmp(other.bytes_lossy(other_encoding).as_ref()),
        }
    }

    /// Hash of the byte image plus whether the content is pure ASCII.
    pub(crate) fn hash_and_ascii(&self, encoding: &Encoding) -> (u64, bool) {
        let ascii = self.is_ascii();
        let mut hasher = ahash::AHasher::default();
        hasher.write(&self.bytes_lossy(encoding));
        (hasher.finish(), ascii)
    }
}
