//! Mutable, encoding-tagged string.
//!
//! A `MutableString` owns one [`Content`] and an interned [`Encoding`]. Every
//! mutation bumps the version and drops the cached hash. Reads never convert
//! the representation; only mutations (and the explicit `switch_to_*` calls)
//! do.
//!
//! Mutation needs `&mut self`, so a string cannot be mutated while it is
//! read elsewhere. Sharing one across threads still needs external
//! synchronization (`Arc<Mutex<_>>`); freezing only rules out intentional
//! mutation.

mod inspect;
mod io;
mod mutation;
mod search;

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::sync::{Arc, LazyLock};

use crate::content::{Content, Representation, check_range};
use crate::encoding::{BINARY, Encoding, UTF_8};
use crate::error::{Result, StringError};

/// Cached-hash sentinel meaning "recompute on next use".
const HASH_STALE: u64 = 0;

static FROZEN_EMPTY: LazyLock<MutableString> = LazyLock::new(|| {
    let mut empty = MutableString::create_text("", &BINARY);
    empty.freeze();
    empty
});

/// Version and taint of a string, plus whether its content is known to be
/// all ASCII.
///
/// `ascii_valid` is conservative: `false` means "unknown or not ASCII".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StringState {
    pub version: u64,
    pub tainted: bool,
    pub ascii_valid: bool,
}

pub struct MutableString {
    content: Content,
    encoding: &'static Encoding,
    state: StringState,
    frozen: bool,
    hash: AtomicU64,
}

impl MutableString {
    fn from_content(content: Content, encoding: &'static Encoding) -> Self {
        let ascii_valid = content.is_ascii();
        Self {
            content,
            encoding,
            state: StringState {
                version: 0,
                tainted: false,
                ascii_valid,
            },
            frozen: false,
            hash: AtomicU64::new(HASH_STALE),
        }
    }

    /// Text-backed string sharing `text`; the first mutation copies it.
    pub fn create_text(text: impl Into<Arc<str>>, encoding: &'static Encoding) -> Self {
        Self::from_content(Content::text(text.into()), encoding)
    }

    pub fn create_binary(bytes: impl Into<Vec<u8>>, encoding: &'static Encoding) -> Self {
        Self::from_content(Content::binary(bytes.into(), encoding), encoding)
    }

    /// Empty string with a mutable character buffer (or a byte-as-char
    /// buffer for legacy single-byte encodings).
    pub fn create_empty_mutable(encoding: &'static Encoding) -> Self {
        let content = if encoding.is_legacy_single_byte() {
            Content::ByteChars(Vec::new())
        } else {
            Content::Chars(Vec::new())
        };
        Self::from_content(content, encoding)
    }

    pub fn create_empty_binary(encoding: &'static Encoding) -> Self {
        Self::from_content(Content::binary(Vec::new(), encoding), encoding)
    }

    /// Empty byte-backed string with room for `capacity` bytes.
    pub fn with_capacity(capacity: usize, encoding: &'static Encoding) -> Self {
        Self::from_content(Content::binary(Vec::with_capacity(capacity), encoding), encoding)
    }

    /// The canonical frozen empty string.
    pub fn frozen_empty() -> &'static MutableString {
        &FROZEN_EMPTY
    }

    pub fn encoding(&self) -> &'static Encoding {
        self.encoding
    }

    pub fn representation(&self) -> Representation {
        self.content.representation()
    }

    pub fn is_binary(&self) -> bool {
        self.content.is_binary()
    }

    /// Length in native units: UTF-16 units for text content, bytes for
    /// byte content.
    pub fn len(&self) -> usize {
        self.content.len()
    }

    pub fn is_empty(&self) -> bool {
        self.content.len() == 0
    }

    /// Length in UTF-16 units regardless of representation.
    pub fn char_count(&self) -> usize {
        self.content.char_count(self.encoding)
    }

    pub fn byte_count(&self) -> Result<usize> {
        self.content.byte_count(self.encoding)
    }

    pub fn is_ascii(&self) -> bool {
        self.state.ascii_valid || self.content.is_ascii()
    }

    pub fn state(&self) -> StringState {
        self.state
    }

    pub fn version(&self) -> u64 {
        self.state.version
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    pub fn is_tainted(&self) -> bool {
        self.state.tainted
    }

    /// Freezes the string. Freezing twice is fine.
    pub fn freeze(&mut self) -> &mut Self {
        self.frozen = true;
        self
    }

    /// UTF-16 unit at a character index.
    pub fn char_at(&self, index: usize) -> Result<u16> {
        self.content.char_at(index, self.encoding)
    }

    pub fn byte_at(&self, index: usize) -> Result<u8> {
        self.content.byte_at(index, self.encoding)
    }

    pub fn first_char(&self) -> Option<u16> {
        self.char_at(0).ok()
    }

    pub fn last_char(&self) -> Option<u16> {
        self.char_count().checked_sub(1).and_then(|i| self.char_at(i).ok())
    }

    /// Independent copy of `count` native units starting at `start`, keeping
    /// the representation and taint.
    pub fn get_slice(&self, start: usize, count: usize) -> Result<MutableString> {
        let mut slice = Self::from_content(self.content.slice(start, count)?, self.encoding);
        slice.state.tainted = self.state.tainted;
        Ok(slice)
    }

    pub fn get_slice_from(&self, start: usize) -> Result<MutableString> {
        let count = self.len().checked_sub(start).ok_or_else(|| StringError::out_of_range(start, self.len()))?;
        self.get_slice(start, count)
    }

    /// Characters `start..start + count` as a Rust string.
    pub fn get_string_slice(&self, start: usize, count: usize) -> Result<String> {
        let units = self.content.to_units(self.encoding)?;
        let end = check_range(start, count, units.len())?;
        crate::content::units_to_string(&units[start..end])
    }

    /// Bytes `start..start + count` of the byte image.
    pub fn get_binary_slice(&self, start: usize, count: usize) -> Result<Vec<u8>> {
        let bytes = self.content.bytes(self.encoding)?;
        let end = check_range(start, count, bytes.len())?;
        Ok(bytes[start..end].to_vec())
    }

    /// Strict copy-out as text.
    pub fn to_text(&self) -> Result<String> {
        self.content.to_text(self.encoding)
    }

    pub fn to_text_lossy(&self) -> String {
        match self.content.to_text(self.encoding) {
            Ok(text) => text,
            Err(_) => String::from_utf16_lossy(&self.content.units(self.encoding)),
        }
    }

    /// Copy of the byte image in the string's encoding.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(self.content.bytes(self.encoding)?.into_owned())
    }

    /// Backing bytes without copying, when the string is byte-backed.
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match &self.content {
            Content::Bytes(bytes) | Content::ByteChars(bytes) => Some(bytes),
            _ => None,
        }
    }

    pub fn starts_with(&self, prefix: &str) -> bool {
        let units = self.content.units(self.encoding);
        let prefix: Vec<u16> = prefix.encode_utf16().collect();
        units.starts_with(&prefix)
    }

    pub fn ends_with(&self, suffix: &str) -> bool {
        let units = self.content.units(self.encoding);
        let suffix: Vec<u16> = suffix.encode_utf16().collect();
        units.ends_with(&suffix)
    }

    /// Hash of the content, cached until the next mutation.
    ///
    /// Non-ASCII content folds the encoding in, except for legacy
    /// single-byte encodings which hash on bytes alone.
    pub fn hash_code(&self) -> u64 {
        let cached = self.hash.load(AtomicOrdering::Relaxed);
        if cached != HASH_STALE {
            return cached;
        }
        let (mut hash, ascii) = self.content.hash_and_ascii(self.encoding);
        if !ascii && !self.encoding.is_legacy_single_byte() {
            hash = hash.rotate_left(5)
                ^ (self.encoding.ordinal() as u64 + 1).wrapping_mul(0x9E37_79B9_7F4A_7C15);
        }
        if hash == HASH_STALE {
            hash = 1;
        }
        self.hash.store(hash, AtomicOrdering::Relaxed);
        hash
    }

    /// Ordinal, encoding-aware comparison.
    ///
    /// Byte images are compared, whatever the representation. Equal images
    /// in different encodings are ordered by encoding unless both are ASCII.
    pub fn compare_to(&self, other: &MutableString) -> Ordering {
        let order = self
            .content
            .ordinal_cmp(self.encoding, &other.content, other.encoding);
        if order != Ordering::Equal
            || self.encoding == other.encoding
            || (self.is_ascii() && other.is_ascii())
        {
            return order;
        }
        self.encoding.ordinal().cmp(&other.encoding.ordinal())
    }

    fn check_frozen(&self) -> Result<()> {
        if self.frozen { Err(StringError::Frozen) } else { Ok(()) }
    }

    /// Bumps the version and invalidates caches, or fails when frozen. Used
    /// ahead of writes that cannot be undone.
    fn mutate(&mut self) -> Result<()> {
        self.check_frozen()?;
        self.mutated();
        Ok(())
    }

    /// Records a completed mutation.
    fn mutated(&mut self) {
        self.state.version += 1;
        *self.hash.get_mut() = HASH_STALE;
    }

    /// Encoding the combination with `other` would have.
    fn combined_encoding(&self, other: &MutableString) -> Result<&'static Encoding> {
        Encoding::compatible(self.encoding, self.is_ascii(), other.encoding, other.is_ascii()).ok_or(
            StringError::EncodingCompatibility {
                left: self.encoding.name(),
                right: other.encoding.name(),
            },
        )
    }
}

impl Default for MutableString {
    fn default() -> Self {
        Self::create_empty_mutable(&UTF_8)
    }
}

/// Deep copy of content and taint. The copy starts at version zero and is
/// never frozen.
impl Clone for MutableString {
    fn clone(&self) -> Self {
        Self {
            content: self.content.clone(),
            encoding: self.encoding,
            state: StringState {
                version: 0,
                ..self.state
            },
            frozen: false,
            hash: AtomicU64::new(self.hash.load(AtomicOrdering::Relaxed)),
        }
    }
}

impl PartialEq for MutableString {
    fn eq(&self, other: &Self) -> bool {
        self.compare_to(other) == Ordering::Equal
    }
}

impl Eq for MutableString {}

impl PartialOrd for MutableString {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for MutableString {
    fn cmp(&self, other: &Self) -> Ordering {
        self.compare_to(other)
    }
}

impl Hash for MutableString {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u64(self.hash_code());
    }
}

impl From<&str> for MutableString {
    fn from(text: &str) -> Self {
        Self::create_text(text, &UTF_8)
    }
}

impl From<String> for MutableString {
    fn from(text: String) -> Self {
        Self::create_text(text, &UTF_8)
    }
}

impl From<Vec<u8>> for MutableString {
    fn from(bytes: Vec<u8>) -> Self {
        Self::create_binary(bytes, &BINARY)
    }
}

impl fmt::Debug for MutableString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MutableString")
            .field("value", &self.inspect())
            .field("encoding", &self.encoding.name())
            .field("representation", &self.representation())
            .field("version", &self.state.version)
            .field("frozen", &self.frozen)
            .field("tainted", &self.state.tainted)
            .finish()
    }
}

impl fmt::Display for MutableString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_text_lossy())
    }
}
