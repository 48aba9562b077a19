//! Errors raised by string and encoding operations.

use thiserror::Error;

pub type Result<T, E = StringError> = std::result::Result<T, E>;

/// Failure of a [`MutableString`](crate::MutableString) or encoding operation.
///
/// All variants are local to the call that produced them; no operation in this
/// crate swallows or retries one of these.
#[derive(Debug, Error)]
pub enum StringError {
    /// Two strings cannot be combined without corrupting one of them.
    #[error("incompatible character encodings: {left} and {right}")]
    EncodingCompatibility {
        left: &'static str,
        right: &'static str,
    },

    /// Bytes that do not form a valid sequence in the named encoding.
    #[error("invalid byte sequence in {encoding} at offset {offset}")]
    InvalidByteSequence {
        encoding: &'static str,
        offset: usize,
    },

    /// A character that has no representation in the target encoding.
    #[error("U+{code_point:04X} cannot be represented in {encoding}")]
    Unencodable {
        encoding: &'static str,
        code_point: u32,
    },

    #[error("can't modify frozen string")]
    Frozen,

    #[error("index {index} out of range (length {len})")]
    IndexOutOfRange { index: usize, len: usize },

    /// The reader feeding [`MutableString::append_from_reader`](crate::MutableString::append_from_reader) failed.
    #[error("stream read failed: {0}")]
    Io(#[from] std::io::Error),
}

impl StringError {
    pub fn is_frozen(&self) -> bool {
        matches!(self, StringError::Frozen)
    }

    pub(crate) fn out_of_range(index: usize, len: usize) -> Self {
        StringError::IndexOutOfRange { index, len }
    }
}
