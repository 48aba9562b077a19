//! String core of the rb runtime.
//!
//! This crate contains the types that are independent of the object model:
//! - `Encoding` - interned encoding descriptors and the mixing rule
//! - `MutableString` - mutable, encoding-tagged string with swappable content
//! - `StringError` - failures of string operations

#![allow(clippy::len_without_is_empty)]
#![allow(clippy::should_implement_trait)]

mod content;
pub mod encoding;
pub mod error;
pub mod mutable_string;

pub use content::Representation;
pub use encoding::Encoding;
pub use error::{Result, StringError};
pub use mutable_string::{MutableString, StringState};
