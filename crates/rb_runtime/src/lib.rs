//! Object model of the rb runtime.
//!
//! Modules and classes live in a generational arena owned by a
//! `RuntimeContext`. The context serializes structural changes behind one
//! reader/writer lock and stamps classes from a runtime-wide version counter
//! so call sites can tell when a cached lookup went stale.

#![allow(clippy::collapsible_if)]
#![allow(clippy::new_without_default)]
#![allow(clippy::type_complexity)]
#![allow(clippy::len_without_is_empty)]

pub mod cache;
pub mod config;
pub mod context;
pub mod errors;
mod hierarchy;
pub mod ids;
pub mod member;
pub mod module;
pub mod native;
pub mod object;
pub mod regex;
pub mod resolve;
pub mod util;
pub mod value;

pub use cache::{CallSite, FailureCache};
pub use config::RuntimeConfig;
pub use context::RuntimeContext;
pub use errors::{Result, RuntimeError};
pub use ids::{ModuleId, RuntimeId};
pub use member::{MemberInfo, MemberKind, MethodBody, Visibility};
pub use module::{Attached, MethodTableBuilder, ConstantTableBuilder, TableState, VersionHandle};
pub use native::{NativeMember, NativeMembers};
pub use object::{ObjectRef, RubyObject, StructLayout};
pub use crate::regex::{RegexError, RegexOptions, TranslatedRegex};
pub use resolve::{MethodResolution, VisibilityContext};
pub use value::Value;
