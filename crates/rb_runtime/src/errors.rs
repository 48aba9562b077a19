//! Runtime error type and common error message constants.

use std::sync::Arc;

use rb_core::StringError;
use thiserror::Error;

use crate::ids::ModuleId;
use crate::member::Visibility;
use crate::regex::RegexError;

pub mod messages {
    pub const ROOT_ALREADY_DEFINED: &str = "root class is already defined";
    pub const EMPTY_NAME: &str = "name must not be empty";
    pub const INVALID_CONSTANT_NAME: &str = "wrong constant name";
    pub const DUPLICATE_STRUCT_MEMBER: &str = "duplicate member";
    pub const INITIALIZER_ALREADY_RAN: &str = "member table is already initialized";
    pub const NOT_A_STRUCT: &str = "class has no struct layout";
}

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("undefined method `{name}' for {module}")]
    NotFound { name: Arc<str>, module: String },
    #[error("method `{name}' is undefined in {module}")]
    UndefinedMethodCall { name: Arc<str>, module: String },
    #[error("{visibility} method `{name}' called for {module}")]
    Inaccessible {
        name: Arc<str>,
        visibility: Visibility,
        module: String,
    },
    #[error("method defined from a different runtime context")]
    CrossContextDefinition,
    #[error("{0:?} belongs to a different runtime context")]
    ForeignModule(ModuleId),
    #[error("can't modify frozen module {0}")]
    FrozenModule(String),
    #[error("can't copy singleton class")]
    SingletonDup,
    #[error("can't copy the root class")]
    RootClassDup,
    #[error("cyclic include detected")]
    CyclicInclude,
    #[error("wrong argument type {0} (expected Module)")]
    NotAModule(String),
    #[error("{0} is not a class")]
    NotAClass(String),
    #[error("{0} has no superclass")]
    NoSuperclass(String),
    #[error("uninitialized constant {0}")]
    ConstantNotFound(String),
    #[error("uninitialized class variable {name} in {module}")]
    ClassVariableNotFound { name: Arc<str>, module: String },
    #[error("{0}")]
    NameError(String),
    #[error("{0} is still referenced by other modules")]
    ModuleInUse(String),
    #[error("{0:?} does not name a live module")]
    InvalidModule(ModuleId),
    #[error(transparent)]
    Regex(#[from] RegexError),
    #[error(transparent)]
    String(#[from] StringError),
}

pub type Result<T, E = RuntimeError> = std::result::Result<T, E>;

impl RuntimeError {
    pub(crate) fn name_error(message: &str, name: &str) -> Self {
        RuntimeError::NameError(format!("{message}: {name}"))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, RuntimeError::NotFound { .. })
    }
}
