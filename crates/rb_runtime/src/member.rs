//! Method table entries.

use std::any::Any;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::ids::ModuleId;

/// Opaque executable body. The runtime never calls it; embedders downcast
/// with [`MemberInfo::body_as`].
pub type MethodBody = Arc<dyn Any + Send + Sync>;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Visibility {
    #[default]
    Public,
    Protected,
    Private,
}

impl fmt::Display for Visibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Visibility::Public => "public",
            Visibility::Protected => "protected",
            Visibility::Private => "private",
        })
    }
}

#[derive(Clone)]
pub enum MemberKind {
    Method(MethodBody),
    /// Changes visibility of an inherited method without copying it:
    /// resolution continues with `super_name` past the owner.
    SuperForwarder { super_name: Arc<str> },
    /// Explicit undefinition. Stops resolution.
    Undefined,
    /// Skipped by resolution as if the entry were absent.
    Hidden,
}

pub struct MemberInfo {
    kind: MemberKind,
    visibility: Visibility,
    owner: ModuleId,
    invalidate_sites_on_override: AtomicBool,
}

impl MemberInfo {
    pub fn new(kind: MemberKind, visibility: Visibility, owner: ModuleId) -> Self {
        Self {
            kind,
            visibility,
            owner,
            invalidate_sites_on_override: AtomicBool::new(false),
        }
    }

    pub(crate) fn undefined(owner: ModuleId) -> Self {
        Self::new(MemberKind::Undefined, Visibility::Public, owner)
    }

    pub(crate) fn hidden(owner: ModuleId) -> Self {
        Self::new(MemberKind::Hidden, Visibility::Public, owner)
    }

    pub fn kind(&self) -> &MemberKind {
        &self.kind
    }

    pub fn visibility(&self) -> Visibility {
        self.visibility
    }

    pub fn owner(&self) -> ModuleId {
        self.owner
    }

    pub fn body(&self) -> Option<&MethodBody> {
        match &self.kind {
            MemberKind::Method(body) => Some(body),
            _ => None,
        }
    }

    pub fn body_as<T: Any>(&self) -> Option<&T> {
        self.body().and_then(|b| b.downcast_ref::<T>())
    }

    pub fn is_undefined(&self) -> bool {
        matches!(self.kind, MemberKind::Undefined)
    }

    pub fn is_hidden(&self) -> bool {
        matches!(self.kind, MemberKind::Hidden)
    }

    pub fn is_super_forwarder(&self) -> bool {
        matches!(self.kind, MemberKind::SuperForwarder { .. })
    }

    /// True once a call site has cached this member; overriding or removing
    /// it must then invalidate dependent classes.
    pub fn invalidates_sites_on_override(&self) -> bool {
        self.invalidate_sites_on_override.load(Ordering::Acquire)
    }

    pub(crate) fn mark_site_cached(&self) {
        self.invalidate_sites_on_override.store(true, Ordering::Release);
    }

    /// Fresh entry with the same kind under another owner; site flags are
    /// not carried over.
    pub(crate) fn copy_to(&self, owner: ModuleId, visibility: Visibility) -> Self {
        Self::new(self.kind.clone(), visibility, owner)
    }
}

impl fmt::Debug for MemberInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match &self.kind {
            MemberKind::Method(_) => "method".to_string(),
            MemberKind::SuperForwarder { super_name } => format!("forwarder({super_name})"),
            MemberKind::Undefined => "undefined".to_string(),
            MemberKind::Hidden => "hidden".to_string(),
        };
        f.debug_struct("MemberInfo")
            .field("kind", &kind)
            .field("visibility", &self.visibility)
            .field("owner", &self.owner)
            .field("site_cached", &self.invalidates_sites_on_override())
            .finish()
    }
}
