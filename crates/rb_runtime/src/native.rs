//! Host-provided members consulted when a method table misses.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::ids::ModuleId;
use crate::member::{MemberInfo, MemberKind, MethodBody, Visibility};
use crate::util::{FastHashMap, fast_map_new};

/// A member found by a [`NativeMembers`] provider.
#[derive(Clone)]
pub struct NativeMember {
    pub body: MethodBody,
    pub visibility: Visibility,
}

/// Supplies members that are not declared in a method table, such as
/// functions exported by the host.
///
/// `is_static` is set when the lookup comes through the singleton class of
/// the module the provider is attached to. Lookups run while the hierarchy
/// lock is held, so providers must not call back into the runtime.
pub trait NativeMembers: Send + Sync {
    /// Stable identity used to key memoized lookup failures.
    fn key(&self) -> &str;

    /// Bumped by the provider whenever its member set grows. Memoized
    /// failures stamped with an older version are ignored.
    fn extension_version(&self) -> u64 {
        0
    }

    fn lookup(&self, name: &str, is_static: bool) -> Option<NativeMember>;
}

/// Provider attached to one module plus the members it has already handed
/// out, so repeated lookups return the same `MemberInfo`.
pub(crate) struct NativeSlot {
    provider: Arc<dyn NativeMembers>,
    loaded: Mutex<FastHashMap<(Arc<str>, bool), Arc<MemberInfo>>>,
}

impl NativeSlot {
    pub(crate) fn new(provider: Arc<dyn NativeMembers>) -> Self {
        Self {
            provider,
            loaded: Mutex::new(fast_map_new()),
        }
    }

    pub(crate) fn provider(&self) -> &Arc<dyn NativeMembers> {
        &self.provider
    }

    pub(crate) fn loaded(&self, name: &str, is_static: bool) -> Option<Arc<MemberInfo>> {
        self.loaded.lock().get(&(Arc::from(name), is_static)).cloned()
    }

    pub(crate) fn load(&self, owner: ModuleId, name: &str, is_static: bool) -> Option<Arc<MemberInfo>> {
        let member = self.provider.lookup(name, is_static)?;
        let info = Arc::new(MemberInfo::new(MemberKind::Method(member.body), member.visibility, owner));
        let mut loaded = self.loaded.lock();
        let entry = loaded.entry((Arc::from(name), is_static)).or_insert(info);
        Some(Arc::clone(entry))
    }

    pub(crate) fn any_site_cached(&self) -> bool {
        self.loaded.lock().values().any(|m| m.invalidates_sites_on_override())
    }

    pub(crate) fn clear_loaded(&self) {
        self.loaded.lock().clear();
    }
}
