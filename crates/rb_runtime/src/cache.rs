//! Caches consulted on the method lookup path.
//!
//! - `FailureCache` memoizes native member lookups that found nothing.
//! - `CallSite` remembers the member a dynamic call site resolved to, and
//!   revalidates it against the receiver class's version.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use arc_swap::ArcSwapOption;

use crate::context::RuntimeContext;
use crate::errors::Result;
use crate::ids::ModuleId;
use crate::member::MemberInfo;
use crate::module::VersionHandle;
use crate::resolve::{MethodResolution, VisibilityContext};
use crate::util::{FastHashMap, fast_map_new};

#[derive(Clone, PartialEq, Eq, Hash)]
struct FailureKey {
    provider: Arc<str>,
    name: Arc<str>,
    is_static: bool,
}

type FailureTable = FastHashMap<FailureKey, u64>;

/// Lookup-failure memo keyed by (provider, name, static).
///
/// Writers take the table out of the slot and put it back when done. A
/// writer that finds the slot empty skips caching rather than waiting.
pub struct FailureCache {
    slot: ArcSwapOption<FailureTable>,
    enabled: bool,
    capacity: usize,
    hits: AtomicU64,
    skipped: AtomicU64,
}

impl FailureCache {
    pub fn new(enabled: bool, capacity: usize) -> Self {
        let table: FailureTable = fast_map_new();
        Self {
            slot: ArcSwapOption::from_pointee(table),
            enabled,
            capacity: capacity.max(1),
            hits: AtomicU64::new(0),
            skipped: AtomicU64::new(0),
        }
    }

    /// True when a failure for this key was recorded under `version`.
    pub fn is_cached_failure(&self, provider: &str, name: &str, is_static: bool, version: u64) -> bool {
        if !self.enabled {
            return false;
        }
        let guard = self.slot.load();
        let Some(table) = &*guard else {
            return false;
        };
        let key = FailureKey {
            provider: Arc::from(provider),
            name: Arc::from(name),
            is_static,
        };
        let hit = table.get(&key) == Some(&version);
        if hit {
            self.hits.fetch_add(1, Ordering::Relaxed);
        }
        hit
    }

    pub fn record_failure(&self, provider: &str, name: &str, is_static: bool, version: u64) {
        if !self.enabled {
            return;
        }
        let Some(mut table) = self.slot.swap(None) else {
            self.skipped.fetch_add(1, Ordering::Relaxed);
            tracing::trace!(provider, name, "failure cache busy, skipped");
            return;
        };
        let map = Arc::make_mut(&mut table);
        if map.len() >= self.capacity {
            map.clear();
        }
        map.insert(
            FailureKey {
                provider: Arc::from(provider),
                name: Arc::from(name),
                is_static,
            },
            version,
        );
        self.slot.store(Some(table));
    }

    pub fn len(&self) -> usize {
        (*self.slot.load()).as_ref().map_or(0, |t| t.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        if let Some(mut table) = self.slot.swap(None) {
            Arc::make_mut(&mut table).clear();
            self.slot.store(Some(table));
        }
    }

    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    pub fn skipped(&self) -> u64 {
        self.skipped.load(Ordering::Relaxed)
    }

    #[cfg(test)]
    fn take(&self) -> Option<Arc<FailureTable>> {
        self.slot.swap(None)
    }

    #[cfg(test)]
    fn put_back(&self, table: Arc<FailureTable>) {
        self.slot.store(Some(table));
    }
}

struct SiteBinding {
    class: ModuleId,
    handle: Arc<VersionHandle>,
    version: u64,
    member: Arc<MemberInfo>,
}

/// Monomorphic cache for one dynamic call site.
pub struct CallSite {
    name: Arc<str>,
    visibility: VisibilityContext,
    binding: ArcSwapOption<SiteBinding>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl CallSite {
    pub fn new(name: &str, visibility: VisibilityContext) -> Self {
        Self {
            name: Arc::from(name),
            visibility,
            binding: ArcSwapOption::empty(),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Member the site currently dispatches to for `class`.
    ///
    /// A binding for the same class whose version handle still carries the
    /// bound version is returned without locking. Anything else resolves
    /// again and rebinds. `Ok(None)` means the name does not resolve to a
    /// callable member.
    pub fn lookup(&self, ctx: &RuntimeContext, class: ModuleId) -> Result<Option<Arc<MemberInfo>>> {
        if let Some(binding) = &*self.binding.load() {
            if binding.class == class && binding.handle.get() == binding.version {
                self.hits.fetch_add(1, Ordering::Relaxed);
                return Ok(Some(Arc::clone(&binding.member)));
            }
        }
        self.misses.fetch_add(1, Ordering::Relaxed);

        let handle = ctx.version_handle(class)?;
        // Read the version before resolving so a concurrent update forces the
        // next lookup to miss.
        let version = handle.get();
        match ctx.resolve_method_for_site(class, &self.name, self.visibility)? {
            MethodResolution::Found(member) => {
                self.binding.store(Some(Arc::new(SiteBinding {
                    class,
                    handle,
                    version,
                    member: Arc::clone(&member),
                })));
                Ok(Some(member))
            }
            _ => {
                self.binding.store(None);
                Ok(None)
            }
        }
    }

    pub fn is_bound(&self) -> bool {
        self.binding.load().is_some()
    }

    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    pub fn misses(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }
}

impl Default for CallSite {
    fn default() -> Self {
        Self::new("", VisibilityContext::All)
    }
}

impl std::fmt::Debug for CallSite {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CallSite")
            .field("name", &self.name)
            .field("bound", &self.is_bound())
            .field("hits", &self.hits())
            .field("misses", &self.misses())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failure_is_stamped_with_version() {
        let cache = FailureCache::new(true, 8);
        cache.record_failure("host", "foo", false, 1);
        assert!(cache.is_cached_failure("host", "foo", false, 1));
        assert!(!cache.is_cached_failure("host", "foo", true, 1));
        assert!(!cache.is_cached_failure("host", "foo", false, 2));
        assert_eq!(cache.hits(), 1);
    }

    #[test]
    fn busy_cache_skips_recording() {
        let cache = FailureCache::new(true, 8);
        let table = cache.take().unwrap();
        cache.record_failure("host", "foo", false, 0);
        assert_eq!(cache.skipped(), 1);
        assert!(!cache.is_cached_failure("host", "foo", false, 0));
        cache.put_back(table);
        assert!(cache.is_empty());
    }

    #[test]
    fn capacity_resets_table() {
        let cache = FailureCache::new(true, 2);
        cache.record_failure("h", "a", false, 0);
        cache.record_failure("h", "b", false, 0);
        cache.record_failure("h", "c", false, 0);
        assert_eq!(cache.len(), 1);
        assert!(cache.is_cached_failure("h", "c", false, 0));
    }

    #[test]
    fn disabled_cache_records_nothing() {
        let cache = FailureCache::new(false, 8);
        cache.record_failure("h", "a", false, 0);
        assert!(!cache.is_cached_failure("h", "a", false, 0));
    }
}
