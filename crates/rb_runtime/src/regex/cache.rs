use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;

use super::{RegexError, RegexOptions, TranslatedRegex, translate};
use crate::util::{FastHashMap, fast_map_new};

const DEFAULT_CAPACITY: usize = 1024;

/// Translations keyed by (pattern, options), so each distinct regex is
/// translated once per runtime. The table starts over once it holds
/// `capacity` entries.
pub struct RegexCache {
    entries: Mutex<FastHashMap<(Arc<str>, RegexOptions), Arc<TranslatedRegex>>>,
    capacity: usize,
    translations: AtomicU64,
}

impl RegexCache {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Mutex::new(fast_map_new()),
            capacity: capacity.max(1),
            translations: AtomicU64::new(0),
        }
    }

    pub fn get_or_translate(&self, pattern: &str, options: RegexOptions) -> Result<Arc<TranslatedRegex>, RegexError> {
        let key = (Arc::<str>::from(pattern), options);
        // Translation only rewrites the pattern (compilation is deferred), so
        // it runs under the lock and racing callers share one result.
        let mut entries = self.entries.lock();
        if let Some(found) = entries.get(&key) {
            return Ok(Arc::clone(found));
        }
        let translated = Arc::new(translate(pattern, options)?);
        self.translations.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(pattern, options = options.bits(), "regex translated");
        if entries.len() >= self.capacity {
            tracing::debug!(entries = entries.len(), "regex cache full, starting over");
            entries.clear();
        }
        entries.insert(key, Arc::clone(&translated));
        Ok(translated)
    }

    /// Number of translations performed so far.
    pub fn translations(&self) -> u64 {
        self.translations.load(Ordering::Relaxed)
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for RegexCache {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::thread;

    use super::*;

    #[test]
    fn full_cache_starts_over() {
        let cache = RegexCache::with_capacity(2);
        cache.get_or_translate("a", RegexOptions::NONE).unwrap();
        cache.get_or_translate("b", RegexOptions::NONE).unwrap();
        assert_eq!(cache.len(), 2);
        cache.get_or_translate("c", RegexOptions::NONE).unwrap();
        assert_eq!(cache.len(), 1);
        cache.get_or_translate("c", RegexOptions::NONE).unwrap();
        assert_eq!(cache.translations(), 3);
    }

    #[test]
    fn racing_callers_translate_once() {
        let cache = Arc::new(RegexCache::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let cache = Arc::clone(&cache);
                thread::spawn(move || cache.get_or_translate("x+y", RegexOptions::EXTENDED).unwrap())
            })
            .collect();
        let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert_eq!(cache.translations(), 1);
        assert!(results.windows(2).all(|w| Arc::ptr_eq(&w[0], &w[1])));
    }

    #[test]
    fn failed_translations_are_not_cached() {
        let cache = RegexCache::new();
        assert!(cache.get_or_translate("(a", RegexOptions::NONE).is_err());
        assert!(cache.is_empty());
        assert_eq!(cache.translations(), 0);
    }
}
