//! Runtime configuration.

use rb_core::Encoding;
use rb_core::encoding::UTF_8;

/// Runtime configuration options.
#[derive(Clone, Debug)]
pub struct RuntimeConfig {
    /// Encoding given to strings the runtime creates itself.
    pub default_encoding: &'static Encoding,
    /// Memoize failed native member lookups.
    pub failure_cache_enabled: bool,
    /// Number of memoized failures kept before the cache starts over.
    pub failure_cache_capacity: usize,
    /// Number of unresolved call-site names remembered before every class is
    /// invalidated and the set starts over.
    pub missing_method_capacity: usize,
    /// Number of regex translations kept before the cache starts over.
    pub regex_cache_capacity: usize,
    /// Log every class whose version is bumped.
    pub trace_invalidation: bool,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            default_encoding: &UTF_8,
            failure_cache_enabled: true,
            failure_cache_capacity: 4096,
            missing_method_capacity: 4096,
            regex_cache_capacity: 1024,
            trace_invalidation: false,
        }
    }
}
