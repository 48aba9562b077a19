//! Collection aliases shared across the runtime.

use ahash::RandomState;
use hashbrown::{HashMap, HashSet};
use indexmap::{IndexMap, IndexSet};

pub type FastHashMap<K, V> = HashMap<K, V, RandomState>;
pub type FastHashSet<K> = HashSet<K, RandomState>;

/// Insertion-ordered map; member tables keep definition order.
pub type OrderedMap<K, V> = IndexMap<K, V, RandomState>;
pub type OrderedSet<K> = IndexSet<K, RandomState>;

#[inline]
pub fn fast_map_new<K, V>() -> FastHashMap<K, V> {
    HashMap::with_hasher(RandomState::new())
}

#[inline]
pub fn fast_set_new<K>() -> FastHashSet<K> {
    HashSet::with_hasher(RandomState::new())
}

#[inline]
pub fn ordered_map_new<K, V>() -> OrderedMap<K, V> {
    IndexMap::with_hasher(RandomState::new())
}

#[inline]
pub fn ordered_set_new<K>() -> OrderedSet<K> {
    IndexSet::with_hasher(RandomState::new())
}

/// Constant names start with an ASCII uppercase letter.
pub fn is_constant_name(name: &str) -> bool {
    name.as_bytes().first().is_some_and(|b| b.is_ascii_uppercase())
}
