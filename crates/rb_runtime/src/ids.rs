//! Identifiers for runtime instances and the modules they own.

use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};

static NEXT_RUNTIME: AtomicU32 = AtomicU32::new(1);

/// Identity of one `RuntimeContext`. Every module id carries the id of the
/// runtime that created it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RuntimeId(u32);

impl RuntimeId {
    pub(crate) fn next() -> Self {
        RuntimeId(NEXT_RUNTIME.fetch_add(1, Ordering::Relaxed))
    }

    pub fn as_u32(self) -> u32 {
        self.0
    }
}

/// Generational handle into a runtime's module arena.
///
/// Retiring a module bumps the slot generation, so old handles stop
/// resolving instead of aliasing whatever reuses the slot.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ModuleId {
    pub(crate) runtime: RuntimeId,
    pub(crate) index: u32,
    pub(crate) generation: u32,
}

impl ModuleId {
    pub fn runtime(self) -> RuntimeId {
        self.runtime
    }

    pub fn index(self) -> u32 {
        self.index
    }

    pub fn generation(self) -> u32 {
        self.generation
    }
}

impl fmt::Debug for ModuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ModuleId({}:{}#{})", self.runtime.0, self.index, self.generation)
    }
}
