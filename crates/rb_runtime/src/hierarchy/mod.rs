//! The class hierarchy: module arena, dependency index and versioning.
//!
//! Everything here runs under the runtime's hierarchy lock. Methods taking
//! `&self` are safe under a read guard; they only touch atomics and the
//! interior-locked caches. Structural changes take `&mut self`.

mod constants;
mod methods;
mod mixins;
mod singleton;

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use smallvec::SmallVec;

use crate::cache::FailureCache;
use crate::config::RuntimeConfig;
use crate::errors::{Result, RuntimeError, messages};
use crate::ids::{ModuleId, RuntimeId};
use crate::module::{Attached, ClassData, ModuleData, ModuleKind, VersionHandle};
use crate::object::StructLayout;
use crate::util::{FastHashMap, FastHashSet, OrderedMap, OrderedSet, fast_map_new, fast_set_new, ordered_map_new, ordered_set_new};
use crate::value::Value;

pub(crate) type Ancestors = SmallVec<[ModuleId; 16]>;

struct Slot {
    generation: u32,
    data: Option<Box<ModuleData>>,
}

pub struct ClassHierarchy {
    runtime: RuntimeId,
    slots: Vec<Slot>,
    free: Vec<u32>,
    /// module or class -> classes whose resolution goes through it
    dependents: FastHashMap<ModuleId, OrderedSet<ModuleId>>,
    root_class: Option<ModuleId>,
    /// Constant namespace of the root class.
    globals: OrderedMap<Arc<str>, Value>,
    /// Names that call sites failed to resolve.
    missing_methods: Mutex<FastHashSet<Arc<str>>>,
    missing_method_capacity: usize,
    global_version: Arc<AtomicU64>,
    failures: FailureCache,
    trace_invalidation: bool,
}

impl ClassHierarchy {
    pub(crate) fn new(runtime: RuntimeId, config: &RuntimeConfig, global_version: Arc<AtomicU64>) -> Self {
        Self {
            runtime,
            slots: Vec::new(),
            free: Vec::new(),
            dependents: fast_map_new(),
            root_class: None,
            globals: ordered_map_new(),
            missing_methods: Mutex::new(fast_set_new()),
            missing_method_capacity: config.missing_method_capacity.max(1),
            global_version,
            failures: FailureCache::new(config.failure_cache_enabled, config.failure_cache_capacity),
            trace_invalidation: config.trace_invalidation,
        }
    }

    pub(crate) fn get(&self, id: ModuleId) -> Result<&ModuleData> {
        if id.runtime != self.runtime {
            return Err(RuntimeError::ForeignModule(id));
        }
        match self.slots.get(id.index as usize) {
            Some(Slot { generation, data: Some(data) }) if *generation == id.generation => Ok(&**data),
            _ => Err(RuntimeError::InvalidModule(id)),
        }
    }

    pub(crate) fn get_mut(&mut self, id: ModuleId) -> Result<&mut ModuleData> {
        if id.runtime != self.runtime {
            return Err(RuntimeError::ForeignModule(id));
        }
        match self.slots.get_mut(id.index as usize) {
            Some(Slot { generation, data: Some(data) }) if *generation == id.generation => Ok(&mut **data),
            _ => Err(RuntimeError::InvalidModule(id)),
        }
    }

    pub(crate) fn is_live(&self, id: ModuleId) -> bool {
        self.get(id).is_ok()
    }

    fn insert(&mut self, name: Option<Arc<str>>, kind: ModuleKind) -> ModuleId {
        let (index, generation) = match self.free.pop() {
            Some(index) => (index, self.slots[index as usize].generation),
            None => {
                self.slots.push(Slot { generation: 0, data: None });
                ((self.slots.len() - 1) as u32, 0)
            }
        };
        let id = ModuleId { runtime: self.runtime, index, generation };
        self.slots[index as usize].data = Some(Box::new(ModuleData::new(id, name, kind)));
        id
    }

    fn remove(&mut self, id: ModuleId) -> Result<Box<ModuleData>> {
        self.get(id)?;
        let slot = &mut self.slots[id.index as usize];
        let data = slot.data.take().ok_or(RuntimeError::InvalidModule(id))?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(id.index);
        Ok(data)
    }

    fn live_modules(&self) -> impl Iterator<Item = &ModuleData> {
        self.slots.iter().filter_map(|s| s.data.as_deref())
    }

    pub(crate) fn module_count(&self) -> usize {
        self.live_modules().count()
    }

    pub(crate) fn define_root_class(&mut self, name: &str) -> Result<ModuleId> {
        if self.root_class.is_some() {
            return Err(RuntimeError::name_error(messages::ROOT_ALREADY_DEFINED, name));
        }
        let name = checked_name(Some(name))?;
        let id = self.create_class(name, None, None, None)?;
        self.root_class = Some(id);
        Ok(id)
    }

    pub(crate) fn define_module(&mut self, name: Option<&str>) -> Result<ModuleId> {
        let name = checked_name(name)?;
        let id = self.insert(name, ModuleKind::Module);
        tracing::trace!(module = %self.describe(id), "module defined");
        Ok(id)
    }

    pub(crate) fn define_class(
        &mut self,
        name: Option<&str>,
        superclass: ModuleId,
        layout: Option<StructLayout>,
    ) -> Result<ModuleId> {
        let name = checked_name(name)?;
        let super_data = self.get(superclass)?;
        if !super_data.is_class() {
            return Err(RuntimeError::NotAClass(super_data.describe()));
        }
        if super_data.is_singleton() {
            return Err(RuntimeError::NameError(format!("can't make subclass of singleton class {}", super_data.describe())));
        }
        self.create_class(name, Some(superclass), None, layout.map(Arc::new))
    }

    pub(crate) fn create_class(
        &mut self,
        name: Option<Arc<str>>,
        superclass: Option<ModuleId>,
        attached: Option<Attached>,
        layout: Option<Arc<StructLayout>>,
    ) -> Result<ModuleId> {
        let (level, inherited_layout) = match superclass {
            Some(s) => {
                let data = self.get(s)?;
                let class = data.class().ok_or_else(|| RuntimeError::NotAClass(data.describe()))?;
                (class.level + 1, class.struct_layout.clone())
            }
            None => (0, None),
        };
        let version = Arc::new(VersionHandle::new(self.next_version()));
        let id = self.insert(
            name,
            ModuleKind::Class(ClassData {
                superclass,
                level,
                version,
                attached,
                struct_layout: layout.or(inherited_layout),
            }),
        );
        if let Some(s) = superclass {
            self.add_dependent(s, id);
        }
        tracing::trace!(class = %self.describe(id), level, "class defined");
        Ok(id)
    }

    pub(crate) fn root_class(&self) -> Option<ModuleId> {
        self.root_class
    }

    pub(crate) fn describe(&self, id: ModuleId) -> String {
        match self.get(id) {
            Ok(data) => data.describe(),
            Err(_) => format!("{id:?}"),
        }
    }

    pub(crate) fn class_data(&self, id: ModuleId) -> Result<&ClassData> {
        let data = self.get(id)?;
        data.class().ok_or_else(|| RuntimeError::NotAClass(data.describe()))
    }

    pub(crate) fn check_mutable(&self, id: ModuleId) -> Result<()> {
        let data = self.get(id)?;
        if data.frozen {
            return Err(RuntimeError::FrozenModule(data.describe()));
        }
        Ok(())
    }

    pub(crate) fn freeze_module(&mut self, id: ModuleId) -> Result<()> {
        self.get_mut(id)?.frozen = true;
        Ok(())
    }

    /// Method resolution order: the module, its mixins, then the same for
    /// each superclass.
    pub(crate) fn ancestors(&self, id: ModuleId) -> Result<Ancestors> {
        let mut out = Ancestors::new();
        let mut current = Some(id);
        while let Some(cur) = current {
            let data = self.get(cur)?;
            out.push(cur);
            out.extend(data.mixins.iter().copied());
            current = data.superclass();
        }
        Ok(out)
    }

    pub(crate) fn has_ancestor(&self, id: ModuleId, ancestor: ModuleId) -> Result<bool> {
        let mut current = Some(id);
        while let Some(cur) = current {
            let data = self.get(cur)?;
            if cur == ancestor || data.mixins.contains(&ancestor) {
                return Ok(true);
            }
            current = data.superclass();
        }
        Ok(false)
    }

    /// Superclass-chain test; mixins do not count.
    pub(crate) fn is_subclass_of(&self, class: ModuleId, other: ModuleId) -> Result<bool> {
        let mut current = Some(class);
        while let Some(cur) = current {
            if cur == other {
                return Ok(true);
            }
            current = self.class_data(cur)?.superclass;
        }
        Ok(false)
    }

    pub(crate) fn failures(&self) -> &FailureCache {
        &self.failures
    }

    pub(crate) fn is_missing_method(&self, name: &str) -> bool {
        self.missing_methods.lock().contains(name)
    }

    /// Remembers a name a call site failed to resolve. A full set starts
    /// over; every class is bumped first, since sites caching a forgotten
    /// miss would otherwise survive a later definition of the name.
    pub(crate) fn record_missing_method(&self, name: &str) {
        let mut missing = self.missing_methods.lock();
        if missing.contains(name) {
            return;
        }
        if missing.len() >= self.missing_method_capacity {
            tracing::debug!(names = missing.len(), "missing method set full, invalidating all classes");
            let classes: Vec<ModuleId> = self.live_modules().filter(|m| m.is_class()).map(|m| m.id).collect();
            for class in classes {
                self.bump(class);
            }
            missing.clear();
        }
        missing.insert(Arc::from(name));
    }

    pub(crate) fn missing_method_count(&self) -> usize {
        self.missing_methods.lock().len()
    }

    pub(crate) fn methods_need_init(&self, id: ModuleId) -> Result<bool> {
        for anc in self.ancestors(id)? {
            if self.get(anc)?.methods.needs_initialization() {
                return Ok(true);
            }
        }
        Ok(false)
    }

    pub(crate) fn initialize_methods(&mut self, id: ModuleId) -> Result<()> {
        for anc in self.ancestors(id)? {
            self.initialize_own_methods(anc)?;
        }
        Ok(())
    }

    pub(crate) fn initialize_own_methods(&mut self, id: ModuleId) -> Result<()> {
        let data = self.get_mut(id)?;
        if data.methods.initialize(id) {
            let count = data.methods.entries().len();
            tracing::trace!(module = %data.describe(), count, "MT_INIT");
        }
        Ok(())
    }

    pub(crate) fn constants_need_init(&self, id: ModuleId) -> Result<bool> {
        for anc in self.ancestors(id)? {
            if self.get(anc)?.constants.needs_initialization() {
                return Ok(true);
            }
        }
        Ok(false)
    }

    pub(crate) fn initialize_constants(&mut self, id: ModuleId) -> Result<()> {
        for anc in self.ancestors(id)? {
            self.initialize_own_constants(anc)?;
        }
        Ok(())
    }

    pub(crate) fn initialize_own_constants(&mut self, id: ModuleId) -> Result<()> {
        let is_root = self.root_class == Some(id);
        let data = self.get_mut(id)?;
        if !data.constants.initialize(id) {
            return Ok(());
        }
        let count = data.constants.entries().len();
        tracing::trace!(module = %data.describe(), count, "CT_INIT");
        if is_root {
            let entries: Vec<_> = data.constants.entries_mut().drain(..).collect();
            self.globals.extend(entries);
        }
        Ok(())
    }

    pub(crate) fn add_dependent(&mut self, module: ModuleId, dependent: ModuleId) {
        self.dependents.entry(module).or_insert_with(ordered_set_new).insert(dependent);
    }

    pub(crate) fn remove_dependent(&mut self, module: ModuleId, dependent: ModuleId) {
        if let Some(set) = self.dependents.get_mut(&module) {
            set.shift_remove(&dependent);
        }
    }

    /// Live classes registered directly on `module`.
    pub(crate) fn direct_dependents(&self, module: ModuleId) -> Vec<ModuleId> {
        match self.dependents.get(&module) {
            Some(set) => set.iter().copied().filter(|d| self.is_live(*d)).collect(),
            None => Vec::new(),
        }
    }

    /// Every class reachable through the dependency index, excluding
    /// `module` itself.
    pub(crate) fn dependent_closure(&self, module: ModuleId) -> Vec<ModuleId> {
        let mut seen: FastHashSet<ModuleId> = fast_set_new();
        let mut out = Vec::new();
        let mut stack = vec![module];
        seen.insert(module);
        while let Some(cur) = stack.pop() {
            for dep in self.direct_dependents(cur) {
                if seen.insert(dep) {
                    out.push(dep);
                    stack.push(dep);
                }
            }
        }
        out
    }

    /// Drops index entries whose ids no longer name live modules.
    pub(crate) fn prune_dependents(&mut self) -> usize {
        let live: FastHashSet<ModuleId> = self.live_modules().map(|m| m.id).collect();
        let mut removed = 0;
        self.dependents.retain(|module, set| {
            if !live.contains(module) {
                removed += set.len();
                return false;
            }
            let before = set.len();
            set.retain(|d| live.contains(d));
            removed += before - set.len();
            !set.is_empty()
        });
        removed
    }

    pub(crate) fn next_version(&self) -> u64 {
        self.global_version.fetch_add(1, Ordering::AcqRel) + 1
    }

    fn bump(&self, class: ModuleId) {
        if let Ok(data) = self.get(class) {
            if let Some(c) = data.class() {
                c.version.set(self.next_version());
                if self.trace_invalidation {
                    tracing::debug!(class = %data.describe(), version = c.version.get(), "class version bumped");
                }
            }
        }
    }

    /// Bumps the version of `module` (when it is a class) and of every class
    /// that depends on it.
    pub(crate) fn methods_updated(&self, module: ModuleId, reason: &str) {
        self.bump(module);
        let dependents = self.dependent_closure(module);
        for dep in &dependents {
            self.bump(*dep);
        }
        tracing::trace!(module = %self.describe(module), reason, dependents = dependents.len(), "UPDATED");
    }

    /// Bumps only the class's own version. No-op for plain modules.
    pub(crate) fn touch(&self, module: ModuleId) {
        self.bump(module);
    }
}

fn checked_name(name: Option<&str>) -> Result<Option<Arc<str>>> {
    match name {
        Some("") => Err(RuntimeError::name_error(messages::EMPTY_NAME, "")),
        Some(n) => Ok(Some(Arc::from(n))),
        None => Ok(None),
    }
}
