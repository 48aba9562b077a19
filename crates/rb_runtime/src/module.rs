//! Per-module state stored in the class hierarchy arena.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::ids::ModuleId;
use crate::member::{MemberInfo, MemberKind, MethodBody, Visibility};
use crate::native::NativeSlot;
use crate::object::StructLayout;
use crate::util::{OrderedMap, ordered_map_new};
use crate::value::Value;

/// Version cell of one class. Call sites hold the `Arc` and compare without
/// taking the hierarchy lock.
#[derive(Debug)]
pub struct VersionHandle {
    method: AtomicU64,
}

impl VersionHandle {
    pub(crate) fn new(version: u64) -> Self {
        Self { method: AtomicU64::new(version) }
    }

    pub fn get(&self) -> u64 {
        self.method.load(Ordering::Acquire)
    }

    pub(crate) fn set(&self, version: u64) {
        self.method.store(version, Ordering::Release);
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TableState {
    Uninitialized,
    Initializing,
    Initialized,
}

/// Collects the entries produced by a lazy table initializer.
pub struct TableBuilder<T> {
    owner: ModuleId,
    entries: Vec<(Arc<str>, T)>,
}

pub type MethodTableBuilder = TableBuilder<Arc<MemberInfo>>;
pub type ConstantTableBuilder = TableBuilder<Value>;

pub type Initializer<T> = Box<dyn FnOnce(&mut TableBuilder<T>) + Send + Sync>;
pub type MethodInitializer = Initializer<Arc<MemberInfo>>;
pub type ConstantInitializer = Initializer<Value>;

impl<T> TableBuilder<T> {
    pub fn owner(&self) -> ModuleId {
        self.owner
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

impl TableBuilder<Arc<MemberInfo>> {
    pub fn method(&mut self, name: &str, body: MethodBody, visibility: Visibility) -> &mut Self {
        let info = MemberInfo::new(MemberKind::Method(body), visibility, self.owner);
        self.entries.push((Arc::from(name), Arc::new(info)));
        self
    }

    pub fn undefine(&mut self, name: &str) -> &mut Self {
        self.entries.push((Arc::from(name), Arc::new(MemberInfo::undefined(self.owner))));
        self
    }
}

impl TableBuilder<Value> {
    pub fn constant(&mut self, name: &str, value: Value) -> &mut Self {
        self.entries.push((Arc::from(name), value));
        self
    }
}

/// Member table populated on first use by an optional initializer.
pub(crate) struct LazyTable<T> {
    state: TableState,
    entries: OrderedMap<Arc<str>, T>,
    initializer: Option<Initializer<T>>,
}

impl<T> LazyTable<T> {
    pub(crate) fn new() -> Self {
        Self {
            state: TableState::Uninitialized,
            entries: ordered_map_new(),
            initializer: None,
        }
    }

    /// Already-populated table, used for snapshots.
    pub(crate) fn initialized(entries: OrderedMap<Arc<str>, T>) -> Self {
        Self {
            state: TableState::Initialized,
            entries,
            initializer: None,
        }
    }

    pub(crate) fn state(&self) -> TableState {
        self.state
    }

    pub(crate) fn needs_initialization(&self) -> bool {
        self.state == TableState::Uninitialized
    }

    /// Installs an initializer. Returns it back when the table has already
    /// been populated.
    pub(crate) fn set_initializer(&mut self, init: Initializer<T>) -> Result<(), Initializer<T>> {
        if self.state != TableState::Uninitialized {
            return Err(init);
        }
        self.initializer = Some(init);
        Ok(())
    }

    /// Runs the initializer at most once. Returns true if this call
    /// populated the table.
    pub(crate) fn initialize(&mut self, owner: ModuleId) -> bool {
        if self.state != TableState::Uninitialized {
            return false;
        }
        self.state = TableState::Initializing;
        if let Some(init) = self.initializer.take() {
            let mut builder = TableBuilder { owner, entries: Vec::new() };
            init(&mut builder);
            for (name, value) in builder.entries {
                self.entries.insert(name, value);
            }
        }
        self.state = TableState::Initialized;
        true
    }

    pub(crate) fn entries(&self) -> &OrderedMap<Arc<str>, T> {
        &self.entries
    }

    pub(crate) fn entries_mut(&mut self) -> &mut OrderedMap<Arc<str>, T> {
        &mut self.entries
    }

    pub(crate) fn get(&self, name: &str) -> Option<&T> {
        self.entries.get(name)
    }
}

/// What a singleton class is attached to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Attached {
    Module(ModuleId),
    Object,
}

pub(crate) struct ClassData {
    pub(crate) superclass: Option<ModuleId>,
    pub(crate) level: u32,
    pub(crate) version: Arc<VersionHandle>,
    pub(crate) attached: Option<Attached>,
    pub(crate) struct_layout: Option<Arc<StructLayout>>,
}

pub(crate) enum ModuleKind {
    Module,
    Class(ClassData),
}

pub(crate) struct ModuleData {
    pub(crate) id: ModuleId,
    pub(crate) name: Option<Arc<str>>,
    pub(crate) kind: ModuleKind,
    pub(crate) methods: LazyTable<Arc<MemberInfo>>,
    pub(crate) constants: LazyTable<Value>,
    pub(crate) class_variables: OrderedMap<Arc<str>, Value>,
    /// Linearized mixins, most recently included first.
    pub(crate) mixins: Vec<ModuleId>,
    pub(crate) singleton: Option<ModuleId>,
    pub(crate) frozen: bool,
    pub(crate) native: Option<NativeSlot>,
}

impl ModuleData {
    pub(crate) fn new(id: ModuleId, name: Option<Arc<str>>, kind: ModuleKind) -> Self {
        Self {
            id,
            name,
            kind,
            methods: LazyTable::new(),
            constants: LazyTable::new(),
            class_variables: ordered_map_new(),
            mixins: Vec::new(),
            singleton: None,
            frozen: false,
            native: None,
        }
    }

    pub(crate) fn class(&self) -> Option<&ClassData> {
        match &self.kind {
            ModuleKind::Class(c) => Some(c),
            ModuleKind::Module => None,
        }
    }

    pub(crate) fn is_class(&self) -> bool {
        self.class().is_some()
    }

    pub(crate) fn superclass(&self) -> Option<ModuleId> {
        self.class().and_then(|c| c.superclass)
    }

    pub(crate) fn is_singleton(&self) -> bool {
        self.class().is_some_and(|c| c.attached.is_some())
    }

    /// Display name; anonymous modules get an address-like form.
    pub(crate) fn describe(&self) -> String {
        if let Some(name) = &self.name {
            return name.to_string();
        }
        match self.class() {
            Some(ClassData { attached: Some(_), .. }) => format!("#<Class:singleton {}>", self.id.index),
            Some(_) => format!("#<Class:{}>", self.id.index),
            None => format!("#<Module:{}>", self.id.index),
        }
    }
}
