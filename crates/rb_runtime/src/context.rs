//! The runtime context: one class hierarchy behind one lock.
//!
//! Every public operation acquires the hierarchy lock for its whole
//! duration. Lookups take a read guard; when a lookup first reaches a
//! module whose lazy table has not been populated it upgrades, populates and
//! downgrades again.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::{RwLock, RwLockReadGuard, RwLockUpgradableReadGuard, RwLockWriteGuard};
use rb_core::MutableString;

use crate::cache::FailureCache;
use crate::config::RuntimeConfig;
use crate::errors::{Result, RuntimeError, messages};
use crate::hierarchy::ClassHierarchy;
use crate::ids::{ModuleId, RuntimeId};
use crate::member::{MemberInfo, MemberKind, MethodBody, Visibility};
use crate::module::{Attached, ConstantInitializer, MethodInitializer, TableState, VersionHandle};
use crate::native::{NativeMembers, NativeSlot};
use crate::object::{ObjectRef, RubyObject, StructLayout};
use crate::regex::{RegexCache, RegexOptions, TranslatedRegex};
use crate::resolve::{MethodResolution, VisibilityContext};
use crate::value::Value;

pub struct RuntimeContext {
    id: RuntimeId,
    config: RuntimeConfig,
    hierarchy: RwLock<ClassHierarchy>,
    global_version: Arc<AtomicU64>,
    regexes: RegexCache,
}

impl RuntimeContext {
    pub fn new(config: RuntimeConfig) -> Self {
        let id = RuntimeId::next();
        let global_version = Arc::new(AtomicU64::new(0));
        let hierarchy = ClassHierarchy::new(id, &config, Arc::clone(&global_version));
        let regexes = RegexCache::with_capacity(config.regex_cache_capacity);
        tracing::debug!(runtime = id.as_u32(), "runtime context created");
        Self {
            id,
            config,
            hierarchy: RwLock::new(hierarchy),
            global_version,
            regexes,
        }
    }

    pub fn id(&self) -> RuntimeId {
        self.id
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    /// Current value of the runtime-wide version counter. Lock-free.
    pub fn global_version(&self) -> u64 {
        self.global_version.load(Ordering::Acquire)
    }

    fn read(&self) -> RwLockReadGuard<'_, ClassHierarchy> {
        self.hierarchy.read()
    }

    fn write(&self) -> RwLockWriteGuard<'_, ClassHierarchy> {
        self.hierarchy.write()
    }

    /// Read guard under which every method table on the ancestor chain of
    /// `id` is populated.
    fn read_with_methods(&self, id: ModuleId) -> Result<RwLockReadGuard<'_, ClassHierarchy>> {
        let guard = self.hierarchy.read();
        if !guard.methods_need_init(id)? {
            return Ok(guard);
        }
        drop(guard);
        let guard = self.hierarchy.upgradable_read();
        if !guard.methods_need_init(id)? {
            return Ok(RwLockUpgradableReadGuard::downgrade(guard));
        }
        let mut guard = RwLockUpgradableReadGuard::upgrade(guard);
        guard.initialize_methods(id)?;
        Ok(RwLockWriteGuard::downgrade(guard))
    }

    fn read_with_constants(&self, id: ModuleId) -> Result<RwLockReadGuard<'_, ClassHierarchy>> {
        let guard = self.hierarchy.read();
        if !guard.constants_need_init(id)? {
            return Ok(guard);
        }
        drop(guard);
        let guard = self.hierarchy.upgradable_read();
        if !guard.constants_need_init(id)? {
            return Ok(RwLockUpgradableReadGuard::downgrade(guard));
        }
        let mut guard = RwLockUpgradableReadGuard::upgrade(guard);
        guard.initialize_constants(id)?;
        Ok(RwLockWriteGuard::downgrade(guard))
    }

    /// Defines the root of the class tree. Allowed once per runtime.
    pub fn define_root_class(&self, name: &str) -> Result<ModuleId> {
        self.write().define_root_class(name)
    }

    pub fn root_class(&self) -> Option<ModuleId> {
        self.read().root_class()
    }

    pub fn define_module(&self, name: Option<&str>) -> Result<ModuleId> {
        self.write().define_module(name)
    }

    pub fn define_class(&self, name: Option<&str>, superclass: ModuleId) -> Result<ModuleId> {
        self.write().define_class(name, superclass, None)
    }

    pub fn define_struct_class<S: AsRef<str>>(&self, name: Option<&str>, superclass: ModuleId, members: &[S]) -> Result<ModuleId> {
        let layout = StructLayout::new(members)?;
        self.write().define_class(name, superclass, Some(layout))
    }

    /// Installs the routine that populates the method table on first use.
    pub fn set_method_initializer(&self, id: ModuleId, init: MethodInitializer) -> Result<()> {
        let mut h = self.write();
        let data = h.get_mut(id)?;
        let name = data.describe();
        data.methods
            .set_initializer(init)
            .map_err(|_| RuntimeError::name_error(messages::INITIALIZER_ALREADY_RAN, &name))
    }

    pub fn set_constant_initializer(&self, id: ModuleId, init: ConstantInitializer) -> Result<()> {
        let mut h = self.write();
        let data = h.get_mut(id)?;
        let name = data.describe();
        data.constants
            .set_initializer(init)
            .map_err(|_| RuntimeError::name_error(messages::INITIALIZER_ALREADY_RAN, &name))
    }

    pub fn set_native_members(&self, id: ModuleId, provider: Arc<dyn NativeMembers>) -> Result<()> {
        let mut h = self.write();
        h.get_mut(id)?.native = Some(NativeSlot::new(provider));
        h.methods_updated(id, "native members attached");
        Ok(())
    }

    /// Called after a native provider's member set changed. Drops members
    /// handed out so far and invalidates sites that may have cached them.
    pub fn native_members_changed(&self, id: ModuleId) -> Result<()> {
        let h = self.write();
        let data = h.get(id)?;
        let Some(slot) = &data.native else {
            return Ok(());
        };
        let cached = slot.any_site_cached();
        slot.clear_loaded();
        if let Some(singleton) = data.singleton {
            h.methods_updated(singleton, "native members changed");
        }
        if cached || h.get(id)?.is_class() {
            h.methods_updated(id, "native members changed");
        }
        Ok(())
    }

    pub fn freeze_module(&self, id: ModuleId) -> Result<()> {
        self.write().freeze_module(id)
    }

    pub fn is_module_frozen(&self, id: ModuleId) -> Result<bool> {
        Ok(self.read().get(id)?.frozen)
    }

    pub fn method_table_state(&self, id: ModuleId) -> Result<TableState> {
        Ok(self.read().get(id)?.methods.state())
    }

    pub fn constant_table_state(&self, id: ModuleId) -> Result<TableState> {
        Ok(self.read().get(id)?.constants.state())
    }

    pub fn module_name(&self, id: ModuleId) -> Result<Option<Arc<str>>> {
        Ok(self.read().get(id)?.name.clone())
    }

    /// Name for messages; anonymous modules get a generated one.
    pub fn describe(&self, id: ModuleId) -> String {
        self.read().describe(id)
    }

    pub fn is_class(&self, id: ModuleId) -> Result<bool> {
        Ok(self.read().get(id)?.is_class())
    }

    pub fn is_singleton_class(&self, id: ModuleId) -> Result<bool> {
        Ok(self.read().get(id)?.is_singleton())
    }

    pub fn attached_of(&self, id: ModuleId) -> Result<Option<Attached>> {
        self.read().attached_of(id)
    }

    pub fn superclass(&self, id: ModuleId) -> Result<Option<ModuleId>> {
        Ok(self.read().class_data(id)?.superclass)
    }

    pub fn level(&self, id: ModuleId) -> Result<u32> {
        Ok(self.read().class_data(id)?.level)
    }

    pub fn class_version(&self, id: ModuleId) -> Result<u64> {
        Ok(self.read().class_data(id)?.version.get())
    }

    pub fn version_handle(&self, id: ModuleId) -> Result<Arc<VersionHandle>> {
        Ok(Arc::clone(&self.read().class_data(id)?.version))
    }

    pub fn struct_layout(&self, id: ModuleId) -> Result<Option<Arc<StructLayout>>> {
        Ok(self.read().class_data(id)?.struct_layout.clone())
    }

    pub fn mixins(&self, id: ModuleId) -> Result<Vec<ModuleId>> {
        Ok(self.read().get(id)?.mixins.clone())
    }

    pub fn ancestors(&self, id: ModuleId) -> Result<Vec<ModuleId>> {
        Ok(self.read().ancestors(id)?.into_vec())
    }

    pub fn has_ancestor(&self, id: ModuleId, ancestor: ModuleId) -> Result<bool> {
        self.read().has_ancestor(id, ancestor)
    }

    pub fn is_subclass_of(&self, class: ModuleId, other: ModuleId) -> Result<bool> {
        self.read().is_subclass_of(class, other)
    }

    pub fn include_modules(&self, target: ModuleId, modules: &[ModuleId]) -> Result<()> {
        self.write().include_modules(target, modules)
    }

    pub fn module_count(&self) -> usize {
        self.read().module_count()
    }

    /// Defines or redefines a method. `caller` is the runtime the defining
    /// code runs in; it has to be this one.
    pub fn define_method(
        &self,
        id: ModuleId,
        name: &str,
        body: MethodBody,
        visibility: Visibility,
        caller: RuntimeId,
    ) -> Result<Arc<MemberInfo>> {
        if caller != self.id || id.runtime() != self.id {
            return Err(RuntimeError::CrossContextDefinition);
        }
        self.write().define_method(id, name, MemberKind::Method(body), visibility)
    }

    pub fn remove_method(&self, id: ModuleId, name: &str) -> Result<bool> {
        self.write().remove_method(id, name)
    }

    pub fn undefine_method(&self, id: ModuleId, name: &str) -> Result<()> {
        self.write().undefine_method(id, name)
    }

    pub fn hide_method(&self, id: ModuleId, name: &str) -> Result<()> {
        self.write().hide_method(id, name)
    }

    pub fn alias_method(&self, id: ModuleId, new_name: &str, old_name: &str) -> Result<Arc<MemberInfo>> {
        self.write().alias_method(id, new_name, old_name)
    }

    pub fn set_method_visibility(&self, id: ModuleId, name: &str, visibility: Visibility) -> Result<()> {
        self.write().set_method_visibility(id, name, visibility)
    }

    pub fn method_names(&self, id: ModuleId, inherited: bool) -> Result<Vec<Arc<str>>> {
        self.read_with_methods(id)?.method_names(id, inherited)
    }

    pub fn resolve_method(&self, id: ModuleId, name: &str, visibility: VisibilityContext) -> Result<MethodResolution> {
        self.read_with_methods(id)?.resolve_method(id, name, visibility)
    }

    pub fn resolve_method_for_site(
        &self,
        id: ModuleId,
        name: &str,
        visibility: VisibilityContext,
    ) -> Result<MethodResolution> {
        self.read_with_methods(id)?.resolve_method_for_site(id, name, visibility)
    }

    pub fn require_method(&self, id: ModuleId, name: &str, visibility: VisibilityContext) -> Result<Arc<MemberInfo>> {
        self.read_with_methods(id)?.require_method(id, name, visibility)
    }

    pub fn resolve_super_method(&self, id: ModuleId, name: &str, current_owner: ModuleId) -> Result<MethodResolution> {
        self.read_with_methods(id)?.resolve_super_method(id, name, current_owner)
    }

    pub fn find_method_owner(&self, id: ModuleId, name: &str) -> Result<Option<ModuleId>> {
        self.read_with_methods(id)?.find_method_owner(id, name)
    }

    pub fn set_constant(&self, id: ModuleId, name: &str, value: Value) -> Result<()> {
        self.write().set_constant(id, name, value)
    }

    pub fn get_constant(&self, id: ModuleId, name: &str) -> Result<Option<Value>> {
        self.read_with_constants(id)?.get_constant(id, name)
    }

    pub fn resolve_constant(&self, id: ModuleId, name: &str) -> Result<Value> {
        self.read_with_constants(id)?.resolve_constant(id, name)
    }

    pub fn remove_constant(&self, id: ModuleId, name: &str) -> Result<Value> {
        self.write().remove_constant(id, name)
    }

    pub fn constant_names(&self, id: ModuleId) -> Result<Vec<Arc<str>>> {
        self.read_with_constants(id)?.constant_names(id)
    }

    pub fn set_class_variable(&self, id: ModuleId, name: &str, value: Value) -> Result<()> {
        self.write().set_class_variable(id, name, value)
    }

    pub fn resolve_class_variable(&self, id: ModuleId, name: &str) -> Result<Value> {
        self.read().resolve_class_variable(id, name)
    }

    pub fn class_variable_names(&self, id: ModuleId) -> Result<Vec<Arc<str>>> {
        self.read().class_variable_names(id)
    }

    pub fn singleton_class_of(&self, id: ModuleId) -> Result<ModuleId> {
        if let Some(existing) = self.read().get(id)?.singleton {
            return Ok(existing);
        }
        self.write().singleton_class_of(id)
    }

    pub fn singleton_class_for_object(&self, object: &RubyObject) -> Result<ModuleId> {
        if let Some(existing) = object.singleton_class() {
            return Ok(existing);
        }
        self.write().singleton_class_for_object(object)
    }

    pub fn duplicate_module(&self, id: ModuleId) -> Result<ModuleId> {
        let mut h = self.write();
        let data = h.get(id)?;
        if data.is_class() {
            return Err(RuntimeError::NotAModule(data.describe()));
        }
        h.duplicate(id)
    }

    pub fn duplicate_class(&self, id: ModuleId) -> Result<ModuleId> {
        let mut h = self.write();
        let data = h.get(id)?;
        if !data.is_class() {
            return Err(RuntimeError::NotAClass(data.describe()));
        }
        h.duplicate(id)
    }

    pub fn retire_module(&self, id: ModuleId) -> Result<()> {
        self.write().retire_module(id)
    }

    /// Allocates an uninitialized instance of `class`.
    pub fn allocate(&self, class: ModuleId) -> Result<ObjectRef> {
        let h = self.read();
        let data = h.get(class)?;
        let class_data = data.class().ok_or_else(|| RuntimeError::NotAClass(data.describe()))?;
        if class_data.attached.is_some() {
            return Err(RuntimeError::NameError(format!("can't create instance of singleton class {}", data.describe())));
        }
        Ok(Arc::new(RubyObject::new(class, class_data.struct_layout.clone())))
    }

    /// Finds the `initialize` method the object should run. `None` means
    /// the class has no initializer.
    pub fn initialize(&self, object: &RubyObject) -> Result<Option<Arc<MemberInfo>>> {
        let class = object.dispatch_class();
        Ok(self
            .resolve_method_for_site(class, "initialize", VisibilityContext::ImplicitSelf)?
            .into_member())
    }

    /// Frozen string value in the configured default encoding.
    pub fn string(&self, text: &str) -> Value {
        Value::string(MutableString::create_text(text, self.config.default_encoding))
    }

    /// Translation of a regex literal, shared by every construction of the
    /// same (pattern, options).
    pub fn regex(&self, pattern: &str, options: RegexOptions) -> Result<Arc<TranslatedRegex>> {
        Ok(self.regexes.get_or_translate(pattern, options)?)
    }

    pub fn regex_cache(&self) -> &RegexCache {
        &self.regexes
    }

    /// Runs `f` with the failure cache under a read guard.
    pub fn with_failure_cache<R>(&self, f: impl FnOnce(&FailureCache) -> R) -> R {
        f(self.read().failures())
    }

    /// Drops dependency entries of retired modules. Returns how many were
    /// removed.
    pub fn prune_dependents(&self) -> usize {
        self.write().prune_dependents()
    }
}

impl Default for RuntimeContext {
    fn default() -> Self {
        Self::new(RuntimeConfig::default())
    }
}

impl std::fmt::Debug for RuntimeContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RuntimeContext")
            .field("id", &self.id)
            .field("global_version", &self.global_version())
            .finish()
    }
}
