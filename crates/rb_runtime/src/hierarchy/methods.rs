//! Method table mutation and the invalidation it triggers.

use std::sync::Arc;

use super::ClassHierarchy;
use crate::errors::{Result, RuntimeError};
use crate::ids::ModuleId;
use crate::member::{MemberInfo, MemberKind, Visibility};
use crate::resolve::{MethodResolution, VisibilityContext};

impl ClassHierarchy {
    pub(crate) fn define_method(
        &mut self,
        id: ModuleId,
        name: &str,
        kind: MemberKind,
        visibility: Visibility,
    ) -> Result<Arc<MemberInfo>> {
        self.check_mutable(id)?;
        let info = Arc::new(MemberInfo::new(kind, visibility, id));
        self.set_method(id, name, Arc::clone(&info))?;
        Ok(info)
    }

    /// Installs an explicit undefinition. The name has to resolve first.
    pub(crate) fn undefine_method(&mut self, id: ModuleId, name: &str) -> Result<()> {
        self.check_mutable(id)?;
        self.initialize_methods(id)?;
        if !self.resolve_method(id, name, VisibilityContext::All)?.is_found() {
            return Err(RuntimeError::NotFound {
                name: Arc::from(name),
                module: self.describe(id),
            });
        }
        self.set_method(id, name, Arc::new(MemberInfo::undefined(id)))
    }

    pub(crate) fn hide_method(&mut self, id: ModuleId, name: &str) -> Result<()> {
        self.check_mutable(id)?;
        self.set_method(id, name, Arc::new(MemberInfo::hidden(id)))
    }

    /// Removes a declared method. Returns false when the table has no
    /// removable entry under `name`.
    pub(crate) fn remove_method(&mut self, id: ModuleId, name: &str) -> Result<bool> {
        self.check_mutable(id)?;
        self.initialize_own_methods(id)?;
        let removable = match self.get(id)?.methods.get(name) {
            Some(member) => !member.is_undefined() && !member.is_hidden(),
            None => false,
        };
        if !removable {
            return Ok(false);
        }
        let removed = self.get_mut(id)?.methods.entries_mut().shift_remove(name);
        if removed.is_some_and(|m| m.invalidates_sites_on_override()) {
            self.methods_updated(id, name);
        }
        self.touch(id);
        Ok(true)
    }

    pub(crate) fn alias_method(&mut self, id: ModuleId, new_name: &str, old_name: &str) -> Result<Arc<MemberInfo>> {
        self.check_mutable(id)?;
        self.initialize_methods(id)?;
        let target = self.require_method(id, old_name, VisibilityContext::All)?;
        let alias = Arc::new(target.copy_to(id, target.visibility()));
        self.set_method(id, new_name, Arc::clone(&alias))?;
        Ok(alias)
    }

    /// Changes the visibility of `name` as seen through `id`. An inherited
    /// method gets a super-forwarder entry instead of a copy.
    pub(crate) fn set_method_visibility(&mut self, id: ModuleId, name: &str, visibility: Visibility) -> Result<()> {
        self.check_mutable(id)?;
        self.initialize_methods(id)?;
        let local = self.get(id)?.methods.get(name).cloned();
        let replacement = match local {
            Some(member) if !member.is_undefined() && !member.is_hidden() => member.copy_to(id, visibility),
            _ => {
                let owner = match self.resolve_method(id, name, VisibilityContext::All)? {
                    MethodResolution::Found(member) => member.owner(),
                    _ => {
                        return Err(RuntimeError::NotFound {
                            name: Arc::from(name),
                            module: self.describe(id),
                        });
                    }
                };
                if owner == id {
                    // Native member of this module: pin it into the table.
                    let native = self.declared_member(id, name)?;
                    match native {
                        Some(member) => member.copy_to(id, visibility),
                        None => return Ok(()),
                    }
                } else {
                    MemberInfo::new(
                        MemberKind::SuperForwarder { super_name: Arc::from(name) },
                        visibility,
                        id,
                    )
                }
            }
        };
        self.set_method(id, name, Arc::new(replacement))
    }

    pub(crate) fn set_method(&mut self, id: ModuleId, name: &str, info: Arc<MemberInfo>) -> Result<()> {
        let was_initialized = !self.get(id)?.methods.needs_initialization();
        self.initialize_own_methods(id)?;
        self.prepare_method_update(id, name, was_initialized)?;
        self.get_mut(id)?.methods.entries_mut().insert(Arc::from(name), info);
        self.touch(id);
        tracing::trace!(module = %self.describe(id), name, "method set");
        Ok(())
    }

    /// Invalidates classes whose cached lookups of `name` a new definition in
    /// `id` may shadow. Runs before the table changes.
    fn prepare_method_update(&self, id: ModuleId, name: &str, was_initialized: bool) -> Result<()> {
        if self.get(id)?.is_class() {
            if was_initialized {
                self.prepare_class_method_update(id, name, 0)?;
            }
            return Ok(());
        }
        for class in self.direct_dependents(id) {
            self.prepare_class_method_update(class, name, 0)?;
        }
        Ok(())
    }

    /// `mixins_to_skip` is non-zero when the definition comes from the mixin
    /// at that position, so only ancestors below it can be overridden.
    pub(crate) fn prepare_class_method_update(&self, class: ModuleId, name: &str, mixins_to_skip: usize) -> Result<()> {
        if self.get(class)?.methods.needs_initialization() {
            return Ok(());
        }
        let modules_to_skip = if mixins_to_skip > 0 { mixins_to_skip + 1 } else { 0 };
        match self.resolve_overridden_method(class, name, modules_to_skip)? {
            None => {
                if self.is_missing_method(name) {
                    self.methods_updated(class, name);
                }
            }
            Some(overridden) => {
                if overridden.invalidates_sites_on_override() {
                    self.methods_updated(class, name);
                }
            }
        }
        Ok(())
    }

    /// First already-used definition of `name` among the ancestors of
    /// `class`, skipping the first `modules_to_skip`. Uninitialized tables
    /// and unloaded native members cannot have been cached, so they are not
    /// consulted.
    fn resolve_overridden_method(
        &self,
        class: ModuleId,
        name: &str,
        modules_to_skip: usize,
    ) -> Result<Option<Arc<MemberInfo>>> {
        for module in self.ancestors(class)?.into_iter().skip(modules_to_skip) {
            let data = self.get(module)?;
            if data.methods.needs_initialization() {
                continue;
            }
            let member = match data.methods.get(name) {
                Some(member) => Some(Arc::clone(member)),
                None => self
                    .native_slot(data)
                    .and_then(|(slot, is_static)| slot.loaded(name, is_static)),
            };
            match member {
                Some(m) if m.is_hidden() || m.is_super_forwarder() => continue,
                Some(m) if m.is_undefined() => return Ok(None),
                Some(m) => return Ok(Some(m)),
                None => continue,
            }
        }
        Ok(None)
    }
}
