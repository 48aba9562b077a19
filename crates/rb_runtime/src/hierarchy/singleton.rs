//! Singleton classes, duplication and retirement of modules.

use std::sync::Arc;

use super::ClassHierarchy;
use crate::errors::{Result, RuntimeError};
use crate::ids::ModuleId;
use crate::module::{Attached, LazyTable, ModuleData};
use crate::object::RubyObject;
use crate::util::ordered_map_new;

impl ClassHierarchy {
    /// Singleton class of a module or class, created on first request.
    ///
    /// The singleton of a class with superclass `S` inherits from the
    /// singleton of `S`; singletons of the root class and of plain modules
    /// inherit from the root class.
    pub(crate) fn singleton_class_of(&mut self, id: ModuleId) -> Result<ModuleId> {
        let data = self.get(id)?;
        if let Some(existing) = data.singleton {
            return Ok(existing);
        }
        let superclass = match data.superclass() {
            Some(s) => self.singleton_class_of(s)?,
            None => self
                .root_class
                .ok_or_else(|| RuntimeError::NoSuperclass(self.describe(id)))?,
        };
        let singleton = self.create_class(None, Some(superclass), Some(Attached::Module(id)), None)?;
        self.get_mut(id)?.singleton = Some(singleton);
        tracing::trace!(module = %self.describe(id), "singleton class created");
        Ok(singleton)
    }

    pub(crate) fn singleton_class_for_object(&mut self, object: &RubyObject) -> Result<ModuleId> {
        let mut slot = object.singleton_slot().lock();
        if let Some(existing) = *slot {
            return Ok(existing);
        }
        let singleton = self.create_class(None, Some(object.class()), Some(Attached::Object), None)?;
        *slot = Some(singleton);
        Ok(singleton)
    }

    pub(crate) fn attached_of(&self, id: ModuleId) -> Result<Option<Attached>> {
        Ok(self.get(id)?.class().and_then(|c| c.attached))
    }

    /// Copies a module or class into a new anonymous one with independent
    /// tables.
    pub(crate) fn duplicate(&mut self, id: ModuleId) -> Result<ModuleId> {
        let data = self.get(id)?;
        if data.is_singleton() {
            return Err(RuntimeError::SingletonDup);
        }
        if self.root_class == Some(id) {
            return Err(RuntimeError::RootClassDup);
        }
        self.initialize_own_methods(id)?;
        self.initialize_own_constants(id)?;

        let data = self.get(id)?;
        let is_class = data.is_class();
        let superclass = data.superclass();
        let layout = data.class().and_then(|c| c.struct_layout.clone());
        let mixins = data.mixins.clone();
        let constants = data.constants.entries().clone();
        let class_variables = data.class_variables.clone();
        let methods: Vec<_> = data
            .methods
            .entries()
            .iter()
            .map(|(name, member)| (Arc::clone(name), member.visibility(), Arc::clone(member)))
            .collect();

        let copy = if is_class {
            self.create_class(None, superclass, None, layout)?
        } else {
            self.define_module(None)?
        };
        let mut method_table = ordered_map_new();
        for (name, visibility, member) in methods {
            method_table.insert(name, Arc::new(member.copy_to(copy, visibility)));
        }
        let target: &mut ModuleData = self.get_mut(copy)?;
        target.methods = LazyTable::initialized(method_table);
        target.constants = LazyTable::initialized(constants);
        target.class_variables = class_variables;
        target.mixins = mixins.clone();
        if is_class {
            for mixin in mixins {
                self.add_dependent(mixin, copy);
            }
        }
        tracing::trace!(from = %self.describe(id), "module duplicated");
        Ok(copy)
    }

    /// Removes a module that no other live module refers to. Its id stops
    /// resolving; objects still allocated from it fail with `InvalidModule`.
    pub(crate) fn retire_module(&mut self, id: ModuleId) -> Result<()> {
        self.get(id)?;
        if self.root_class == Some(id) {
            return Err(RuntimeError::ModuleInUse(self.describe(id)));
        }
        self.prune_dependents();
        let singleton = self.get(id)?.singleton;
        let referenced = !self.direct_dependents(id).is_empty()
            || self.live_modules().any(|m| {
                m.id != id
                    && Some(m.id) != singleton
                    && (m.mixins.contains(&id) || m.superclass() == Some(id))
            });
        if referenced {
            return Err(RuntimeError::ModuleInUse(self.describe(id)));
        }
        if let Some(s) = singleton {
            if !self.direct_dependents(s).is_empty() {
                return Err(RuntimeError::ModuleInUse(self.describe(id)));
            }
            self.detach(s)?;
        }
        self.detach(id)?;
        tracing::debug!(id = ?id, "module retired");
        Ok(())
    }

    fn detach(&mut self, id: ModuleId) -> Result<()> {
        let data = self.remove(id)?;
        if let Some(s) = data.superclass() {
            self.remove_dependent(s, id);
        }
        for mixin in &data.mixins {
            self.remove_dependent(*mixin, id);
        }
        self.dependents.remove(&id);
        Ok(())
    }
}
