//! Constant and class-variable tables.

use std::sync::Arc;

use super::ClassHierarchy;
use crate::errors::{Result, RuntimeError, messages};
use crate::ids::ModuleId;
use crate::util::{OrderedMap, is_constant_name};
use crate::value::Value;

impl ClassHierarchy {
    fn constant_table(&self, id: ModuleId) -> Result<&OrderedMap<Arc<str>, Value>> {
        if self.root_class == Some(id) {
            return Ok(&self.globals);
        }
        Ok(self.get(id)?.constants.entries())
    }

    fn constant_table_mut(&mut self, id: ModuleId) -> Result<&mut OrderedMap<Arc<str>, Value>> {
        self.initialize_own_constants(id)?;
        if self.root_class == Some(id) {
            return Ok(&mut self.globals);
        }
        Ok(self.get_mut(id)?.constants.entries_mut())
    }

    pub(crate) fn set_constant(&mut self, id: ModuleId, name: &str, value: Value) -> Result<()> {
        if !is_constant_name(name) {
            return Err(RuntimeError::name_error(messages::INVALID_CONSTANT_NAME, name));
        }
        self.check_mutable(id)?;
        self.constant_table_mut(id)?.insert(Arc::from(name), value);
        tracing::trace!(module = %self.describe(id), name, "constant set");
        Ok(())
    }

    /// Constant declared by `id` itself. The constant table of `id` must be
    /// initialized.
    pub(crate) fn get_constant(&self, id: ModuleId, name: &str) -> Result<Option<Value>> {
        Ok(self.constant_table(id)?.get(name).cloned())
    }

    /// Looks `name` up through the ancestors of `id`, then the global
    /// namespace.
    pub(crate) fn resolve_constant(&self, id: ModuleId, name: &str) -> Result<Value> {
        for module in self.ancestors(id)? {
            if let Some(value) = self.constant_table(module)?.get(name) {
                return Ok(value.clone());
            }
        }
        self.globals
            .get(name)
            .cloned()
            .ok_or_else(|| RuntimeError::ConstantNotFound(name.to_string()))
    }

    pub(crate) fn remove_constant(&mut self, id: ModuleId, name: &str) -> Result<Value> {
        self.check_mutable(id)?;
        let removed = self.constant_table_mut(id)?.shift_remove(name);
        removed.ok_or_else(|| RuntimeError::ConstantNotFound(format!("{}::{name}", self.describe(id))))
    }

    pub(crate) fn constant_names(&self, id: ModuleId) -> Result<Vec<Arc<str>>> {
        Ok(self.constant_table(id)?.keys().cloned().collect())
    }

    /// Assigns a class variable. An ancestor that already holds `name` is
    /// updated in place; otherwise the variable is created on `id`.
    pub(crate) fn set_class_variable(&mut self, id: ModuleId, name: &str, value: Value) -> Result<()> {
        if name.is_empty() {
            return Err(RuntimeError::name_error(messages::EMPTY_NAME, name));
        }
        let owner = self.class_variable_owner(id, name)?.unwrap_or(id);
        self.check_mutable(owner)?;
        self.get_mut(owner)?.class_variables.insert(Arc::from(name), value);
        Ok(())
    }

    pub(crate) fn resolve_class_variable(&self, id: ModuleId, name: &str) -> Result<Value> {
        match self.class_variable_owner(id, name)? {
            Some(owner) => Ok(self.get(owner)?.class_variables.get(name).cloned().unwrap_or_default()),
            None => Err(RuntimeError::ClassVariableNotFound {
                name: Arc::from(name),
                module: self.describe(id),
            }),
        }
    }

    pub(crate) fn class_variable_names(&self, id: ModuleId) -> Result<Vec<Arc<str>>> {
        Ok(self.get(id)?.class_variables.keys().cloned().collect())
    }

    fn class_variable_owner(&self, id: ModuleId, name: &str) -> Result<Option<ModuleId>> {
        for module in self.ancestors(id)? {
            if self.get(module)?.class_variables.contains_key(name) {
                return Ok(Some(module));
            }
        }
        Ok(None)
    }
}
