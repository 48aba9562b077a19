//! Mixin inclusion and linearization.

use super::ClassHierarchy;
use crate::errors::{Result, RuntimeError};
use crate::ids::ModuleId;

impl ClassHierarchy {
    /// Includes `modules` into `target`. The first module in the list ends
    /// up first in resolution order; modules already present keep their
    /// position.
    pub(crate) fn include_modules(&mut self, target: ModuleId, modules: &[ModuleId]) -> Result<()> {
        self.check_mutable(target)?;
        for &module in modules {
            let data = self.get(module)?;
            if data.is_class() {
                return Err(RuntimeError::NotAModule(data.describe()));
            }
            if module == target || data.mixins.contains(&target) {
                return Err(RuntimeError::CyclicInclude);
            }
        }

        let target_data = self.get(target)?;
        let superclass = target_data.superclass();
        let is_class = target_data.is_class();
        let old = target_data.mixins.clone();
        let mut expanded = old.clone();
        self.expand_mixins(superclass, &mut expanded, 0, modules, true)?;

        tracing::debug!(
            module = %self.describe(target),
            added = expanded.len() - old.len(),
            total = expanded.len(),
            "mixins expanded"
        );
        self.get_mut(target)?.mixins = expanded.clone();
        if is_class {
            self.class_mixins_updated(target, &old, &expanded)?;
        }
        Ok(())
    }

    /// Inserts `added` into `existing` at `index`, dependencies of a module
    /// right after it. A module already present moves the cursor past itself
    /// (and, on the top level, past its own mixins). A module that the
    /// superclass already has as an ancestor is not inserted again.
    /// Returns the final cursor.
    fn expand_mixins(
        &self,
        superclass: Option<ModuleId>,
        existing: &mut Vec<ModuleId>,
        mut index: usize,
        added: &[ModuleId],
        top_level: bool,
    ) -> Result<usize> {
        for &module in added {
            let nested = &self.get(module)?.mixins;
            match existing.iter().position(|m| *m == module) {
                Some(pos) => {
                    index = pos + 1;
                    if top_level {
                        index = self.expand_mixins(superclass, existing, index, nested, false)?;
                    }
                }
                None => {
                    let after_nested = self.expand_mixins(superclass, existing, index, nested, false)?;
                    let redundant = match superclass {
                        Some(s) => self.has_ancestor(s, module)?,
                        None => false,
                    };
                    if redundant {
                        index = after_nested;
                    } else {
                        existing.insert(index, module);
                        index = after_nested + 1;
                    }
                }
            }
        }
        Ok(index)
    }

    /// Registers `class` on its new mixins and invalidates lookups that a
    /// newly inserted mixin now shadows.
    fn class_mixins_updated(&mut self, class: ModuleId, old: &[ModuleId], new: &[ModuleId]) -> Result<()> {
        let mut j = old.len();
        for i in (0..new.len()).rev() {
            let mixin = new[i];
            if j > 0 && old[j - 1] == mixin {
                j -= 1;
                continue;
            }
            self.add_dependent(mixin, class);

            let class_data = self.get(class)?;
            let class_methods_used = !class_data.methods.needs_initialization();
            let class_constants_used = !class_data.constants.needs_initialization();
            if class_methods_used {
                self.initialize_own_methods(mixin)?;
            }
            if class_constants_used {
                self.initialize_own_constants(mixin)?;
            }

            let mixin_data = self.get(mixin)?;
            if mixin_data.methods.needs_initialization() {
                continue;
            }
            let names: Vec<_> = mixin_data.methods.entries().keys().cloned().collect();
            for name in names {
                self.prepare_class_method_update(class, &name, i + 1)?;
            }
        }
        Ok(())
    }
}
