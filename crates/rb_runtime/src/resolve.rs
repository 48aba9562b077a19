//! Method resolution over the ancestor list.

use std::sync::Arc;

use crate::errors::{Result, RuntimeError};
use crate::hierarchy::ClassHierarchy;
use crate::ids::ModuleId;
use crate::member::{MemberInfo, MemberKind, Visibility};
use crate::module::{Attached, ModuleData};
use crate::native::NativeSlot;
use crate::util::{OrderedSet, ordered_set_new};

/// How the call that triggers a lookup names its receiver.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum VisibilityContext {
    /// Reflection: every member is visible.
    #[default]
    All,
    /// Call without an explicit receiver; private members are visible.
    ImplicitSelf,
    /// Call with an explicit receiver made from code whose `self` is an
    /// instance of `caller`.
    Explicit { caller: Option<ModuleId> },
}

#[derive(Clone, Debug)]
pub enum MethodResolution {
    Found(Arc<MemberInfo>),
    /// A member exists but the visibility context forbids calling it.
    Inaccessible(Arc<MemberInfo>),
    /// The walk hit an explicit undefinition in `owner`.
    Undefined { owner: ModuleId },
    NotFound,
}

impl MethodResolution {
    pub fn is_found(&self) -> bool {
        matches!(self, MethodResolution::Found(_))
    }

    /// Undefined entries count as not found.
    pub fn is_not_found(&self) -> bool {
        matches!(self, MethodResolution::NotFound | MethodResolution::Undefined { .. })
    }

    pub fn member(&self) -> Option<&Arc<MemberInfo>> {
        match self {
            MethodResolution::Found(m) => Some(m),
            _ => None,
        }
    }

    pub fn into_member(self) -> Option<Arc<MemberInfo>> {
        match self {
            MethodResolution::Found(m) => Some(m),
            _ => None,
        }
    }
}

impl ClassHierarchy {
    /// Resolves `name` on `id`. Method tables of all ancestors must be
    /// initialized.
    pub(crate) fn resolve_method(&self, id: ModuleId, name: &str, context: VisibilityContext) -> Result<MethodResolution> {
        let ancestors = self.ancestors(id)?;
        self.resolve_from(&ancestors, 0, name, context)
    }

    /// Like [`resolve_method`](Self::resolve_method), but the result is about
    /// to be cached by a call site: a found member is flagged so overriding
    /// it invalidates, and a miss is remembered so defining the name later
    /// does too.
    pub(crate) fn resolve_method_for_site(
        &self,
        id: ModuleId,
        name: &str,
        context: VisibilityContext,
    ) -> Result<MethodResolution> {
        let resolution = self.resolve_method(id, name, context)?;
        match &resolution {
            MethodResolution::Found(member) | MethodResolution::Inaccessible(member) => member.mark_site_cached(),
            MethodResolution::Undefined { .. } | MethodResolution::NotFound => self.record_missing_method(name),
        }
        Ok(resolution)
    }

    pub(crate) fn require_method(&self, id: ModuleId, name: &str, context: VisibilityContext) -> Result<Arc<MemberInfo>> {
        match self.resolve_method(id, name, context)? {
            MethodResolution::Found(member) => Ok(member),
            MethodResolution::Inaccessible(member) => Err(RuntimeError::Inaccessible {
                name: Arc::from(name),
                visibility: member.visibility(),
                module: self.describe(id),
            }),
            MethodResolution::Undefined { .. } => Err(RuntimeError::UndefinedMethodCall {
                name: Arc::from(name),
                module: self.describe(id),
            }),
            MethodResolution::NotFound => Err(RuntimeError::NotFound {
                name: Arc::from(name),
                module: self.describe(id),
            }),
        }
    }

    /// Resolves `name` starting after `current_owner` in the ancestors of
    /// `id`, as a `super` call from a method owned by `current_owner` does.
    pub(crate) fn resolve_super_method(
        &self,
        id: ModuleId,
        name: &str,
        current_owner: ModuleId,
    ) -> Result<MethodResolution> {
        let ancestors = self.ancestors(id)?;
        match ancestors.iter().position(|a| *a == current_owner) {
            Some(pos) => self.resolve_from(&ancestors, pos + 1, name, VisibilityContext::All),
            None => Ok(MethodResolution::NotFound),
        }
    }

    pub(crate) fn find_method_owner(&self, id: ModuleId, name: &str) -> Result<Option<ModuleId>> {
        Ok(self
            .resolve_method(id, name, VisibilityContext::All)?
            .member()
            .map(|m| m.owner()))
    }

    fn resolve_from(
        &self,
        ancestors: &[ModuleId],
        start: usize,
        name: &str,
        context: VisibilityContext,
    ) -> Result<MethodResolution> {
        for (i, &owner) in ancestors.iter().enumerate().skip(start) {
            let Some(member) = self.declared_member(owner, name)? else {
                continue;
            };
            match member.kind() {
                MemberKind::Hidden => continue,
                MemberKind::Undefined => return Ok(MethodResolution::Undefined { owner }),
                MemberKind::SuperForwarder { super_name } => {
                    if !self.is_visible(&member, context)? {
                        return Ok(MethodResolution::Inaccessible(Arc::clone(&member)));
                    }
                    let super_name = Arc::clone(super_name);
                    return self.resolve_from(ancestors, i + 1, &super_name, VisibilityContext::All);
                }
                MemberKind::Method(_) => {
                    return Ok(if self.is_visible(&member, context)? {
                        MethodResolution::Found(Arc::clone(&member))
                    } else {
                        MethodResolution::Inaccessible(Arc::clone(&member))
                    });
                }
            }
        }
        Ok(MethodResolution::NotFound)
    }

    fn is_visible(&self, member: &MemberInfo, context: VisibilityContext) -> Result<bool> {
        Ok(match (member.visibility(), context) {
            (Visibility::Public, _) => true,
            (_, VisibilityContext::All | VisibilityContext::ImplicitSelf) => true,
            (Visibility::Private, VisibilityContext::Explicit { .. }) => false,
            (Visibility::Protected, VisibilityContext::Explicit { caller: Some(caller) }) => {
                self.has_ancestor(caller, member.owner())?
            }
            (Visibility::Protected, VisibilityContext::Explicit { caller: None }) => false,
        })
    }

    /// Entry for `name` in the method table of `owner`, falling back to its
    /// native provider.
    pub(crate) fn declared_member(&self, owner: ModuleId, name: &str) -> Result<Option<Arc<MemberInfo>>> {
        let data = self.get(owner)?;
        if let Some(member) = data.methods.get(name) {
            return Ok(Some(Arc::clone(member)));
        }
        Ok(self.native_member(data, name))
    }

    fn native_member(&self, data: &ModuleData, name: &str) -> Option<Arc<MemberInfo>> {
        let (slot, is_static) = self.native_slot(data)?;
        if let Some(member) = slot.loaded(name, is_static) {
            return Some(member);
        }
        let provider = slot.provider();
        let version = provider.extension_version();
        if self.failures().is_cached_failure(provider.key(), name, is_static, version) {
            return None;
        }
        let member = slot.load(data.id, name, is_static);
        if member.is_none() {
            self.failures().record_failure(provider.key(), name, is_static, version);
        }
        member
    }

    /// Provider consulted for `data`: its own, or the one of the module a
    /// singleton class is attached to (static lookups).
    pub(crate) fn native_slot<'a>(&'a self, data: &'a ModuleData) -> Option<(&'a NativeSlot, bool)> {
        if let Some(slot) = &data.native {
            return Some((slot, false));
        }
        match data.class().and_then(|c| c.attached) {
            Some(Attached::Module(attached)) => {
                let slot = self.get(attached).ok()?.native.as_ref()?;
                Some((slot, true))
            }
            _ => None,
        }
    }

    /// Declared method names, optionally followed by inherited ones in
    /// resolution order. Undefined names shadow inherited definitions.
    pub(crate) fn method_names(&self, id: ModuleId, inherited: bool) -> Result<Vec<Arc<str>>> {
        let modules = if inherited {
            self.ancestors(id)?
        } else {
            std::iter::once(id).collect()
        };
        let mut seen: OrderedSet<Arc<str>> = ordered_set_new();
        let mut out = Vec::new();
        for module in modules {
            for (name, member) in self.get(module)?.methods.entries() {
                if member.is_hidden() || !seen.insert(Arc::clone(name)) {
                    continue;
                }
                if !member.is_undefined() {
                    out.push(Arc::clone(name));
                }
            }
        }
        Ok(out)
    }
}
