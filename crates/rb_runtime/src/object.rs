//! Instances and fixed-shape struct layouts.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::errors::{Result, RuntimeError, messages};
use crate::ids::ModuleId;
use crate::util::{OrderedMap, ordered_map_new};
use crate::value::Value;

pub type ObjectRef = Arc<RubyObject>;

/// Ordered member names of a struct class.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructLayout {
    members: Box<[Arc<str>]>,
}

impl StructLayout {
    pub fn new<S: AsRef<str>>(members: &[S]) -> Result<Self> {
        let mut names: Vec<Arc<str>> = Vec::with_capacity(members.len());
        for member in members {
            let member = member.as_ref();
            if member.is_empty() {
                return Err(RuntimeError::name_error(messages::EMPTY_NAME, member));
            }
            if names.iter().any(|n| &**n == member) {
                return Err(RuntimeError::name_error(messages::DUPLICATE_STRUCT_MEMBER, member));
            }
            names.push(Arc::from(member));
        }
        Ok(Self { members: names.into_boxed_slice() })
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.members.iter().position(|n| &**n == name)
    }

    pub fn members(&self) -> &[Arc<str>] {
        &self.members
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

/// A heap object: its class, an optional singleton class, instance
/// variables and, for struct classes, one slot per layout member.
pub struct RubyObject {
    class: ModuleId,
    singleton: Mutex<Option<ModuleId>>,
    instance_variables: Mutex<OrderedMap<Arc<str>, Value>>,
    layout: Option<Arc<StructLayout>>,
    struct_values: Mutex<Vec<Value>>,
}

impl RubyObject {
    pub(crate) fn new(class: ModuleId, layout: Option<Arc<StructLayout>>) -> Self {
        let slots = layout.as_ref().map_or(0, |l| l.len());
        Self {
            class,
            singleton: Mutex::new(None),
            instance_variables: Mutex::new(ordered_map_new()),
            layout,
            struct_values: Mutex::new(vec![Value::Nil; slots]),
        }
    }

    /// The class the object was allocated from.
    pub fn class(&self) -> ModuleId {
        self.class
    }

    /// Class used for method dispatch: the singleton class once it exists.
    pub fn dispatch_class(&self) -> ModuleId {
        let singleton = *self.singleton.lock();
        singleton.unwrap_or(self.class)
    }

    pub fn singleton_class(&self) -> Option<ModuleId> {
        *self.singleton.lock()
    }

    pub(crate) fn singleton_slot(&self) -> &Mutex<Option<ModuleId>> {
        &self.singleton
    }

    pub fn instance_variable(&self, name: &str) -> Option<Value> {
        self.instance_variables.lock().get(name).cloned()
    }

    pub fn set_instance_variable(&self, name: &str, value: Value) {
        self.instance_variables.lock().insert(Arc::from(name), value);
    }

    pub fn instance_variable_names(&self) -> Vec<Arc<str>> {
        self.instance_variables.lock().keys().cloned().collect()
    }

    pub fn layout(&self) -> Option<&Arc<StructLayout>> {
        self.layout.as_ref()
    }

    pub fn struct_get(&self, index: usize) -> Result<Value> {
        let values = self.struct_values.lock();
        match values.get(index) {
            Some(v) => Ok(v.clone()),
            None => Err(self.struct_index_error(index, values.len())),
        }
    }

    pub fn struct_set(&self, index: usize, value: Value) -> Result<()> {
        let mut values = self.struct_values.lock();
        let len = values.len();
        match values.get_mut(index) {
            Some(slot) => {
                *slot = value;
                Ok(())
            }
            None => Err(self.struct_index_error(index, len)),
        }
    }

    pub fn struct_get_by_name(&self, name: &str) -> Result<Value> {
        let index = self.member_index(name)?;
        self.struct_get(index)
    }

    pub fn struct_set_by_name(&self, name: &str, value: Value) -> Result<()> {
        let index = self.member_index(name)?;
        self.struct_set(index, value)
    }

    fn member_index(&self, name: &str) -> Result<usize> {
        let layout = self
            .layout
            .as_ref()
            .ok_or_else(|| RuntimeError::NameError(messages::NOT_A_STRUCT.to_string()))?;
        layout
            .index_of(name)
            .ok_or_else(|| RuntimeError::NameError(format!("no member '{name}' in struct")))
    }

    fn struct_index_error(&self, index: usize, len: usize) -> RuntimeError {
        if self.layout.is_none() {
            return RuntimeError::NameError(messages::NOT_A_STRUCT.to_string());
        }
        RuntimeError::NameError(format!("offset {index} too large for struct(size:{len})"))
    }
}
