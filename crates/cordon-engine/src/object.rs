//! Shared object representation with seal and freeze semantics.

use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use std::sync::Arc;

use crate::error::{EngineError, Result};
use crate::value::Value;

/// An object's interior: a property table plus mutability flags.
///
/// An `Object` owned by value is unshared and may be populated freely with
/// [`Object::insert`]; once wrapped in an [`ObjectRef`] all mutation goes
/// through the checked handle methods.
#[derive(Debug)]
pub struct Object {
    /// The properties
    properties: FxHashMap<String, Value>,
    /// Whether new properties may be added
    extensible: bool,
    /// Whether existing properties may be written or deleted
    frozen: bool,
}

impl Object {
    /// Creates a new empty, extensible object.
    pub fn new() -> Self {
        Self {
            properties: FxHashMap::default(),
            extensible: true,
            frozen: false,
        }
    }

    /// Construction-time property insertion, before the object is shared.
    pub fn insert(&mut self, key: impl Into<String>, value: Value) {
        self.properties.insert(key.into(), value);
    }
}

impl Default for Object {
    fn default() -> Self {
        Self::new()
    }
}

/// A shared handle to an [`Object`].
///
/// Clones are cheap and observe the same underlying state; equality between
/// handles is identity, not structure.
#[derive(Debug, Clone)]
pub struct ObjectRef(Arc<RwLock<Object>>);

impl ObjectRef {
    /// Creates a handle to a fresh empty object.
    pub fn new() -> Self {
        Self(Arc::new(RwLock::new(Object::new())))
    }

    /// Gets a property value.
    pub fn get(&self, key: &str) -> Option<Value> {
        self.0.read().properties.get(key).cloned()
    }

    /// Sets a property value.
    ///
    /// Fails on a frozen object, or when adding a new property to a
    /// non-extensible one.
    pub fn set(&self, key: impl Into<String>, value: Value) -> Result<()> {
        let key = key.into();
        let mut object = self.0.write();
        if object.frozen {
            return Err(EngineError::FrozenWrite { key });
        }
        if !object.extensible && !object.properties.contains_key(&key) {
            return Err(EngineError::NotExtensible { key });
        }
        object.properties.insert(key, value);
        Ok(())
    }

    /// Deletes a property, returning whether it existed.
    pub fn delete(&self, key: &str) -> Result<bool> {
        let mut object = self.0.write();
        if object.frozen {
            return Err(EngineError::FrozenDelete { key: key.to_string() });
        }
        Ok(object.properties.remove(key).is_some())
    }

    /// Checks if a property exists.
    pub fn has(&self, key: &str) -> bool {
        self.0.read().properties.contains_key(key)
    }

    /// All property names, in table order.
    pub fn keys(&self) -> Vec<String> {
        self.0.read().properties.keys().cloned().collect()
    }

    /// Snapshot of all property values.
    pub fn values(&self) -> Vec<Value> {
        self.0.read().properties.values().cloned().collect()
    }

    /// Number of properties.
    pub fn len(&self) -> usize {
        self.0.read().properties.len()
    }

    /// Whether the object has no properties.
    pub fn is_empty(&self) -> bool {
        self.0.read().properties.is_empty()
    }

    /// Prevents addition of new properties.
    pub fn seal(&self) {
        self.0.write().extensible = false;
    }

    /// Marks the object immutable: no writes, no additions, no deletions.
    pub fn freeze(&self) {
        let mut object = self.0.write();
        object.extensible = false;
        object.frozen = true;
    }

    /// Whether the object is frozen.
    pub fn is_frozen(&self) -> bool {
        self.0.read().frozen
    }

    /// Whether new properties may be added.
    pub fn is_extensible(&self) -> bool {
        self.0.read().extensible
    }

    /// Identity comparison between handles.
    pub fn ptr_eq(&self, other: &ObjectRef) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    /// Stable address of the shared interior, for cycle detection.
    pub fn address(&self) -> usize {
        Arc::as_ptr(&self.0) as usize
    }
}

impl Default for ObjectRef {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Object> for ObjectRef {
    fn from(object: Object) -> Self {
        Self(Arc::new(RwLock::new(object)))
    }
}
