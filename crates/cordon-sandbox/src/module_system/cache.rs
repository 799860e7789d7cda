// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Factory and module memoization tables.
//!
//! The two caches are deliberately distinct: the factory cache belongs to a
//! loader and holds compiled code, the module cache belongs to a sandbox
//! and holds exports values. Clearing one never touches the other.

use cordon_engine::Value;
use dashmap::DashMap;

use crate::evaluator::Factory;
use crate::module_system::id::ModuleId;

/// Memoized module factories, keyed by canonical id.
///
/// Owned by exactly one loader instance. Every sandbox sharing that loader
/// shares this cache, unsynchronized beyond individual operations.
#[derive(Default)]
pub struct FactoryCache {
    factories: DashMap<ModuleId, Factory>,
}

impl FactoryCache {
    /// Creates a new empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Gets the memoized factory for a canonical id.
    pub fn get(&self, id: &ModuleId) -> Option<Factory> {
        self.factories.get(id).map(|entry| entry.clone())
    }

    /// Checks if a factory is memoized.
    pub fn has(&self, id: &ModuleId) -> bool {
        self.factories.contains_key(id)
    }

    /// Stores a factory for a canonical id.
    pub fn set(&self, id: ModuleId, factory: Factory) {
        self.factories.insert(id, factory);
    }

    /// Removes a factory from the cache.
    pub fn delete(&self, id: &ModuleId) -> Option<Factory> {
        self.factories.remove(id).map(|(_, factory)| factory)
    }

    /// Purges the entire cache.
    pub fn clear(&self) {
        self.factories.clear();
    }

    /// All memoized canonical ids.
    pub fn keys(&self) -> Vec<ModuleId> {
        self.factories.iter().map(|entry| entry.key().clone()).collect()
    }

    /// Number of memoized factories.
    pub fn len(&self) -> usize {
        self.factories.len()
    }

    /// Whether the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }
}

/// Memoized module exports, keyed by canonical id.
///
/// Owned by exactly one sandbox. An entry is inserted *before* its factory
/// runs, so cyclic requires observe the same partially-populated exports
/// object instead of recursing.
#[derive(Default)]
pub struct ModuleCache {
    modules: DashMap<ModuleId, Value>,
}

impl ModuleCache {
    /// Creates a new empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Gets the exports for a canonical id.
    pub fn get(&self, id: &ModuleId) -> Option<Value> {
        self.modules.get(id).map(|entry| entry.clone())
    }

    /// Checks if a module's exports are cached.
    pub fn has(&self, id: &ModuleId) -> bool {
        self.modules.contains_key(id)
    }

    /// Stores exports for a canonical id.
    pub fn set(&self, id: ModuleId, exports: Value) {
        self.modules.insert(id, exports);
    }

    /// Removes a module from the cache, returning its exports.
    pub fn delete(&self, id: &ModuleId) -> Option<Value> {
        self.modules.remove(id).map(|(_, exports)| exports)
    }

    /// Purges the entire cache.
    pub fn clear(&self) {
        self.modules.clear();
    }

    /// All cached canonical ids.
    pub fn keys(&self) -> Vec<ModuleId> {
        self.modules.iter().map(|entry| entry.key().clone()).collect()
    }

    /// Number of cached modules.
    pub fn len(&self) -> usize {
        self.modules.len()
    }

    /// Whether the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }
}
