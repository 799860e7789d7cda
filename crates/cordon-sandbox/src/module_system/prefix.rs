// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Namespace-prefixing loader.

use std::sync::Arc;

use crate::error::Result;
use crate::evaluator::Factory;
use crate::module_system::cache::FactoryCache;
use crate::module_system::id::ModuleId;
use crate::module_system::loader::Loader;

/// Wraps a delegate loader, transparently namespacing every canonical id
/// under a fixed prefix.
///
/// A nested sandbox handed a `PrefixLoader` sees the subtree under the
/// prefix as its whole module universe, with no awareness of the prefix
/// itself. The prefix is concatenated textually, so it normally ends with
/// `/`.
pub struct PrefixLoader {
    prefix: String,
    inner: Arc<dyn Loader>,
}

impl PrefixLoader {
    /// Wraps `inner`, rewriting every canonical id as `prefix + id`.
    pub fn new(prefix: impl Into<String>, inner: Arc<dyn Loader>) -> Self {
        Self {
            prefix: prefix.into(),
            inner,
        }
    }

    /// The configured prefix.
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    fn prefixed(&self, id: &ModuleId) -> ModuleId {
        ModuleId::new(format!("{}{}", self.prefix, id))
    }
}

impl Loader for PrefixLoader {
    fn name(&self) -> &'static str {
        "PrefixLoader"
    }

    fn factories(&self) -> &FactoryCache {
        self.inner.factories()
    }

    fn resolve(&self, id: &str, base: Option<&ModuleId>) -> Result<ModuleId> {
        self.inner.resolve(id, base)
    }

    fn fetch(&self, id: &ModuleId) -> Result<String> {
        self.inner.fetch(&self.prefixed(id))
    }

    fn evaluate(&self, text: &str, id: &ModuleId) -> Result<Factory> {
        self.inner.evaluate(text, &self.prefixed(id))
    }

    fn load(&self, id: &ModuleId) -> Result<Factory> {
        self.inner.load(&self.prefixed(id))
    }

    fn reload(&self, id: &ModuleId) -> Result<()> {
        self.inner.reload(&self.prefixed(id))
    }

    fn clear(&self) {
        self.inner.clear();
    }
}
