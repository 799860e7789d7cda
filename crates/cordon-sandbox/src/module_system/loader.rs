// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! The loader capability contract.

use crate::error::{Result, SandboxError};
use crate::evaluator::{Factory, SecureEvaluator};
use crate::module_system::cache::FactoryCache;
use crate::module_system::id::ModuleId;

/// The loader capability set: resolve, fetch, evaluate, load, reload, clear.
///
/// `load`, `reload` and `clear` come with generic memoizing implementations
/// over [`Loader::factories`]; `resolve` and `fetch` fail with
/// [`SandboxError::NotImplemented`] unless overridden. Loaders compose by
/// decoration — a wrapper holds a delegate and forwards the operations it
/// does not intercept — never by implicit shared state.
///
/// A loader only ever mutates its factory cache; module (exports) caching
/// belongs to the sandbox.
pub trait Loader: Send + Sync {
    /// Short name used in diagnostics.
    fn name(&self) -> &'static str {
        "AbstractLoader"
    }

    /// The factory memo backing `load`, `reload` and `clear`.
    fn factories(&self) -> &FactoryCache;

    /// The ambient secure evaluator, if the embedding configured one.
    fn evaluator(&self) -> Option<&SecureEvaluator> {
        None
    }

    /// Computes a canonical id for `id`, optionally relative to `base`.
    fn resolve(&self, id: &str, base: Option<&ModuleId>) -> Result<ModuleId> {
        let _ = (id, base);
        Err(SandboxError::NotImplemented {
            operation: "resolve",
            loader: self.name(),
        })
    }

    /// Obtains raw module source for a canonical id.
    fn fetch(&self, id: &ModuleId) -> Result<String> {
        let _ = id;
        Err(SandboxError::NotImplemented {
            operation: "fetch",
            loader: self.name(),
        })
    }

    /// Compiles module source into a callable factory.
    ///
    /// Delegates to the ambient secure evaluator. A host that configures no
    /// evaluator cannot compile at all — that is a configuration error, not
    /// a silent downgrade.
    fn evaluate(&self, text: &str, id: &ModuleId) -> Result<Factory> {
        match self.evaluator() {
            Some(evaluator) => evaluator.evaluate(text, id),
            None => Err(SandboxError::Configuration(format!(
                "no evaluator is configured for {}",
                self.name()
            ))),
        }
    }

    /// Returns the memoized factory for `id`, reloading it first if absent.
    fn load(&self, id: &ModuleId) -> Result<Factory> {
        load_memoized(self, id)
    }

    /// Unconditionally fetches, evaluates and (re)stores the factory for `id`.
    fn reload(&self, id: &ModuleId) -> Result<()> {
        reload_memoized(self, id)
    }

    /// Purges the factory memo.
    fn clear(&self) {
        self.factories().clear();
    }
}

/// The generic memoizing `load`: reload on a cache miss, then hand out the
/// cached factory. Overriding loaders call this after their own checks.
pub(crate) fn load_memoized<L: Loader + ?Sized>(loader: &L, id: &ModuleId) -> Result<Factory> {
    if !loader.factories().has(id) {
        loader.reload(id)?;
    }
    loader
        .factories()
        .get(id)
        .ok_or_else(|| SandboxError::NotFound { id: id.to_string() })
}

/// The generic `reload`: fetch, evaluate, store.
pub(crate) fn reload_memoized<L: Loader + ?Sized>(loader: &L, id: &ModuleId) -> Result<()> {
    let text = loader.fetch(id)?;
    let factory = loader.evaluate(&text, id)?;
    loader.factories().set(id.clone(), factory);
    Ok(())
}
