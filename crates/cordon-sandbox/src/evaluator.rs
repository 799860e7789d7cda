// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Secure evaluation: the seam where host-engine trust is established.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use cordon_engine::{EngineError, Value};
use dashmap::DashMap;

use crate::error::Result;
use crate::module_system::ModuleId;
use crate::sandbox::Require;

/// A compiled module factory.
///
/// Invoked with a frozen `this` binding, the per-module require closure,
/// the module's exports object, and the shared frozen environment.
pub type Factory = Arc<dyn Fn(Value, &Require, Value, &Value) -> Result<()> + Send + Sync>;

/// Parameter names every module factory is compiled with.
pub const FACTORY_PARAMS: [&str; 3] = ["require", "exports", "environment"];

/// The host script-engine capability surface consumed by the secure
/// evaluator.
///
/// An engine that supports isolation compiles inside a sealed scope: no
/// path from compiled code to arbitrary host namespaces or reflective
/// escape. An engine that does not must say so — the evaluator surfaces the
/// downgrade instead of hiding it.
pub trait ScriptEngine: Send + Sync {
    /// Whether this engine compiles inside a sealed scope.
    fn supports_isolation(&self) -> bool;

    /// Compiles `text` as a freestanding program, solely to surface syntax
    /// errors early. `label` names the module in diagnostics.
    fn compile_program(&self, text: &str, label: &str) -> Result<()>;

    /// Compiles `body` as a function literal over `params`, bound to the
    /// engine's sealed scope (or, on a non-isolating engine, to whatever
    /// unrestricted scope it has).
    fn compile_function(&self, params: &[&str], body: &str, label: &str) -> Result<Factory>;
}

/// Compiles module text through a host engine, enforcing the two-pass
/// protocol: a program compile for early syntax errors, then a function
/// literal with exactly the `require`, `exports`, `environment` parameters.
///
/// On an engine without isolated compilation the evaluator still works,
/// but emits a one-time warning and reports itself insecure through
/// [`SecureEvaluator::is_secure`] so embedders can refuse to proceed.
pub struct SecureEvaluator {
    engine: Arc<dyn ScriptEngine>,
    warned: AtomicBool,
}

impl SecureEvaluator {
    /// Wraps a host engine.
    pub fn new(engine: Arc<dyn ScriptEngine>) -> Self {
        Self {
            engine,
            warned: AtomicBool::new(false),
        }
    }

    /// Whether factories produced here are actually confined to a sealed
    /// scope. The programmatic form of the fallback warning.
    pub fn is_secure(&self) -> bool {
        self.engine.supports_isolation()
    }

    /// Compiles `text` into a module factory, with `id` as the diagnostic
    /// label.
    pub fn evaluate(&self, text: &str, id: &ModuleId) -> Result<Factory> {
        if self.engine.supports_isolation() {
            self.engine.compile_program(text, id.as_str())?;
        } else if !self.warned.swap(true, Ordering::Relaxed) {
            tracing::warn!("secure module loading is not available on this host engine");
        }
        self.engine.compile_function(&FACTORY_PARAMS, text, id.as_str())
    }
}

/// A script engine backed by a registry of host-native module factories.
///
/// "Compilation" dispatches on the module id label; source text is ignored.
/// Native factories are confined by construction — they observe only the
/// values passed to them — so the engine reports itself isolating. This is
/// the embedding vehicle for Rust-native module graphs and the engine the
/// test suites run on.
#[derive(Default)]
pub struct NativeEngine {
    registry: DashMap<String, Factory>,
}

impl NativeEngine {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a native factory under a canonical module id.
    pub fn register<F>(&self, id: impl Into<String>, factory: F)
    where
        F: Fn(Value, &Require, Value, &Value) -> Result<()> + Send + Sync + 'static,
    {
        self.registry.insert(id.into(), Arc::new(factory));
    }

    fn lookup(&self, label: &str) -> Result<Factory> {
        self.registry
            .get(label)
            .map(|entry| entry.clone())
            .ok_or_else(|| {
                EngineError::Syntax {
                    label: label.to_string(),
                    message: "no native module factory registered".to_string(),
                }
                .into()
            })
    }
}

impl ScriptEngine for NativeEngine {
    fn supports_isolation(&self) -> bool {
        true
    }

    fn compile_program(&self, _text: &str, label: &str) -> Result<()> {
        self.lookup(label).map(|_| ())
    }

    fn compile_function(&self, _params: &[&str], _body: &str, label: &str) -> Result<Factory> {
        self.lookup(label)
    }
}
