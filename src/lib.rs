// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! # cordon
//!
//! Secure module-loading sandbox: embed untrusted or semi-trusted script
//! modules inside a trusted host process, with a CommonJS-style `require`
//! convention and capability-based isolation.
//!
//! This facade re-exports the engine value layer (`cordon-engine`) and the
//! loader/sandbox chain (`cordon-sandbox`), and provides the program-level
//! [`sandbox`] entry point.
//!
//! ## Quick start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use cordon::{
//!     FileLoader, NativeEngine, Options, SecureEvaluator, SecureLoader, Value, sandbox,
//! };
//!
//! let engine = Arc::new(NativeEngine::new());
//! let evaluator = Arc::new(SecureEvaluator::new(engine));
//! let loader = SecureLoader::new(
//!     Arc::new(FileLoader::new(["./modules"]).with_evaluator(evaluator.clone())),
//!     evaluator,
//! );
//!
//! let exports = sandbox(
//!     "app/main",
//!     Value::Undefined,
//!     Options {
//!         loader: Some(Arc::new(loader)),
//!         ..Default::default()
//!     },
//! )?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

use std::sync::Arc;

pub use cordon_engine::{
    EngineError, NativeFunction, Object, ObjectRef, Value, deep_freeze,
};
pub use cordon_sandbox::{
    FACTORY_PARAMS, Factory, FactoryCache, FileLoader, Loader, ModuleCache, ModuleId,
    NativeEngine, PrefixLoader, Require, Result, Sandbox, SandboxError, SandboxOptions,
    ScriptEngine, SecureEvaluator, SecureLoader,
};

/// Options accepted by the [`sandbox`] entry point.
#[derive(Default)]
pub struct Options {
    /// The loader serving the module universe. Required; there is no
    /// ambient loader to fall back to.
    pub loader: Option<Arc<dyn Loader>>,
    /// Enables trace output in the sandbox.
    pub debug: bool,
    /// Wraps the loader in a [`PrefixLoader`] before use, scoping the
    /// sandbox to a subtree of the loader's module universe.
    pub prefix: Option<String>,
}

/// Invokes a module in a fresh module system.
///
/// Accepts the id of the main module to enter initially, a system value
/// that is coerced to an object and deep-frozen into the environment, and
/// options. Returns the exports of the resolved main module after full
/// execution.
pub fn sandbox(main_id: &str, system: Value, options: Options) -> Result<Value> {
    let loader = options.loader.ok_or_else(|| {
        SandboxError::Configuration(
            "sandbox cannot operate without a loader, either explicitly provided \
             as an option, or implicitly provided by the enclosing sandbox"
                .to_string(),
        )
    })?;

    let loader = match options.prefix {
        Some(prefix) => Arc::new(PrefixLoader::new(prefix, loader)) as Arc<dyn Loader>,
        None => loader,
    };

    let sandbox = Sandbox::new(SandboxOptions {
        loader: Some(loader),
        system,
        modules: None,
        debug: options.debug,
    })?;

    sandbox.invoke(main_id, None, false)
}
