// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! # cordon-sandbox
//!
//! A secure module-loading sandbox with a CommonJS-style `require`
//! convention: modules are resolved, fetched, compiled and executed by
//! hierarchical string identifier, while the code being run is prevented
//! from escaping its module-tree root, mutating its injected environment,
//! or reaching ambient host capabilities it was not given.
//!
//! The pieces compose as a chain:
//!
//! ```text
//! Sandbox::invoke(id)
//!   └─ Loader::resolve(id)            canonical id
//!   └─ Loader::load(id)               factory cache, or
//!        └─ Loader::reload(id)        fetch + evaluate
//!             └─ SecureEvaluator      sealed-scope compilation
//!   └─ factory(this, require, exports, environment)
//! ```
//!
//! Isolation is object-capability isolation at the engine-value level —
//! not OS-level sandboxing — and is contingent on the host engine
//! enforcing immutability and offering no reflective escape. An engine
//! that cannot guarantee a sealed scope is reported, not silently
//! accepted: see [`SecureEvaluator::is_secure`].

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod evaluator;
pub mod module_system;
pub mod sandbox;

pub use error::{Result, SandboxError};
pub use evaluator::{FACTORY_PARAMS, Factory, NativeEngine, ScriptEngine, SecureEvaluator};
pub use module_system::{
    FactoryCache, FileLoader, Loader, ModuleCache, ModuleId, PrefixLoader, SecureLoader,
};
pub use sandbox::{Require, Sandbox, SandboxOptions};

/// Version of the cordon sandbox runtime
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
