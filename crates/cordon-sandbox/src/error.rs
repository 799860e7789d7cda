// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Error types for the module sandbox.

use thiserror::Error;

use crate::module_system::ModuleId;

/// Result type for sandbox operations.
pub type Result<T> = std::result::Result<T, SandboxError>;

/// Errors that can occur while resolving, loading or executing modules.
#[derive(Debug, Error)]
pub enum SandboxError {
    /// An abstract loader operation was hit without an override
    #[error("'{operation}' is not implemented by {loader}")]
    NotImplemented {
        /// The loader operation
        operation: &'static str,
        /// The loader that was asked
        loader: &'static str,
    },

    /// A path segment failed the strict identifier syntax
    #[error("'{id}' is an illegal module identifier (contains a non-word name component)")]
    IllegalId {
        /// The offending identifier
        id: String,
    },

    /// A relative id was resolved with no base to resolve against
    #[error("module '{id}' is relative, so it cannot be used as a main module id")]
    RelativeWithoutBase {
        /// The offending identifier
        id: String,
    },

    /// A `..` segment attempted to escape above the module root
    #[error("'{id}' is an illegal module identifier (traverses up, beyond the root)")]
    Traversal {
        /// The offending identifier
        id: String,
    },

    /// No search-path/extension combination resolved to an existing file
    #[error("cannot find module '{id}'")]
    NotFound {
        /// The identifier that failed to resolve
        id: String,
    },

    /// The sandbox or a loader was assembled without a required collaborator
    #[error("{0}")]
    Configuration(String),

    /// Engine-level failure: syntax error, frozen-write violation
    #[error(transparent)]
    Engine(#[from] cordon_engine::EngineError),

    /// An error raised by a module factory's own code
    #[error("{0}")]
    Runtime(String),

    /// A failure annotated with the module that required the failing one
    #[error("{source} in {id}")]
    Within {
        /// The underlying failure
        source: Box<SandboxError>,
        /// The requiring module
        id: ModuleId,
    },

    /// File system error
    #[error("file system error: {0}")]
    Io(#[from] std::io::Error),
}

impl SandboxError {
    /// Annotates this error with the id of the requiring module, so that a
    /// deep failure surfaces with the chain of requiring ids.
    pub fn within(self, id: &ModuleId) -> Self {
        SandboxError::Within {
            source: Box::new(self),
            id: id.clone(),
        }
    }
}
