//! Engine error type.

use thiserror::Error;

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, EngineError>;

/// Errors raised by the engine value layer.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Attempted write to a property of a frozen object
    #[error("cannot assign to property '{key}' of a frozen object")]
    FrozenWrite {
        /// The property that was written
        key: String,
    },

    /// Attempted to add a property to a sealed object
    #[error("cannot add property '{key}' to a non-extensible object")]
    NotExtensible {
        /// The property that was added
        key: String,
    },

    /// Attempted to delete a property of a frozen object
    #[error("cannot delete property '{key}' of a frozen object")]
    FrozenDelete {
        /// The property that was deleted
        key: String,
    },

    /// Compilation failed
    #[error("SyntaxError: {message} in {label}")]
    Syntax {
        /// Diagnostic label, usually a module id
        label: String,
        /// Reason for failure
        message: String,
    },

    /// Wrong value type for an operation
    #[error("TypeError: {0}")]
    Type(String),

    /// Capability not available on this engine
    #[error("{0}")]
    Unsupported(String),
}
