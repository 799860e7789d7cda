//! # cordon-engine
//!
//! The value layer of the Cordon module sandbox: shared objects with seal
//! and freeze semantics, host-native functions, and deep-freezing of whole
//! object graphs.
//!
//! Capability isolation in Cordon is object-capability isolation: a module
//! can only act through the values it is handed, and the values that mark a
//! trust boundary (the injected environment, the `this` binding) are frozen
//! before sandboxed code ever sees them. This crate supplies those
//! primitives; the loader chain and sandbox live in `cordon-sandbox`.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod function;
pub mod object;
pub mod value;

pub use error::{EngineError, Result};
pub use function::NativeFunction;
pub use object::{Object, ObjectRef};
pub use value::{Value, deep_freeze};
