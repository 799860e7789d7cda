//! Host-native function representation.

use std::fmt;

use crate::error::Result;
use crate::value::Value;

/// A named host function exposed to sandboxed code as a value.
///
/// Native functions are the vehicle by which an embedding grants
/// capabilities through the environment: the closure observes only the
/// arguments it is handed.
pub struct NativeFunction {
    /// The function name
    name: String,
    /// The host closure
    func: Box<dyn Fn(&[Value]) -> Result<Value> + Send + Sync>,
}

impl NativeFunction {
    /// Creates a named native function.
    pub fn new<F>(name: impl Into<String>, func: F) -> Self
    where
        F: Fn(&[Value]) -> Result<Value> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            func: Box::new(func),
        }
    }

    /// The function name, used in diagnostics.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Invokes the function.
    pub fn call(&self, args: &[Value]) -> Result<Value> {
        (self.func)(args)
    }
}

impl fmt::Debug for NativeFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NativeFunction({})", self.name)
    }
}
