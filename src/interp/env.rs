//! Name bindings.

use std::collections::HashMap;

use super::value::Value;

/// Active bindings from names to values.
///
/// Function calls evaluate in a copy of the caller's environment, so
/// assignments inside a function are not visible after it returns. Branch
/// and loop bodies share the enclosing environment.
#[derive(Debug, Clone, Default)]
pub struct Env {
    vars: HashMap<String, Value>,
}

impl Env {
    /// Create an empty environment.
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a binding.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.vars.get(name)
    }

    /// Bind or rebind a name.
    pub fn set(&mut self, name: impl Into<String>, value: Value) {
        self.vars.insert(name.into(), value);
    }
}
