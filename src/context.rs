use parking_lot::RwLock;
use serde_json::{Map, Value};

use crate::functions::{builtins, Function, Registry};

/// Isolated scope shared by every unit evaluated in one load.
///
/// Units see only the globals stored here and the functions in its registry.
/// Globals are read and written concurrently by units of the same load; the
/// order of those writes across sections is unspecified. Use separate
/// contexts for loads that must not observe each other.
pub struct Context {
    globals: RwLock<Map<String, Value>>,
    registry: Registry,
}

impl Context {
    /// Fresh context with the pure built-in functions and no globals.
    pub fn new() -> Self {
        Self::with_registry(Registry::with_builtins())
    }

    pub fn with_registry(registry: Registry) -> Self {
        Self { globals: RwLock::new(Map::new()), registry }
    }

    /// Adds the `env(name[, default])` capability.
    pub fn with_process_env(mut self) -> Self {
        self.registry.register(builtins::Env);
        self
    }

    pub fn with_function<F: Function + 'static>(mut self, f: F) -> Self {
        self.registry.register(f);
        self
    }

    pub fn with_global(self, name: impl Into<String>, value: Value) -> Self {
        self.globals.write().insert(name.into(), value);
        self
    }

    pub fn get(&self, name: &str) -> Option<Value> {
        self.globals.read().get(name).cloned()
    }

    pub fn set(&self, name: impl Into<String>, value: Value) {
        self.globals.write().insert(name.into(), value);
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Copy of the current globals.
    pub fn snapshot(&self) -> Map<String, Value> {
        self.globals.read().clone()
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context")
            .field("globals", &self.globals.read().len())
            .field("functions", &self.registry.names())
            .finish()
    }
}
