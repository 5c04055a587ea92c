pub mod errors;
pub mod context;
pub mod engine;
pub mod functions;  // capabilities callable from units
pub mod resolver;
pub mod loader;
mod expression;
mod parser;

use std::collections::BTreeSet;
use std::path::Path;
use std::sync::Arc;

use tracing::info;

pub use context::Context;
pub use engine::{ExprEngine, ScriptEngine};
pub use errors::{EvalError, LoadError};
pub use loader::ConfigTree;
pub use resolver::Candidate;

/// Options for one load operation.
#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    /// Only these sections are resolved; others are never read.
    pub names: Option<BTreeSet<String>>,
    /// Mode qualifier to prefer; empty means unqualified files only.
    pub mode: String,
    /// Context to evaluate in. A fresh [`Context::new`] is used when absent.
    pub context: Option<Arc<Context>>,
}

impl LoadOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_mode(mut self, mode: impl Into<String>) -> Self {
        self.mode = mode.into();
        self
    }

    pub fn with_names<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.names = Some(names.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_context(mut self, context: Arc<Context>) -> Self {
        self.context = Some(context);
        self
    }
}

/// Loads configuration directories with a given script engine.
pub struct Loader {
    engine: Arc<dyn ScriptEngine>,
}

impl Default for Loader {
    fn default() -> Self {
        Self::new(ExprEngine)
    }
}

impl Loader {
    pub fn new<E: ScriptEngine + 'static>(engine: E) -> Self {
        Self { engine: Arc::new(engine) }
    }

    /// Units of `dir` that would be evaluated for `options`, without running them.
    pub fn resolve(&self, dir: impl AsRef<Path>, options: &LoadOptions) -> Result<Vec<Candidate>, LoadError> {
        resolver::resolve(
            dir.as_ref(),
            &options.mode,
            options.names.as_ref(),
            self.engine.extension(),
        )
    }

    /// Resolves and evaluates `dir` into a configuration tree.
    pub fn load(&self, dir: impl AsRef<Path>, options: &LoadOptions) -> Result<ConfigTree, LoadError> {
        let dir = dir.as_ref();
        let candidates = self.resolve(dir, options)?;
        let context = options.context.clone().unwrap_or_else(|| Arc::new(Context::new()));
        let tree = loader::load_sections(dir, &candidates, self.engine.as_ref(), &context)?;
        info!(
            dir = %dir.display(),
            mode = %options.mode,
            sections = tree.len(),
            "configuration loaded"
        );
        Ok(tree)
    }
}

/// Convenience: load `dir` with the built-in engine.
pub fn load(dir: impl AsRef<Path>, options: &LoadOptions) -> Result<ConfigTree, LoadError> {
    Loader::default().load(dir, options)
}

/// Re-export the value helpers also exposed to units as functions.
pub use engine::{first, unique, or_default};
