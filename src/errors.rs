use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while parsing or running a single configuration unit.
#[derive(Debug, Error)]
pub enum EvalError {
    #[error("parse error: {0}")]
    Parse(String),

    #[error("runtime error: {0}")]
    Runtime(String),

    /// Raised explicitly by configuration code through `fail(...)`.
    #[error("{0}")]
    Raised(String),
}

pub type Result<T> = std::result::Result<T, EvalError>;

/// Errors surfaced by a load operation. Any of them aborts the whole load.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("cannot list config directory {}: {source}", path.display())]
    Scan {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("cannot read config file {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("section `{section}` ({}): {source}", path.display())]
    Eval {
        section: String,
        path: PathBuf,
        #[source]
        source: EvalError,
    },
}

impl LoadError {
    /// Kind of the underlying filesystem error, if this is one.
    pub fn io_kind(&self) -> Option<io::ErrorKind> {
        match self {
            LoadError::Scan { source, .. } | LoadError::Read { source, .. } => Some(source.kind()),
            LoadError::Eval { .. } => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.io_kind() == Some(io::ErrorKind::NotFound)
    }
}
