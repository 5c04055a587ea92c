//! Concurrent evaluation of resolved units.

use std::fs;
use std::path::Path;

use rayon::prelude::*;
use serde_json::{Map, Value};
use tracing::{debug, debug_span};

use crate::context::Context;
use crate::engine::ScriptEngine;
use crate::errors::LoadError;
use crate::resolver::Candidate;

/// Section name → exported value of the unit that won resolution.
pub type ConfigTree = Map<String, Value>;

/// Reads and evaluates a single unit.
pub fn load_section(
    dir: &Path,
    candidate: &Candidate,
    engine: &dyn ScriptEngine,
    context: &Context,
) -> Result<Value, LoadError> {
    let path = dir.join(&candidate.file_name);
    let _span = debug_span!("section", name = %candidate.section, file = %candidate.file_name).entered();
    let source = fs::read_to_string(&path).map_err(|source| LoadError::Read {
        path: path.clone(),
        source,
    })?;
    let value = engine.evaluate(&source, context).map_err(|source| LoadError::Eval {
        section: candidate.section.clone(),
        path,
        source,
    })?;
    debug!("evaluated");
    Ok(value)
}

/// Evaluates every candidate on the rayon pool and gathers the results.
///
/// All units share `context`. The first failure observed is returned and no
/// tree is produced; units already in flight may still run to completion.
pub fn load_sections(
    dir: &Path,
    candidates: &[Candidate],
    engine: &dyn ScriptEngine,
    context: &Context,
) -> Result<ConfigTree, LoadError> {
    let evaluated: Vec<(String, Value)> = candidates
        .par_iter()
        .map(|c| load_section(dir, c, engine, context).map(|v| (c.section.clone(), v)))
        .collect::<Result<_, _>>()?;
    Ok(evaluated.into_iter().collect())
}
