use crate::context::Context;
use crate::errors::Result;
use crate::expression;
use itertools::Itertools;
use serde_json::Value;

/// Runs the source of one configuration unit and returns its exported value.
///
/// The loader treats the engine as an injected dependency: it only reads
/// files and hands their contents over, together with the context shared by
/// the whole load. Implementations must be callable from several threads at
/// once with the same context.
pub trait ScriptEngine: Send + Sync {
    /// File suffix (without the dot) that marks a loadable unit.
    fn extension(&self) -> &str;

    fn evaluate(&self, source: &str, context: &Context) -> Result<Value>;
}

/// Built-in engine for `.cfg` units: a side-effect free expression language
/// whose only reach outside the unit is the context it runs in.
#[derive(Debug, Default, Clone, Copy)]
pub struct ExprEngine;

impl ExprEngine {
    pub const EXTENSION: &'static str = "cfg";
}

impl ScriptEngine for ExprEngine {
    fn extension(&self) -> &str {
        Self::EXTENSION
    }

    fn evaluate(&self, source: &str, context: &Context) -> Result<Value> {
        let program = expression::parse_program(source)?;
        expression::eval_program(&program, context)
    }
}

/// Return the first element of an Array; else null.
pub fn first(vals: &Value) -> Value {
    match vals {
        Value::Array(a) => a.first().cloned().unwrap_or(Value::Null),
        _ => Value::Null,
    }
}

/// Deduplicate an array Value; identity for non-array.
pub fn unique(vals: &Value) -> Value {
    match vals {
        Value::Array(a) => {
            let dedup = a
                .iter()
                .cloned()
                .unique_by(|x| serde_json::to_string(x).unwrap_or_default())
                .collect::<Vec<_>>();
            Value::Array(dedup)
        }
        _ => vals.clone(),
    }
}

/// `default` if `vals` is null or an empty array; else `vals`.
pub fn or_default(vals: &Value, default: Value) -> Value {
    match vals {
        Value::Null => default,
        Value::Array(a) if a.is_empty() => default,
        _ => vals.clone(),
    }
}
