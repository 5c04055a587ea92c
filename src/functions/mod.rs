use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use crate::errors::{EvalError, Result};

/// Trait for functions callable from configuration units.
///
/// A function is a capability: units can only call what the context's
/// registry holds.
pub trait Function: Send + Sync {
    fn name(&self) -> &'static str;
    fn arity(&self) -> std::ops::RangeInclusive<usize>;
    fn call(&self, args: &[Value]) -> Result<Value>;
}

/// Thread-safe function registry.
#[derive(Clone, Default)]
pub struct Registry {
    inner: Arc<HashMap<&'static str, Arc<dyn Function>>>,
}

impl Registry {
    pub fn new() -> Self { Self::default() }

    /// Pure built-ins. `env` is not included, see [`builtins::Env`].
    pub fn with_builtins() -> Self {
        let mut map: HashMap<&'static str, Arc<dyn Function>> = HashMap::new();
        map.insert("lower", Arc::new(builtins::Lower));
        map.insert("upper", Arc::new(builtins::Upper));
        map.insert("first", Arc::new(builtins::First));
        map.insert("unique", Arc::new(builtins::Unique));
        map.insert("or_default", Arc::new(builtins::OrDefault));
        map.insert("duration", Arc::new(builtins::Duration));
        map.insert("fail", Arc::new(builtins::Fail));
        Self { inner: Arc::new(map) }
    }

    pub fn register<F: Function + 'static>(&mut self, f: F) {
        let mut_map = Arc::make_mut(&mut self.inner);
        mut_map.insert(f.name(), Arc::new(f));
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Function>> {
        self.inner.get(name).cloned()
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.inner.keys().copied().collect();
        names.sort_unstable();
        names
    }

    /// Looks up `name`, checks the argument count and calls it.
    pub fn call(&self, name: &str, args: &[Value]) -> Result<Value> {
        let f = self
            .get(name)
            .ok_or_else(|| EvalError::Runtime(format!("unknown function `{name}`")))?;
        let arity = f.arity();
        if !arity.contains(&args.len()) {
            return Err(EvalError::Runtime(format!(
                "`{name}` expects {} argument(s), got {}",
                describe_arity(&arity),
                args.len()
            )));
        }
        f.call(args)
    }
}

fn describe_arity(arity: &std::ops::RangeInclusive<usize>) -> String {
    if arity.start() == arity.end() {
        arity.start().to_string()
    } else {
        format!("{}..={}", arity.start(), arity.end())
    }
}

pub mod builtins {
    use super::*;
    use serde_json::Value;

    pub struct Lower;
    impl Function for Lower {
        fn name(&self) -> &'static str { "lower" }
        fn arity(&self) -> std::ops::RangeInclusive<usize> { 1..=1 }
        fn call(&self, args: &[Value]) -> Result<Value> {
            let s = args.first().cloned().unwrap_or(Value::Null);
            Ok(match s {
                Value::String(t) => Value::String(t.to_lowercase()),
                other => other,
            })
        }
    }

    pub struct Upper;
    impl Function for Upper {
        fn name(&self) -> &'static str { "upper" }
        fn arity(&self) -> std::ops::RangeInclusive<usize> { 1..=1 }
        fn call(&self, args: &[Value]) -> Result<Value> {
            let s = args.first().cloned().unwrap_or(Value::Null);
            Ok(match s {
                Value::String(t) => Value::String(t.to_uppercase()),
                other => other,
            })
        }
    }

    pub struct First;
    impl Function for First {
        fn name(&self) -> &'static str { "first" }
        fn arity(&self) -> std::ops::RangeInclusive<usize> { 1..=1 }
        fn call(&self, args: &[Value]) -> Result<Value> {
            Ok(crate::engine::first(args.first().unwrap_or(&Value::Null)))
        }
    }

    pub struct Unique;
    impl Function for Unique {
        fn name(&self) -> &'static str { "unique" }
        fn arity(&self) -> std::ops::RangeInclusive<usize> { 1..=1 }
        fn call(&self, args: &[Value]) -> Result<Value> {
            Ok(crate::engine::unique(args.first().unwrap_or(&Value::Null)))
        }
    }

    pub struct OrDefault;
    impl Function for OrDefault {
        fn name(&self) -> &'static str { "or_default" }
        fn arity(&self) -> std::ops::RangeInclusive<usize> { 2..=2 }
        fn call(&self, args: &[Value]) -> Result<Value> {
            let a = args.first().unwrap_or(&Value::Null);
            let b = args.get(1).cloned().unwrap_or(Value::Null);
            Ok(crate::engine::or_default(a, b))
        }
    }

    /// `duration("1d 10h 7m 13s")` in milliseconds. Numbers pass through.
    pub struct Duration;
    impl Function for Duration {
        fn name(&self) -> &'static str { "duration" }
        fn arity(&self) -> std::ops::RangeInclusive<usize> { 1..=1 }
        fn call(&self, args: &[Value]) -> Result<Value> {
            match args.first() {
                Some(Value::Number(n)) => Ok(Value::Number(n.clone())),
                Some(Value::String(s)) => parse_duration(s).map(Value::from),
                Some(other) => Err(EvalError::Runtime(format!(
                    "duration expects a string or number, got {other}"
                ))),
                None => Ok(Value::Null),
            }
        }
    }

    fn parse_duration(s: &str) -> Result<i64> {
        let mut total: i64 = 0;
        for part in s.split_whitespace() {
            let unit = part.chars().last().unwrap_or_default();
            let secs: i64 = match unit {
                'd' => 86_400,
                'h' => 3_600,
                'm' => 60,
                's' => 1,
                _ => return Err(EvalError::Runtime(format!("bad duration unit in `{part}`"))),
            };
            let amount: i64 = part[..part.len() - 1]
                .parse()
                .map_err(|_| EvalError::Runtime(format!("bad duration amount in `{part}`")))?;
            total = amount
                .checked_mul(secs * 1000)
                .and_then(|ms| total.checked_add(ms))
                .ok_or_else(|| EvalError::Runtime(format!("duration `{s}` overflows")))?;
        }
        Ok(total)
    }

    /// `fail(message)` aborts the unit with [`EvalError::Raised`].
    pub struct Fail;
    impl Function for Fail {
        fn name(&self) -> &'static str { "fail" }
        fn arity(&self) -> std::ops::RangeInclusive<usize> { 0..=1 }
        fn call(&self, args: &[Value]) -> Result<Value> {
            let msg = match args.first() {
                Some(Value::String(s)) => s.clone(),
                Some(other) => other.to_string(),
                None => "configuration unit failed".to_string(),
            };
            Err(EvalError::Raised(msg))
        }
    }

    /// `env(name[, default])` reads the process environment.
    pub struct Env;
    impl Function for Env {
        fn name(&self) -> &'static str { "env" }
        fn arity(&self) -> std::ops::RangeInclusive<usize> { 1..=2 }
        fn call(&self, args: &[Value]) -> Result<Value> {
            let name = args
                .first()
                .and_then(Value::as_str)
                .ok_or_else(|| EvalError::Runtime("env expects a variable name".into()))?;
            Ok(match std::env::var(name) {
                Ok(v) => Value::String(v),
                Err(_) => args.get(1).cloned().unwrap_or(Value::Null),
            })
        }
    }

}
