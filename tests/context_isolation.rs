use pretty_assertions::assert_eq;
use section_config as sc;
use section_config::functions::Function;
use serde_json::{json, Value};
use std::fs;
use std::sync::Arc;

fn unit_dir() -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("server.cfg"), "{ port: basePort + 1, host: host }").unwrap();
    fs::write(dir.path().join("client.cfg"), "{ target: host + ':' + basePort }").unwrap();
    dir
}

fn context(host: &str, port: i64) -> Arc<sc::Context> {
    Arc::new(
        sc::Context::new()
            .with_global("host", json!(host))
            .with_global("basePort", json!(port)),
    )
}

#[test]
fn distinct_contexts_give_independent_trees() {
    let dir = unit_dir();
    let a = sc::load(dir.path(), &sc::LoadOptions::new().with_context(context("alpha", 8000))).unwrap();
    let b = sc::load(dir.path(), &sc::LoadOptions::new().with_context(context("beta", 9000))).unwrap();
    assert_eq!(
        Value::Object(a),
        json!({ "server": { "port": 8001, "host": "alpha" }, "client": { "target": "alpha:8000" } })
    );
    assert_eq!(
        Value::Object(b),
        json!({ "server": { "port": 9001, "host": "beta" }, "client": { "target": "beta:9000" } })
    );
}

#[test]
fn loading_twice_is_idempotent() {
    let dir = unit_dir();
    let shared = context("gamma", 7000);
    let options = sc::LoadOptions::new().with_context(shared);
    let first = sc::load(dir.path(), &options).unwrap();
    let second = sc::load(dir.path(), &options).unwrap();
    assert_eq!(first, second);
}

#[test]
fn assignments_land_in_the_supplied_context() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("limits.cfg"), "maxConnections = 64; { max: maxConnections }").unwrap();
    let shared = Arc::new(sc::Context::new());
    sc::load(dir.path(), &sc::LoadOptions::new().with_context(Arc::clone(&shared))).unwrap();
    assert_eq!(shared.get("maxConnections"), Some(json!(64)));
    assert_eq!(Value::Object(shared.snapshot()), json!({ "maxConnections": 64 }));
}

struct Port;

impl Function for Port {
    fn name(&self) -> &'static str { "port" }
    fn arity(&self) -> std::ops::RangeInclusive<usize> { 1..=1 }
    fn call(&self, args: &[Value]) -> sc::errors::Result<Value> {
        let offset = args[0].as_i64().unwrap_or(0);
        Ok(json!(10_000 + offset))
    }
}

#[test]
fn custom_functions_extend_the_capability_surface() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("gateway.cfg"), "{ port: port(5) }").unwrap();
    let ctx = Arc::new(sc::Context::new().with_function(Port));
    let tree = sc::load(dir.path(), &sc::LoadOptions::new().with_context(ctx)).unwrap();
    assert_eq!(Value::Object(tree), json!({ "gateway": { "port": 10005 } }));
}

/// Engine that exports each file's text verbatim.
struct RawText;

impl sc::ScriptEngine for RawText {
    fn extension(&self) -> &str {
        "txt"
    }

    fn evaluate(&self, source: &str, _context: &sc::Context) -> sc::errors::Result<Value> {
        Ok(Value::String(source.trim().to_string()))
    }
}

#[test]
fn engines_are_pluggable() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("motd.txt"), "hello\n").unwrap();
    fs::write(dir.path().join("motd.prod.txt"), "welcome\n").unwrap();
    fs::write(dir.path().join("ignored.cfg"), "{}").unwrap();
    let loader = sc::Loader::new(RawText);
    let tree = loader.load(dir.path(), &sc::LoadOptions::new().with_mode("prod")).unwrap();
    assert_eq!(Value::Object(tree), json!({ "motd": "welcome" }));
}
