use pretty_assertions::assert_eq;
use section_config as sc;
use serde_json::{json, Map, Value};
use std::path::PathBuf;
use std::sync::Arc;

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures").join(name)
}

fn load(name: &str, options: &sc::LoadOptions) -> Value {
    Value::Object(sc::load(fixture(name), options).unwrap())
}

#[test]
fn single_section() {
    let out = load("basic", &sc::LoadOptions::new());
    assert_eq!(
        out,
        json!({ "server": { "transport": "http", "address": "127.0.0.1", "ports": 80 } })
    );
}

#[test]
fn loader_struct_matches_convenience_fn() {
    let via_loader = sc::Loader::default()
        .load(fixture("basic"), &sc::LoadOptions::new())
        .unwrap();
    assert_eq!(Value::Object(via_loader), load("basic", &sc::LoadOptions::new()));
}

#[test]
fn server_with_logger() {
    let out = load("with_logger", &sc::LoadOptions::new());
    assert_eq!(
        out,
        json!({
            "server": { "transport": "http", "address": "127.0.0.1", "ports": 80 },
            "logger": {
                "enabled": true,
                "keepDays": 100,
                "writeInterval": 3000,
                "writeBuffer": 65536,
                "toStdout": ["system", "fatal", "error"],
            },
        })
    );
}

#[test]
fn application_in_test_mode() {
    let options = sc::LoadOptions::new().with_mode("test");
    let out = load("application", &options);
    assert_eq!(
        out,
        json!({
            "application": { "name": "Application name" },
            "gateway": { "host": "10.0.0.1", "port": 2000 },
            "dependencies": {
                "internal": ["fs", "path", "http"],
                "external": ["metautil", "metasync", "eslint"],
            },
            "server": { "transport": "http", "address": "127.0.0.1", "ports": 8080 },
            "timeouts": { "cache": 30000, "reply": 5000, "query": 3000 },
        })
    );
}

#[test]
fn application_without_mode_skips_qualified_units() {
    let out = load("application", &sc::LoadOptions::new());
    assert_eq!(out["server"]["ports"], json!(80));
    assert!(out.get("gateway").is_none());
}

#[test]
fn specified_sections() {
    let options = sc::LoadOptions::new().with_names(["application", "gateway"]);
    assert_eq!(
        load("application", &options),
        json!({ "application": { "name": "Application name" } })
    );
}

#[test]
fn specified_sections_with_mode() {
    let options = sc::LoadOptions::new()
        .with_mode("test")
        .with_names(["application", "gateway"]);
    assert_eq!(
        load("application", &options),
        json!({
            "application": { "name": "Application name" },
            "gateway": { "host": "10.0.0.1", "port": 2000 },
        })
    );
}

#[test]
fn units_read_injected_process_state() {
    let vars: Map<String, Value> = std::env::vars().map(|(k, v)| (k, Value::String(v))).collect();
    let context = sc::Context::new().with_global("process", json!({ "env": vars }));
    let options = sc::LoadOptions::new()
        .with_mode("test")
        .with_context(Arc::new(context));
    let user = std::env::var("USER").map(Value::String).unwrap_or(Value::Null);
    assert_eq!(
        load("env_user", &options),
        json!({ "application": { "name": "Application name", "user": user } })
    );
}

#[test]
fn dry_run_lists_winning_files() {
    let options = sc::LoadOptions::new().with_mode("prod");
    let files: Vec<String> = sc::Loader::default()
        .resolve(fixture("mixed"), &options)
        .unwrap()
        .into_iter()
        .map(|c| c.file_name)
        .collect();
    assert_eq!(files, vec!["app.prod.cfg", "db.prod.cfg"]);
}
