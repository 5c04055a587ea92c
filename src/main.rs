use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use serde_json::Value;
use section_config::{Context, LoadOptions, Loader};
use tracing::Level;

/// Load a directory of configuration units and print the result as JSON.
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Directory holding `<section>[.<mode>].cfg` units
    dir: PathBuf,
    /// Mode qualifier to prefer (e.g. `test`, `prod`)
    #[arg(short, long, default_value = "")]
    mode: String,
    /// Restrict loading to these sections (repeatable)
    #[arg(short, long = "name")]
    names: Vec<String>,
    /// Let units read process environment variables through `env(...)`
    #[arg(long)]
    env: bool,
    /// Predefine a global, `key=<json>`; non-JSON values are taken as strings
    #[arg(long = "set", value_parser = parse_global)]
    globals: Vec<(String, Value)>,
    /// Print the files that would be evaluated instead of evaluating them
    #[arg(long)]
    dry_run: bool,
    /// Single-line JSON output
    #[arg(long)]
    compact: bool,
    /// Log resolution decisions to stderr (repeat for more detail)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn parse_global(raw: &str) -> Result<(String, Value), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected key=value, got `{raw}`"))?;
    if key.is_empty() {
        return Err("global name must not be empty".into());
    }
    let value = serde_json::from_str(value).unwrap_or_else(|_| Value::String(value.to_string()));
    Ok((key.to_string(), value))
}

fn main() {
    // Parse CLI arguments.
    let args = Args::parse();

    let level = match args.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        _ => Level::DEBUG,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();

    // Build the evaluation context.
    let mut context = Context::new();
    if args.env {
        context = context.with_process_env();
    }
    for (key, value) in args.globals {
        context = context.with_global(key, value);
    }

    let mut options = LoadOptions::new()
        .with_mode(args.mode)
        .with_context(Arc::new(context));
    if !args.names.is_empty() {
        options = options.with_names(args.names);
    }

    let loader = Loader::default();
    let rendered = if args.dry_run {
        loader
            .resolve(&args.dir, &options)
            .map(|candidates| serde_json::to_value(candidates).unwrap_or(Value::Null))
    } else {
        loader.load(&args.dir, &options).map(Value::Object)
    };

    let out = match rendered {
        Ok(v) => v,
        Err(e) => {
            eprintln!("error: {e}");
            std::process::exit(1);
        }
    };

    let text = if args.compact {
        serde_json::to_string(&out)
    } else {
        serde_json::to_string_pretty(&out)
    };
    match text {
        Ok(text) => println!("{text}"),
        Err(e) => {
            eprintln!("error: {e}");
            std::process::exit(1);
        }
    }
}
