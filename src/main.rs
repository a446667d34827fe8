//! tierconf
//!
//! Resolves hierarchical, environment-aware configuration from the libraries
//! registered in a `tierconf.yaml` manifest.

use anyhow::{Context, Result};
use clap::Parser;
use serde_json::Value;
use tierconf::cache::FileCache;
use tierconf::cli::{CacheCommand, Cli, Command, GetArgs, ResolveArgs};
use tierconf::logging::{self, LogTarget};
use tierconf::settings::{CacheKind, Settings};
use tracing::debug;

fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(&LogTarget::parse(&cli.log), cli.verbose)?;

    let mut settings = Settings::discover(cli.config.as_deref())?;
    if let Some(environment) = &cli.environment {
        settings.environment = environment.clone();
    }
    debug!(
        environment = %settings.environment,
        libraries = settings.libraries.len(),
        "settings loaded"
    );

    match cli.command {
        Command::Resolve(args) => resolve(&settings, args),
        Command::Get(args) => get(&settings, args),
        Command::Sources => sources(&settings),
        Command::Cache(command) => cache(&settings, command),
    }
}

fn resolve(settings: &Settings, args: ResolveArgs) -> Result<()> {
    let mut store = settings.build_store()?;
    store.init(args.identity.as_deref())?;
    let tree = Value::Object(store.snapshot(None)?);

    let output = if args.compact {
        serde_json::to_string(&tree)?
    } else {
        serde_json::to_string_pretty(&tree)?
    };
    println!("{output}");
    Ok(())
}

fn get(settings: &Settings, args: GetArgs) -> Result<()> {
    let default: Value = serde_json::from_str(&args.default)
        .with_context(|| format!("--default is not valid JSON: {}", args.default))?;

    let mut store = settings.build_store()?;
    let value = store.get(&args.path, default, args.identity.as_deref())?;
    match value {
        Value::String(s) => println!("{s}"),
        other => println!("{}", serde_json::to_string_pretty(&other)?),
    }
    Ok(())
}

fn sources(settings: &Settings) -> Result<()> {
    let libraries = settings.libraries();
    if libraries.is_empty() {
        println!("No libraries registered.");
        return Ok(());
    }

    for library in libraries.priority_order() {
        println!("{} ({}) {}", library.name, library.tier, library.path.display());
        for dir in library.config_dirs() {
            let marker = if dir.is_dir() { "" } else { " (missing)" };
            println!("  {}{}", dir.display(), marker);
        }
    }
    Ok(())
}

fn cache(settings: &Settings, command: CacheCommand) -> Result<()> {
    let pool = &settings.cache.pool;
    match command {
        CacheCommand::List => {
            if settings.cache.kind != CacheKind::File {
                println!("Memory cache holds no entries between runs.");
                return Ok(());
            }
            let cache: FileCache = settings.file_cache();
            for entry in cache.entries(pool)? {
                println!(
                    "{}  {}  {} keys",
                    entry.written_at.to_rfc3339(),
                    entry.key,
                    entry.tree.len()
                );
            }
        }
        CacheCommand::Clear => {
            settings.cache().clear(pool)?;
            println!("Cleared cache pool `{pool}`.");
        }
    }
    Ok(())
}
