//! CLI command definitions for tierconf
//!
//! This module defines the CLI structure using clap's derive macros.
//! The main entry point is the `Cli` struct which contains subcommands.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Hierarchical configuration resolver
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to the tierconf.yaml manifest
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Active environment (overrides the manifest)
    #[arg(short, long, global = true)]
    pub environment: Option<String>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Logging output: 0/off, 1/stdout, 2/stderr (default), or filename
    #[arg(short, long, default_value = "2", global = true)]
    pub log: String,

    #[command(subcommand)]
    pub command: Command,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Resolve an identity and print the merged tree as JSON
    Resolve(ResolveArgs),

    /// Print the value at a dot path
    Get(GetArgs),

    /// List libraries in priority order
    Sources,

    /// Inspect or clear the resolution cache
    #[command(subcommand)]
    Cache(CacheCommand),
}

#[derive(Args, Debug)]
pub struct ResolveArgs {
    /// Dot-separated identity (defaults to the environment name)
    pub identity: Option<String>,

    /// Print compact JSON
    #[arg(long)]
    pub compact: bool,
}

#[derive(Args, Debug)]
pub struct GetArgs {
    /// Dot path such as `properties.service`
    pub path: String,

    /// Identity to read from (defaults to the environment name)
    #[arg(short, long)]
    pub identity: Option<String>,

    /// JSON value printed when the path is unset
    #[arg(short, long, default_value = "null")]
    pub default: String,
}

#[derive(Subcommand, Debug)]
pub enum CacheCommand {
    /// List cached entries (file cache only)
    List,
    /// Drop every entry of the configured pool
    Clear,
}
