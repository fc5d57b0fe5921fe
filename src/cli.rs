//! CLI entry point for convoy.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// convoy gateway CLI
#[derive(Parser, Debug)]
#[command(name = "convoy", version, about = "convoy — conversation event streaming gateway")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the gateway
    Serve(ServeArgs),
}

/// Arguments for `convoy serve`.
#[derive(Parser, Debug)]
pub struct ServeArgs {
    /// Bind address (overrides config)
    #[arg(long)]
    pub host: Option<String>,

    /// Bind port (overrides config)
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Path to a toml configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Verbose logging
    #[arg(short, long)]
    pub verbose: bool,
}
