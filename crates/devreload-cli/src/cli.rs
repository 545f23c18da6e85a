//! CLI command definitions using clap

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// devreload - Hot-reload development artifacts into a running host
#[derive(Parser)]
#[command(name = "devreload")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Run a console host, reloading whenever the manifest changes
    Run {
        /// Host home directory
        #[arg(long, env = "DEVRELOAD_HOME")]
        home: Option<PathBuf>,

        /// Manifest file (defaults to <home>/dev.artifacts)
        #[arg(short, long)]
        manifest: Option<PathBuf>,

        /// Configuration file (yaml, toml or json)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Poll the manifest in the background
        #[arg(long)]
        timer: bool,
    },

    /// Parse a manifest and print its artifacts
    Check {
        /// Manifest file
        file: PathBuf,

        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
}
