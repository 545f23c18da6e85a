//! devreload CLI - Run a development host with manifest-driven hot reload

mod cli;
mod commands;
mod error;
mod host;

use clap::Parser;
use cli::{Cli, Commands};

pub use error::CliError;

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    if cli.verbose {
        tracing_subscriber::fmt().with_env_filter("debug").init();
    } else {
        tracing_subscriber::fmt().with_env_filter("info").init();
    }

    match cli.command {
        Commands::Run {
            home,
            manifest,
            config,
            timer,
        } => {
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(commands::run::run(
                home,
                manifest,
                config.as_deref(),
                timer,
            ))?;
        }

        Commands::Check { file, json } => {
            commands::check::run(&file, json)?;
        }
    }

    Ok(())
}
