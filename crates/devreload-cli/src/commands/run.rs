//! `devreload run` command implementation

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;

use colored::Colorize;
use crossbeam_channel::Receiver;
use devreload_kernel::config::load_config;
use devreload_kernel::{ReloadConfig, ReloadEvent};
use devreload_runtime::{LibraryContext, ReloadOrchestrator};

use crate::CliError;
use crate::host::ConsoleHost;

/// Resolve the effective configuration: file and `DEVRELOAD_*` variables
/// first, then command-line flags
pub fn resolve_config(
    home: Option<PathBuf>,
    manifest: Option<PathBuf>,
    config: Option<&Path>,
    timer: bool,
) -> Result<ReloadConfig, CliError> {
    let mut resolved = load_config(config)?;
    if let Some(home) = home {
        resolved.home = home;
    }
    if let Some(manifest) = manifest {
        resolved.manifest = Some(manifest);
    }
    if timer {
        resolved.install_reload_timer = true;
    }
    Ok(resolved)
}

/// Execute the `devreload run` command
pub async fn run(
    home: Option<PathBuf>,
    manifest: Option<PathBuf>,
    config: Option<&Path>,
    timer: bool,
) -> Result<(), CliError> {
    let config = resolve_config(home, manifest, config, timer)?;
    println!(
        "{} Watching manifest: {}",
        "→".green(),
        config.manifest_path().display()
    );

    let mut orchestrator = ReloadOrchestrator::new(
        config,
        Arc::new(ConsoleHost::new()),
        Box::new(LibraryContext::new()),
    );
    let printer = spawn_event_printer(orchestrator.subscribe())?;

    orchestrator
        .start()
        .map_err(|report| CliError::Orchestrator(format!("{report:?}")))?;

    if !orchestrator.is_polling() {
        println!(
            "{} Background polling disabled; pass --timer to reload on change",
            "!".yellow()
        );
    }

    tokio::signal::ctrl_c().await?;
    println!();

    orchestrator
        .stop()
        .map_err(|report| CliError::Orchestrator(format!("{report:?}")))?;

    drop(orchestrator);
    let _ = printer.join();
    Ok(())
}

fn spawn_event_printer(events: Receiver<ReloadEvent>) -> std::io::Result<thread::JoinHandle<()>> {
    thread::Builder::new()
        .name("devreload-events".to_string())
        .spawn(move || {
            for event in events {
                print_event(&event);
            }
        })
}

fn print_event(event: &ReloadEvent) {
    match event {
        ReloadEvent::Preloaded { manifest, artifacts } => println!(
            "{} Preloaded {} artifact(s) from {}",
            "✓".green(),
            artifacts,
            manifest.display()
        ),
        ReloadEvent::Started { artifacts } => {
            println!("{} Host started with {} artifact(s)", "✓".green(), artifacts)
        }
        ReloadEvent::ReloadStarted {
            generation,
            artifacts,
        } => println!(
            "{} Reload #{} ({} artifact(s))",
            "→".cyan(),
            generation,
            artifacts
        ),
        ReloadEvent::ReloadCompleted {
            generation,
            duration,
            ..
        } => println!(
            "{} Reload #{} completed in {:?}",
            "✓".green(),
            generation,
            duration
        ),
        ReloadEvent::ReloadFailed { generation, error } => {
            println!("{} Reload #{} failed: {}", "✗".red(), generation, error)
        }
        ReloadEvent::Stopped => println!("{} Host stopped", "✓".green()),
        _ => {}
    }
}
