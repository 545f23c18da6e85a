//! Reload events published by the orchestrator

use std::path::PathBuf;
use std::time::Duration;

/// Reload lifecycle event
#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum ReloadEvent {
    /// Preload finished with this many descriptors
    Preloaded { manifest: PathBuf, artifacts: usize },
    /// Host started and initial deploy attempted
    Started { artifacts: usize },
    /// Reload sequence entered
    ReloadStarted { generation: u64, artifacts: usize },
    /// Reload sequence finished without error
    ReloadCompleted {
        generation: u64,
        artifacts: usize,
        duration: Duration,
    },
    /// Reload sequence aborted or reported an error
    ReloadFailed { generation: u64, error: String },
    /// Orchestrator stopped
    Stopped,
}
