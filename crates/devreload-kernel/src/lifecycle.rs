//! Orchestrator lifecycle states and reload failure policy

use serde::{Deserialize, Serialize};
use std::fmt;

/// Orchestrator lifecycle state
///
/// `Stopped → Preloaded → Running ⇄ Reloading → Stopping → Stopped`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum OrchestratorState {
    #[default]
    Stopped,
    Preloaded,
    Running,
    Reloading,
    Stopping,
}

impl fmt::Display for OrchestratorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Stopped => "Stopped",
            Self::Preloaded => "Preloaded",
            Self::Running => "Running",
            Self::Reloading => "Reloading",
            Self::Stopping => "Stopping",
        };
        f.write_str(name)
    }
}

/// What happens to the active artifact set when the new set was not deployed,
/// either because deploy failed or because the loading context could not be
/// rebuilt and deploy was skipped.
///
/// The set is always replaced before deploy is attempted. Neither policy
/// rolls back the loading context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReloadFailurePolicy {
    /// Keep the new descriptors as the active set; the registry is the
    /// source of truth for what is live
    #[default]
    Optimistic,
    /// Forget the new descriptors so the next reload does not undeploy
    /// artifacts that were never activated
    ClearOnDeployFailure,
}
