//! Runtime error types
//!
//! [`ReloadError`] is returned by every reload trigger and only ever logged
//! by the scheduler. [`OrchestratorError`] is the context of the
//! [`error_stack::Report`]s surfaced by the lifecycle operations, the only
//! failures that propagate to the host.

use devreload_kernel::{ContextError, InvokerError, ManifestError, OrchestratorState};

/// Reload failure
#[derive(Debug, thiserror::Error)]
pub enum ReloadError {
    #[error("Manifest error: {0}")]
    Manifest(#[from] ManifestError),

    #[error("Loading context error: {0}")]
    Context(#[from] ContextError),

    #[error("Undeploy of previous artifacts failed: {0}")]
    Undeploy(InvokerError),

    #[error("Deploy of new artifacts failed: {0}")]
    Deploy(InvokerError),

    #[error("Flush failed: {0}")]
    Flush(InvokerError),

    #[error("Reload invoker not bound; orchestrator has not started")]
    NotBound,
}

/// Lifecycle failure
#[derive(Debug, thiserror::Error)]
pub enum OrchestratorError {
    #[error("Host framework failed to start")]
    HostStart,

    #[error("Binding the reload invoker failed")]
    Bind,

    #[error("Host framework failed to stop")]
    HostStop,

    #[error("Failed to install the poll scheduler")]
    Scheduler,

    #[error("Cannot {operation} while {state}")]
    InvalidState {
        operation: &'static str,
        state: OrchestratorState,
    },
}

/// Result type of the lifecycle operations
pub type OrchestratorResult<T> = Result<T, error_stack::Report<OrchestratorError>>;
