//! Host framework contract
//!
//! The orchestrator wraps the host framework's own start/stop sequence. The
//! registry-facing capabilities only exist once the framework has started,
//! so they are looked up through this trait rather than passed in up front.

use std::sync::Arc;

use crate::invoker::{InvokerError, RegistrySerializer, ReloadInvoker};

/// Host framework failure
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum HostError {
    #[error("Host framework failed to start: {0}")]
    Start(String),

    #[error("Host framework failed to stop: {0}")]
    Stop(String),
}

/// The host framework the orchestrator is embedded in
pub trait HostFramework: Send + Sync {
    fn start(&self) -> Result<(), HostError>;

    fn stop(&self) -> Result<(), HostError>;

    /// Resolve the reload invoker. Called once, after [`HostFramework::start`].
    fn bind_invoker(&self) -> Result<Arc<dyn ReloadInvoker>, InvokerError>;

    /// Registry serialization capability, when the host offers one
    fn registry_serializer(&self) -> Option<Arc<dyn RegistrySerializer>> {
        None
    }
}
