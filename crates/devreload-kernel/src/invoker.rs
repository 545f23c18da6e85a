//! Reload invoker contract
//!
//! The invoker is the narrow bridge into the live component registry. The
//! host resolves it once, after its own framework has started, and the
//! orchestrator depends on nothing else of the registry.

use crate::artifact::ArtifactDescriptor;

/// Errors raised while talking to the component registry
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum InvokerError {
    #[error("Hot deploy failed: {0}")]
    Deploy(String),

    #[error("Hot undeploy failed: {0}")]
    Undeploy(String),

    #[error("Registry flush failed: {0}")]
    Flush(String),

    #[error("Reload service unavailable: {0}")]
    Unavailable(String),
}

/// Hot-deploy bridge into the component registry
pub trait ReloadInvoker: Send + Sync {
    /// Activate the given artifacts in the registry
    fn deploy(&self, artifacts: &[ArtifactDescriptor]) -> Result<(), InvokerError>;

    /// Retire the given artifacts from the registry
    fn undeploy(&self, artifacts: &[ArtifactDescriptor]) -> Result<(), InvokerError>;

    /// Make the registry's view consistent after a deploy/undeploy cycle
    fn flush(&self) -> Result<(), InvokerError>;
}

/// Dumps the registry contents, used for the diagnostic component index
pub trait RegistrySerializer: Send + Sync {
    fn write_registry(&self, out: &mut dyn std::io::Write) -> std::io::Result<()>;
}
