//! Reload invoker adapters

use devreload_kernel::{ArtifactDescriptor, InvokerError, ReloadInvoker};

type ArtifactsFn = Box<dyn Fn(&[ArtifactDescriptor]) -> Result<(), InvokerError> + Send + Sync>;
type FlushFn = Box<dyn Fn() -> Result<(), InvokerError> + Send + Sync>;

/// Adapts plain functions into a [`ReloadInvoker`].
///
/// Hosts whose component registry lives in the same process bind their
/// registry calls here. Unset operations succeed without doing anything.
#[derive(Default)]
pub struct CallbackInvoker {
    deploy: Option<ArtifactsFn>,
    undeploy: Option<ArtifactsFn>,
    flush: Option<FlushFn>,
}

impl CallbackInvoker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_deploy<F>(mut self, f: F) -> Self
    where
        F: Fn(&[ArtifactDescriptor]) -> Result<(), InvokerError> + Send + Sync + 'static,
    {
        self.deploy = Some(Box::new(f));
        self
    }

    pub fn on_undeploy<F>(mut self, f: F) -> Self
    where
        F: Fn(&[ArtifactDescriptor]) -> Result<(), InvokerError> + Send + Sync + 'static,
    {
        self.undeploy = Some(Box::new(f));
        self
    }

    pub fn on_flush<F>(mut self, f: F) -> Self
    where
        F: Fn() -> Result<(), InvokerError> + Send + Sync + 'static,
    {
        self.flush = Some(Box::new(f));
        self
    }
}

impl std::fmt::Debug for CallbackInvoker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CallbackInvoker")
            .field("deploy", &self.deploy.is_some())
            .field("undeploy", &self.undeploy.is_some())
            .field("flush", &self.flush.is_some())
            .finish()
    }
}

impl ReloadInvoker for CallbackInvoker {
    fn deploy(&self, artifacts: &[ArtifactDescriptor]) -> Result<(), InvokerError> {
        self.deploy.as_ref().map_or(Ok(()), |f| f(artifacts))
    }

    fn undeploy(&self, artifacts: &[ArtifactDescriptor]) -> Result<(), InvokerError> {
        self.undeploy.as_ref().map_or(Ok(()), |f| f(artifacts))
    }

    fn flush(&self) -> Result<(), InvokerError> {
        self.flush.as_ref().map_or(Ok(()), |f| f())
    }
}
