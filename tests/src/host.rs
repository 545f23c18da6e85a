use std::io::Write;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use devreload_kernel::{
    ArtifactDescriptor, HostError, HostFramework, InvokerError, RegistrySerializer, ReloadInvoker,
};
use parking_lot::Mutex;

use crate::journal::{Call, CallLog};

/// A [`ReloadInvoker`] that records its calls, with failure injection
#[derive(Debug, Default)]
pub struct RecordingInvoker {
    log: CallLog,
    fail_deploy: AtomicBool,
    fail_undeploy: AtomicBool,
    fail_flush: AtomicBool,
    deploy_delay: Mutex<Option<Duration>>,
}

impl RecordingInvoker {
    pub fn new(log: CallLog) -> Self {
        Self {
            log,
            ..Self::default()
        }
    }

    pub fn fail_deploy(&self, fail: bool) {
        self.fail_deploy.store(fail, Ordering::SeqCst);
    }

    pub fn fail_undeploy(&self, fail: bool) {
        self.fail_undeploy.store(fail, Ordering::SeqCst);
    }

    pub fn fail_flush(&self, fail: bool) {
        self.fail_flush.store(fail, Ordering::SeqCst);
    }

    /// Sleep inside every deploy, widening race windows
    pub fn set_deploy_delay(&self, delay: Duration) {
        *self.deploy_delay.lock() = Some(delay);
    }
}

impl ReloadInvoker for RecordingInvoker {
    fn deploy(&self, artifacts: &[ArtifactDescriptor]) -> Result<(), InvokerError> {
        self.log.record(Call::Deploy(artifacts.to_vec()));
        if let Some(delay) = *self.deploy_delay.lock() {
            std::thread::sleep(delay);
        }
        if self.fail_deploy.load(Ordering::SeqCst) {
            return Err(InvokerError::Deploy("registry refused deploy".to_string()));
        }
        Ok(())
    }

    fn undeploy(&self, artifacts: &[ArtifactDescriptor]) -> Result<(), InvokerError> {
        self.log.record(Call::Undeploy(artifacts.to_vec()));
        if self.fail_undeploy.load(Ordering::SeqCst) {
            return Err(InvokerError::Undeploy(
                "registry refused undeploy".to_string(),
            ));
        }
        Ok(())
    }

    fn flush(&self) -> Result<(), InvokerError> {
        self.log.record(Call::Flush);
        if self.fail_flush.load(Ordering::SeqCst) {
            return Err(InvokerError::Flush("registry refused flush".to_string()));
        }
        Ok(())
    }
}

/// Host framework stub handing out a shared [`RecordingInvoker`]
#[derive(Debug)]
pub struct StubHost {
    log: CallLog,
    invoker: Arc<RecordingInvoker>,
    fail_start: bool,
    fail_bind: bool,
    registry_dump: Option<String>,
}

impl StubHost {
    pub fn new(log: CallLog) -> Self {
        Self {
            invoker: Arc::new(RecordingInvoker::new(log.clone())),
            log,
            fail_start: false,
            fail_bind: false,
            registry_dump: None,
        }
    }

    pub fn failing_start(mut self) -> Self {
        self.fail_start = true;
        self
    }

    pub fn failing_bind(mut self) -> Self {
        self.fail_bind = true;
        self
    }

    /// Offer a registry serializer writing `contents`
    pub fn with_registry_dump(mut self, contents: impl Into<String>) -> Self {
        self.registry_dump = Some(contents.into());
        self
    }

    pub fn invoker(&self) -> Arc<RecordingInvoker> {
        self.invoker.clone()
    }
}

impl HostFramework for StubHost {
    fn start(&self) -> Result<(), HostError> {
        self.log.record(Call::HostStart);
        if self.fail_start {
            return Err(HostError::Start("port already in use".to_string()));
        }
        Ok(())
    }

    fn stop(&self) -> Result<(), HostError> {
        self.log.record(Call::HostStop);
        Ok(())
    }

    fn bind_invoker(&self) -> Result<Arc<dyn ReloadInvoker>, InvokerError> {
        if self.fail_bind {
            return Err(InvokerError::Unavailable(
                "registry service not registered".to_string(),
            ));
        }
        Ok(self.invoker.clone())
    }

    fn registry_serializer(&self) -> Option<Arc<dyn RegistrySerializer>> {
        self.registry_dump
            .clone()
            .map(|dump| Arc::new(FixedDump(dump)) as Arc<dyn RegistrySerializer>)
    }
}

struct FixedDump(String);

impl RegistrySerializer for FixedDump {
    fn write_registry(&self, out: &mut dyn Write) -> std::io::Result<()> {
        out.write_all(self.0.as_bytes())
    }
}
