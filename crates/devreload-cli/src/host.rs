//! Console host
//!
//! Stand-in host framework for `devreload run`: its component registry is an
//! in-memory list of deployed artifacts, and every registry call is printed.

use std::io::Write;
use std::sync::Arc;

use colored::Colorize;
use devreload_kernel::{
    ArtifactDescriptor, HostError, HostFramework, InvokerError, RegistrySerializer, ReloadInvoker,
};
use devreload_runtime::CallbackInvoker;
use parking_lot::Mutex;
use tracing::debug;

type Registry = Arc<Mutex<Vec<ArtifactDescriptor>>>;

#[derive(Debug, Default)]
pub struct ConsoleHost {
    registry: Registry,
}

impl ConsoleHost {
    pub fn new() -> Self {
        Self::default()
    }
}

impl HostFramework for ConsoleHost {
    fn start(&self) -> Result<(), HostError> {
        debug!("Console host started");
        Ok(())
    }

    fn stop(&self) -> Result<(), HostError> {
        self.registry.lock().clear();
        debug!("Console host stopped");
        Ok(())
    }

    fn bind_invoker(&self) -> Result<Arc<dyn ReloadInvoker>, InvokerError> {
        let deploy = self.registry.clone();
        let undeploy = self.registry.clone();
        let flush = self.registry.clone();

        let invoker = CallbackInvoker::new()
            .on_deploy(move |artifacts| {
                for artifact in artifacts {
                    println!("  {} {}", "+".green(), artifact);
                }
                deploy.lock().extend_from_slice(artifacts);
                Ok(())
            })
            .on_undeploy(move |artifacts| {
                let mut registry = undeploy.lock();
                for artifact in artifacts {
                    println!("  {} {}", "-".red(), artifact);
                    registry.retain(|deployed| deployed != artifact);
                }
                Ok(())
            })
            .on_flush(move || {
                println!(
                    "  {} registry flushed ({} deployed)",
                    "↻".cyan(),
                    flush.lock().len()
                );
                Ok(())
            });

        Ok(Arc::new(invoker))
    }

    fn registry_serializer(&self) -> Option<Arc<dyn RegistrySerializer>> {
        Some(Arc::new(RegistryDump(self.registry.clone())))
    }
}

/// Writes the deployed artifacts as a JSON array
struct RegistryDump(Registry);

impl RegistrySerializer for RegistryDump {
    fn write_registry(&self, out: &mut dyn Write) -> std::io::Result<()> {
        let deployed = self.0.lock();
        serde_json::to_writer_pretty(&mut *out, &*deployed)?;
        writeln!(out)
    }
}
