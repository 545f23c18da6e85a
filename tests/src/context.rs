use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use devreload_kernel::{ContextError, LoadingContext};
use url::Url;

use crate::journal::{Call, CallLog};

/// A [`LoadingContext`] that records its calls instead of loading anything.
///
/// Archive loading can be made to fail through the switch returned by
/// [`RecordingContext::archive_failure`], which stays usable after the
/// context is boxed into an orchestrator.
#[derive(Debug, Clone)]
pub struct RecordingContext {
    log: CallLog,
    fail_archives: Arc<AtomicBool>,
}

impl RecordingContext {
    pub fn new(log: CallLog) -> Self {
        Self {
            log,
            fail_archives: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn archive_failure(&self) -> Arc<AtomicBool> {
        self.fail_archives.clone()
    }
}

impl LoadingContext for RecordingContext {
    fn reset(&mut self) {
        self.log.record(Call::Reset);
    }

    fn load_archives(&mut self, locations: &[Url]) -> Result<(), ContextError> {
        self.log.record(Call::LoadArchives(locations.to_vec()));
        if self.fail_archives.load(Ordering::SeqCst) {
            return Err(ContextError::Other("archive rejected".to_string()));
        }
        Ok(())
    }

    fn install_auxiliary_directories(
        &mut self,
        directories: &[PathBuf],
    ) -> Result<(), ContextError> {
        self.log.record(Call::InstallAuxiliary(directories.to_vec()));
        Ok(())
    }

    fn install_resource_fragments(
        &mut self,
        directories: &[PathBuf],
    ) -> Result<(), ContextError> {
        self.log.record(Call::InstallFragments(directories.to_vec()));
        Ok(())
    }
}
