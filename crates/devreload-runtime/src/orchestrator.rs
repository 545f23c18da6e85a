//! Reload orchestrator
//!
//! Owns the manifest watermark, the active artifact set and the loading
//! context, and runs the reload protocol against the host's reload invoker:
//!
//! 1. undeploy the active set (if any)
//! 2. replace the active set with the new manifest generation
//! 3. reset the loading context, releasing the previous generation
//! 4. load archives, install auxiliary directories and resource fragments
//! 5. deploy the new set (if non-empty)
//! 6. flush, unconditionally
//!
//! Reloads are serialised: the context lock is held for the whole sequence,
//! whichever thread (scheduler or administrative caller) triggered it.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant, SystemTime};

use crossbeam_channel::Receiver;
use devreload_kernel::{
    ArtifactCategory, ArtifactDescriptor, ArtifactSet, HostFramework, LoadingContext,
    ManifestReader, OrchestratorState, PartitionedArtifacts, ReloadConfig, ReloadEvent,
    ReloadFailurePolicy, ReloadInvoker,
};
use error_stack::{Report, ResultExt};
use parking_lot::{Mutex, RwLock};
use tracing::{debug, error, info, warn};

use crate::error::{OrchestratorError, OrchestratorResult, ReloadError};
use crate::events::EventHub;
use crate::index::write_component_index;
use crate::manifest::{LineManifestReader, ManifestState, modified_time};
use crate::scheduler::PollScheduler;

/// Poll period of the background scheduler
pub const POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Result of checking the manifest
#[derive(Debug, Clone, PartialEq)]
pub enum TickOutcome {
    /// Manifest not modified since the last reload
    Unchanged,
    /// Manifest modified and reloaded
    Reloaded(ReloadReport),
}

/// Summary of a completed reload
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReloadReport {
    /// Reload sequence number, starting at 1
    pub generation: u64,
    /// Artifacts undeployed from the previous generation
    pub undeployed: usize,
    /// Artifacts deployed from the new generation
    pub deployed: usize,
    /// Archives loaded into the context
    pub archives: usize,
    /// Auxiliary directories installed
    pub auxiliary_directories: usize,
    /// Resource fragments installed
    pub resource_fragments: usize,
    /// Wall time of the reload sequence
    pub duration: Duration,
}

/// State shared between the orchestrator, its handles and the scheduler
struct Shared {
    reader: Arc<dyn ManifestReader>,
    manifest: Mutex<ManifestState>,
    // Held for the whole reload sequence.
    context: Mutex<Box<dyn LoadingContext>>,
    invoker: RwLock<Option<Arc<dyn ReloadInvoker>>>,
    active: RwLock<Option<ArtifactSet>>,
    state: RwLock<OrchestratorState>,
    generation: AtomicU64,
    policy: ReloadFailurePolicy,
    events: EventHub,
}

/// Restores the previous lifecycle state when a reload ends
struct PhaseGuard<'a> {
    state: &'a RwLock<OrchestratorState>,
    previous: OrchestratorState,
}

impl<'a> PhaseGuard<'a> {
    fn enter(state: &'a RwLock<OrchestratorState>, phase: OrchestratorState) -> Self {
        let previous = std::mem::replace(&mut *state.write(), phase);
        Self { state, previous }
    }
}

impl Drop for PhaseGuard<'_> {
    fn drop(&mut self) {
        let mut state = self.state.write();
        // stop() may have moved on while the reload ran
        if *state == OrchestratorState::Reloading {
            *state = self.previous;
        }
    }
}

impl Shared {
    fn current_artifacts(&self) -> Option<ArtifactSet> {
        self.active.read().clone()
    }

    /// Check the manifest and reload it when it changed
    fn poll_tick(&self) -> Result<TickOutcome, ReloadError> {
        let changed = self.manifest.lock().advance()?;
        self.reload_changed(changed)
    }

    fn reload_changed(&self, changed: Option<PathBuf>) -> Result<TickOutcome, ReloadError> {
        let Some(path) = changed else {
            return Ok(TickOutcome::Unchanged);
        };

        debug!("Manifest {:?} changed, reloading", path);
        let descriptors = self.reader.read(&path)?;
        self.reload(descriptors).map(TickOutcome::Reloaded)
    }

    /// [`Shared::poll_tick`], logging any failure
    fn poll_logged(&self) -> Result<TickOutcome, ReloadError> {
        let outcome = self.poll_tick();
        if let Err(e) = &outcome {
            error!("Failed to reload development artifacts: {}", e);
        }
        outcome
    }

    fn reset_manifest(&self, path: PathBuf) -> Result<TickOutcome, ReloadError> {
        info!("Resetting development manifest to {:?}", path);
        let outcome = self.forced_reload(path);
        if let Err(e) = &outcome {
            error!("Failed to reload development artifacts: {}", e);
        }
        outcome
    }

    /// Reload `path` whatever its modification time. A missing manifest is
    /// an error here, unlike on a poll tick.
    fn forced_reload(&self, path: PathBuf) -> Result<TickOutcome, ReloadError> {
        {
            let mut manifest = self.manifest.lock();
            manifest.repoint(&path);
            manifest.advance()?;
        }
        let descriptors = self.reader.read(&path)?;
        self.reload(descriptors).map(TickOutcome::Reloaded)
    }

    fn reload(&self, descriptors: Vec<ArtifactDescriptor>) -> Result<ReloadReport, ReloadError> {
        let mut context = self.context.lock();
        let invoker = self.invoker.read().clone().ok_or(ReloadError::NotBound)?;

        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let next = ArtifactSet::from_descriptors(descriptors);
        let artifacts = next.as_ref().map_or(0, |set| set.len());
        let _phase = PhaseGuard::enter(&self.state, OrchestratorState::Reloading);

        info!(generation, artifacts, "Reloading development artifacts");
        self.events.emit(ReloadEvent::ReloadStarted {
            generation,
            artifacts,
        });

        let started = Instant::now();
        match self.run_reload(&mut **context, invoker.as_ref(), next) {
            Ok(mut report) => {
                report.generation = generation;
                report.duration = started.elapsed();
                info!(
                    generation,
                    deployed = report.deployed,
                    undeployed = report.undeployed,
                    "Development artifacts reloaded in {:?}",
                    report.duration
                );
                self.events.emit(ReloadEvent::ReloadCompleted {
                    generation,
                    artifacts,
                    duration: report.duration,
                });
                Ok(report)
            }
            Err(e) => {
                self.events.emit(ReloadEvent::ReloadFailed {
                    generation,
                    error: e.to_string(),
                });
                Err(e)
            }
        }
    }

    /// Run the reload protocol. A failed undeploy leaves the previous
    /// generation in place and only flushes. Later failures never stop the
    /// sequence early: the first one is kept and reported once flush ran.
    fn run_reload(
        &self,
        context: &mut dyn LoadingContext,
        invoker: &dyn ReloadInvoker,
        next: Option<ArtifactSet>,
    ) -> Result<ReloadReport, ReloadError> {
        let mut report = ReloadReport::default();
        let mut failure: Option<ReloadError> = None;

        if let Some(previous) = self.current_artifacts() {
            debug!("Undeploying {} artifact(s)", previous.len());
            if let Err(e) = invoker.undeploy(previous.as_slice()) {
                warn!("Undeploy failed, keeping the previous artifacts: {}", e);
                if let Err(flush) = invoker.flush() {
                    warn!("Flush after failed undeploy failed: {}", flush);
                }
                return Err(ReloadError::Undeploy(e));
            }
            report.undeployed = previous.len();
        }

        // Replaced before deploy is confirmed; see ReloadFailurePolicy.
        *self.active.write() = next.clone();

        context.reset();

        let deployed = match rebuild_context(context, next.as_ref()) {
            Ok(partitioned) => {
                report.archives = partitioned.archives.len();
                report.auxiliary_directories = partitioned.auxiliary_directories.len();
                report.resource_fragments = partitioned.resource_fragments.len();
                match &next {
                    Some(set) => invoker
                        .deploy(set.as_slice())
                        .map(|()| set.len())
                        .map_err(ReloadError::Deploy),
                    None => Ok(0),
                }
            }
            Err(e) => {
                warn!("Loading context rebuild failed, skipping deploy: {}", e);
                Err(e)
            }
        };

        match deployed {
            Ok(count) => report.deployed = count,
            Err(e) => {
                if let ReloadError::Deploy(cause) = &e {
                    warn!("Deploy failed, registry may lag the loading context: {}", cause);
                }
                if self.policy == ReloadFailurePolicy::ClearOnDeployFailure {
                    *self.active.write() = None;
                }
                failure = failure.or(Some(e));
            }
        }

        if let Err(e) = invoker.flush() {
            failure = failure.or(Some(ReloadError::Flush(e)));
        }

        match failure {
            Some(e) => Err(e),
            None => Ok(report),
        }
    }
}

/// Partition the new set and rebuild the loading context from it
fn rebuild_context(
    context: &mut dyn LoadingContext,
    next: Option<&ArtifactSet>,
) -> Result<PartitionedArtifacts, ReloadError> {
    let partitioned = match next {
        Some(set) => set.partition()?,
        None => PartitionedArtifacts::default(),
    };
    context.load_archives(&partitioned.archives)?;
    context.install_auxiliary_directories(&partitioned.auxiliary_directories)?;
    context.install_resource_fragments(&partitioned.resource_fragments)?;
    Ok(partitioned)
}

/// Cloneable access to the reload operations, for administrative callers
/// running on their own threads
#[derive(Clone)]
pub struct ReloadHandle {
    shared: Arc<Shared>,
}

impl ReloadHandle {
    /// Reload from the current manifest location if it changed
    pub fn poll(&self) -> Result<TickOutcome, ReloadError> {
        self.shared.poll_logged()
    }

    /// Repoint the manifest, forget the watermark and reload immediately
    pub fn reset_manifest(&self, path: impl Into<PathBuf>) -> Result<TickOutcome, ReloadError> {
        self.shared.reset_manifest(path.into())
    }

    /// Snapshot of the active artifact set; `None` when nothing is loaded
    pub fn current_artifacts(&self) -> Option<ArtifactSet> {
        self.shared.current_artifacts()
    }

    pub fn manifest_location(&self) -> PathBuf {
        self.shared.manifest.lock().file().to_path_buf()
    }

    pub fn watermark(&self) -> SystemTime {
        self.shared.manifest.lock().watermark()
    }

    pub fn state(&self) -> OrchestratorState {
        *self.shared.state.read()
    }
}

impl std::fmt::Debug for ReloadHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReloadHandle")
            .field("manifest", &self.manifest_location())
            .field("state", &self.state())
            .finish()
    }
}

/// Development hot-reload orchestrator
pub struct ReloadOrchestrator {
    config: ReloadConfig,
    host: Arc<dyn HostFramework>,
    shared: Arc<Shared>,
    scheduler: Option<PollScheduler>,
}

impl ReloadOrchestrator {
    /// Create an orchestrator reading the line-oriented manifest format
    pub fn new(
        config: ReloadConfig,
        host: Arc<dyn HostFramework>,
        context: Box<dyn LoadingContext>,
    ) -> Self {
        Self::with_reader(config, host, context, Arc::new(LineManifestReader::new()))
    }

    /// Create an orchestrator with a custom manifest reader
    pub fn with_reader(
        config: ReloadConfig,
        host: Arc<dyn HostFramework>,
        context: Box<dyn LoadingContext>,
        reader: Arc<dyn ManifestReader>,
    ) -> Self {
        let shared = Arc::new(Shared {
            reader,
            manifest: Mutex::new(ManifestState::new(config.manifest_path())),
            context: Mutex::new(context),
            invoker: RwLock::new(None),
            active: RwLock::new(None),
            state: RwLock::new(OrchestratorState::Stopped),
            generation: AtomicU64::new(0),
            policy: config.failure_policy,
            events: EventHub::default(),
        });

        Self {
            config,
            host,
            shared,
            scheduler: None,
        }
    }

    pub fn config(&self) -> &ReloadConfig {
        &self.config
    }

    pub fn handle(&self) -> ReloadHandle {
        ReloadHandle {
            shared: self.shared.clone(),
        }
    }

    pub fn state(&self) -> OrchestratorState {
        *self.shared.state.read()
    }

    /// Subscribe to reload events
    pub fn subscribe(&self) -> Receiver<ReloadEvent> {
        self.shared.events.subscribe()
    }

    /// Whether the background poll scheduler is installed
    pub fn is_polling(&self) -> bool {
        self.scheduler.is_some()
    }

    /// Reload from the current manifest location if it changed
    pub fn poll(&self) -> Result<TickOutcome, ReloadError> {
        self.shared.poll_logged()
    }

    /// Repoint the manifest, forget the watermark and reload immediately
    pub fn reset_manifest(&self, path: impl Into<PathBuf>) -> Result<TickOutcome, ReloadError> {
        self.shared.reset_manifest(path.into())
    }

    /// Snapshot of the active artifact set; `None` when nothing is loaded
    pub fn current_artifacts(&self) -> Option<ArtifactSet> {
        self.shared.current_artifacts()
    }

    pub fn manifest_location(&self) -> PathBuf {
        self.shared.manifest.lock().file().to_path_buf()
    }

    pub fn watermark(&self) -> SystemTime {
        self.shared.manifest.lock().watermark()
    }

    fn invalid_state(&self, operation: &'static str) -> Report<OrchestratorError> {
        Report::new(OrchestratorError::InvalidState {
            operation,
            state: self.state(),
        })
    }

    /// Load the development archives before the host framework starts.
    ///
    /// A missing, unreadable or empty manifest leaves nothing loaded and the
    /// loading context untouched. Archives that fail to load are logged and
    /// stay in the active set, so the next reload retries them.
    pub fn preload(&mut self) -> OrchestratorResult<()> {
        if self.state() != OrchestratorState::Stopped {
            return Err(self.invalid_state("preload"));
        }

        let path = self.manifest_location();
        let descriptors = self.read_initial_manifest(&path);
        let set = ArtifactSet::from_descriptors(descriptors);

        if let Some(set) = &set {
            let mut context = self.shared.context.lock();
            context.reset();
            let loaded = set.partition().map_err(ReloadError::from).and_then(|partitioned| {
                context.load_archives(&partitioned.archives)?;
                Ok(partitioned.archives.len())
            });
            match loaded {
                Ok(count) => info!(
                    "Preloaded {} development archive(s) from {:?}",
                    count, path
                ),
                // Missing or unbuilt archives must not keep the host down.
                Err(e) => warn!("Development archives from {:?} not preloaded: {}", path, e),
            }
        }

        let artifacts = set.as_ref().map_or(0, |s| s.len());
        *self.shared.active.write() = set;
        *self.shared.state.write() = OrchestratorState::Preloaded;
        self.shared.events.emit(ReloadEvent::Preloaded {
            manifest: path,
            artifacts,
        });
        Ok(())
    }

    fn read_initial_manifest(&self, path: &Path) -> Vec<ArtifactDescriptor> {
        if !path.is_file() {
            debug!("No development manifest at {:?}", path);
            return Vec::new();
        }

        match modified_time(path) {
            Ok(modified) => self.shared.manifest.lock().observe(modified),
            Err(e) => {
                warn!("Ignoring development manifest: {}", e);
                return Vec::new();
            }
        }

        self.shared.reader.read(path).unwrap_or_else(|e| {
            warn!("Ignoring development manifest: {}", e);
            Vec::new()
        })
    }

    /// Start the orchestrator together with the host framework.
    ///
    /// Preloads (unless already preloaded), starts the host framework, binds
    /// the reload invoker, writes the component index, deploys the preloaded
    /// artifacts, flushes, and installs the poll scheduler when enabled.
    pub fn start(&mut self) -> OrchestratorResult<()> {
        match self.state() {
            OrchestratorState::Stopped => self.preload()?,
            OrchestratorState::Preloaded => {}
            _ => return Err(self.invalid_state("start")),
        }

        self.host
            .start()
            .change_context(OrchestratorError::HostStart)?;
        let invoker = match self.host.bind_invoker() {
            Ok(invoker) => invoker,
            Err(e) => {
                let mut report = Report::new(e).change_context(OrchestratorError::Bind);
                if let Err(stop) = self.host.stop() {
                    report = report.attach(format!("host framework not stopped: {stop}"));
                }
                return Err(report);
            }
        };
        *self.shared.invoker.write() = Some(invoker.clone());

        self.write_component_index();

        let active = self.shared.current_artifacts();
        {
            let mut context = self.shared.context.lock();
            if let Some(set) = &active {
                install_retained(&mut **context, set);
                if let Err(e) = invoker.deploy(set.as_slice()) {
                    error!("Initial deploy of development artifacts failed: {}", e);
                }
            }
            if let Err(e) = invoker.flush() {
                error!("Initial flush failed: {}", e);
            }
        }

        *self.shared.state.write() = OrchestratorState::Running;

        if self.config.install_reload_timer {
            let shared = self.shared.clone();
            let scheduler = PollScheduler::spawn(POLL_INTERVAL, move || {
                let _ = shared.poll_logged();
            })
            .change_context(OrchestratorError::Scheduler)?;
            self.scheduler = Some(scheduler);
        }

        let artifacts = active.as_ref().map_or(0, |s| s.len());
        self.shared
            .events
            .emit(ReloadEvent::Started { artifacts });
        info!(
            artifacts,
            polling = self.config.install_reload_timer,
            "Development reload orchestrator started"
        );
        Ok(())
    }

    /// Cancel the poll scheduler and stop the host framework
    pub fn stop(&mut self) -> OrchestratorResult<()> {
        if self.state() != OrchestratorState::Running {
            return Err(self.invalid_state("stop"));
        }
        *self.shared.state.write() = OrchestratorState::Stopping;

        if let Some(scheduler) = self.scheduler.take() {
            scheduler.cancel();
        }

        *self.shared.invoker.write() = None;
        let stopped = self
            .host
            .stop()
            .change_context(OrchestratorError::HostStop);

        *self.shared.state.write() = OrchestratorState::Stopped;
        self.shared.events.emit(ReloadEvent::Stopped);
        info!("Development reload orchestrator stopped");
        stopped
    }

    fn write_component_index(&self) {
        let Some(serializer) = self.host.registry_serializer() else {
            return;
        };
        let path = self.config.component_index_path();
        match write_component_index(serializer.as_ref(), &path) {
            Ok(()) => debug!("Component index written to {:?}", path),
            Err(e) => debug!("Component index not written: {}", e),
        }
    }
}

impl std::fmt::Debug for ReloadOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReloadOrchestrator")
            .field("config", &self.config)
            .field("state", &self.state())
            .field("polling", &self.is_polling())
            .finish()
    }
}

/// Install the auxiliary directories and resource fragments held back at
/// preload
fn install_retained(context: &mut dyn LoadingContext, set: &ArtifactSet) {
    if set.count(ArtifactCategory::AuxiliaryDirectory) == 0
        && set.count(ArtifactCategory::ResourceFragment) == 0
    {
        return;
    }

    let partitioned = match set.partition() {
        Ok(p) => p,
        Err(e) => {
            warn!("Skipping development directories: {}", e);
            return;
        }
    };
    if let Err(e) = context.install_auxiliary_directories(&partitioned.auxiliary_directories) {
        warn!("Failed to install auxiliary directories: {}", e);
    }
    if let Err(e) = context.install_resource_fragments(&partitioned.resource_fragments) {
        warn!("Failed to install resource fragments: {}", e);
    }
}
