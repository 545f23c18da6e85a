// =============================================================================
// devreload Runtime - Manifest Polling and Hot-Reload Orchestration
// =============================================================================
//
// This crate drives development-mode reloads. It depends only on the kernel
// layer for the artifact model and the collaborator contracts.
//
// Main Components:
// - ReloadOrchestrator: preload/start/stop lifecycle and the reload protocol
// - ReloadHandle: poll and manual reset from administrative threads
// - PollScheduler: fixed-period background poll thread
// - LineManifestReader: line-oriented manifest format
// - LibraryContext: loading context backed by dynamic libraries
// - CallbackInvoker: in-process reload invoker
//
// =============================================================================

pub mod context;
pub mod error;
mod events;
pub mod index;
pub mod invoker;
pub mod manifest;
pub mod orchestrator;
pub mod scheduler;

pub use context::{InstalledDirectory, LibraryContext, LoadedArchive};
pub use error::{OrchestratorError, OrchestratorResult, ReloadError};
pub use index::write_component_index;
pub use invoker::CallbackInvoker;
pub use manifest::{LineManifestReader, ManifestState};
pub use orchestrator::{POLL_INTERVAL, ReloadHandle, ReloadOrchestrator, ReloadReport, TickOutcome};
pub use scheduler::PollScheduler;

// =============================================================================
// Re-exports from Kernel
// =============================================================================

pub use devreload_kernel::{
    ArtifactCategory, ArtifactDescriptor, ArtifactSet, HostFramework, LoadingContext,
    ManifestReader, OrchestratorState, ReloadConfig, ReloadEvent, ReloadFailurePolicy,
    ReloadInvoker,
};
