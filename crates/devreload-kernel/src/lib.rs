//! devreload kernel
//!
//! Data model and collaborator contracts shared by the reload orchestrator
//! and the hosts that embed it. Nothing in this crate performs a reload; it
//! only describes what gets reloaded and who is told about it.

// artifact module
pub mod artifact;
pub use artifact::*;

// manifest module
pub mod manifest;
pub use manifest::{ManifestError, ManifestReader};

// loading context module
pub mod context;
pub use context::{ContextError, LoadingContext};

// invoker module
pub mod invoker;
pub use invoker::{InvokerError, RegistrySerializer, ReloadInvoker};

// host module
pub mod host;
pub use host::{HostError, HostFramework};

// event module
pub mod event;
pub use event::ReloadEvent;

// lifecycle module
pub mod lifecycle;
pub use lifecycle::{OrchestratorState, ReloadFailurePolicy};

// config module
pub mod config;
pub use config::ReloadConfig;
