//! Loading context contract
//!
//! The loading context is the isolated scope the development artifacts are
//! loaded into. The orchestrator only ever rebuilds it from scratch: one
//! [`LoadingContext::reset`] followed by the three populate operations.

use std::path::PathBuf;
use url::Url;

/// Errors raised by a loading context
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum ContextError {
    #[error("Artifact location cannot be resolved: {}", .0.display())]
    UnresolvableLocation(PathBuf),

    #[error("Unsupported archive location: {0}")]
    UnsupportedLocation(Url),

    #[error("Failed to load archive {location}: {reason}")]
    ArchiveLoad { location: Url, reason: String },

    #[error("Directory not found: {}", .0.display())]
    MissingDirectory(PathBuf),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

/// Isolated code-loading scope.
///
/// `Send` so it can move to whichever thread runs a reload; the orchestrator
/// serialises every access.
pub trait LoadingContext: Send {
    /// Drop everything previously loaded or installed
    fn reset(&mut self);

    /// Load the given archive locations, in order
    fn load_archives(&mut self, locations: &[Url]) -> Result<(), ContextError>;

    /// Install directories of interpretable units
    fn install_auxiliary_directories(
        &mut self,
        directories: &[PathBuf],
    ) -> Result<(), ContextError>;

    /// Install resource-override directories; later entries win
    fn install_resource_fragments(&mut self, directories: &[PathBuf]) -> Result<(), ContextError>;
}
