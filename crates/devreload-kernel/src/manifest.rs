//! Manifest reader contract

use std::path::{Path, PathBuf};

use crate::artifact::ArtifactDescriptor;

/// Errors raised while reading or parsing a manifest
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum ManifestError {
    #[error("Manifest not found: {0}")]
    NotFound(PathBuf),

    #[error("Failed to read manifest {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Unknown artifact category `{tag}` on line {line}")]
    UnknownCategory { line: usize, tag: String },

    #[error("Empty artifact location on line {line}")]
    EmptyLocation { line: usize },

    #[error("Location `{location}` on line {line} is not a local file URL")]
    InvalidLocation { line: usize, location: String },
}

impl ManifestError {
    /// Map an I/O error on `path`, folding `NotFound` into its own variant
    pub fn from_io(path: &Path, source: std::io::Error) -> Self {
        if source.kind() == std::io::ErrorKind::NotFound {
            Self::NotFound(path.to_path_buf())
        } else {
            Self::Io {
                path: path.to_path_buf(),
                source,
            }
        }
    }
}

/// Turns a manifest file into an ordered sequence of descriptors.
///
/// An empty manifest yields an empty sequence; the orchestrator treats that
/// exactly like an absent manifest.
pub trait ManifestReader: Send + Sync {
    fn read(&self, path: &Path) -> Result<Vec<ArtifactDescriptor>, ManifestError>;
}

impl<F> ManifestReader for F
where
    F: Fn(&Path) -> Result<Vec<ArtifactDescriptor>, ManifestError> + Send + Sync,
{
    fn read(&self, path: &Path) -> Result<Vec<ArtifactDescriptor>, ManifestError> {
        self(path)
    }
}
