//! Artifact descriptors and artifact sets
//!
//! One manifest line becomes one [`ArtifactDescriptor`]. The orchestrator
//! keeps the descriptors of the current manifest generation as an
//! [`ArtifactSet`] and hands its [`PartitionedArtifacts`] to the loading
//! context on every rebuild.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Deref;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use url::Url;

use crate::context::ContextError;

/// Artifact category, fixed when the manifest line is parsed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactCategory {
    /// Compiled archive loaded into the loading context
    Archive,
    /// Directory of interpretable source/config units
    AuxiliaryDirectory,
    /// Directory contributing localized resource overrides
    ResourceFragment,
}

impl ArtifactCategory {
    /// Canonical manifest tag
    pub fn tag(&self) -> &'static str {
        match self {
            Self::Archive => "archive",
            Self::AuxiliaryDirectory => "scripts",
            Self::ResourceFragment => "resources",
        }
    }

    /// Resolve a manifest tag, case-insensitively.
    ///
    /// Besides the canonical tags, the legacy `bundle`, `library`, `seam` and
    /// `resourceBundleFragment` spellings are accepted.
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag.to_ascii_lowercase().as_str() {
            "archive" | "bundle" | "library" => Some(Self::Archive),
            "scripts" | "seam" => Some(Self::AuxiliaryDirectory),
            "resources" | "resourcebundlefragment" => Some(Self::ResourceFragment),
            _ => None,
        }
    }

    /// Whether descriptors of this category go through `load_archives`
    pub fn is_archive(&self) -> bool {
        matches!(self, Self::Archive)
    }
}

impl fmt::Display for ArtifactCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// One parsed manifest entry
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ArtifactDescriptor {
    category: ArtifactCategory,
    location: PathBuf,
}

impl ArtifactDescriptor {
    /// Create a new descriptor
    pub fn new(category: ArtifactCategory, location: impl Into<PathBuf>) -> Self {
        Self {
            category,
            location: location.into(),
        }
    }

    /// Archive descriptor
    pub fn archive(location: impl Into<PathBuf>) -> Self {
        Self::new(ArtifactCategory::Archive, location)
    }

    /// Auxiliary directory descriptor
    pub fn auxiliary_directory(location: impl Into<PathBuf>) -> Self {
        Self::new(ArtifactCategory::AuxiliaryDirectory, location)
    }

    /// Resource fragment descriptor
    pub fn resource_fragment(location: impl Into<PathBuf>) -> Self {
        Self::new(ArtifactCategory::ResourceFragment, location)
    }

    pub fn category(&self) -> ArtifactCategory {
        self.category
    }

    pub fn location(&self) -> &Path {
        &self.location
    }

    /// `file://` URL of the location.
    ///
    /// Fails with [`ContextError::UnresolvableLocation`] when the location is
    /// not absolute.
    pub fn url(&self) -> Result<Url, ContextError> {
        Url::from_file_path(&self.location)
            .map_err(|_| ContextError::UnresolvableLocation(self.location.clone()))
    }
}

impl fmt::Display for ArtifactDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.category, self.location.display())
    }
}

/// Descriptors split by the loading-context operation that consumes them
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PartitionedArtifacts {
    /// Archive locations, in manifest order
    pub archives: Vec<Url>,
    /// Auxiliary directories, in manifest order
    pub auxiliary_directories: Vec<PathBuf>,
    /// Resource fragment directories, in manifest order
    pub resource_fragments: Vec<PathBuf>,
}

impl PartitionedArtifacts {
    pub fn is_empty(&self) -> bool {
        self.archives.is_empty()
            && self.auxiliary_directories.is_empty()
            && self.resource_fragments.is_empty()
    }
}

/// Immutable, cheaply clonable snapshot of one manifest generation.
///
/// Never empty: an empty manifest is represented by the absence of a set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactSet {
    descriptors: Arc<[ArtifactDescriptor]>,
}

impl ArtifactSet {
    /// Build a set, returning `None` for an empty descriptor list
    pub fn from_descriptors(descriptors: Vec<ArtifactDescriptor>) -> Option<Self> {
        if descriptors.is_empty() {
            None
        } else {
            Some(Self {
                descriptors: descriptors.into(),
            })
        }
    }

    pub fn as_slice(&self) -> &[ArtifactDescriptor] {
        &self.descriptors
    }

    /// Number of descriptors in the given category
    pub fn count(&self, category: ArtifactCategory) -> usize {
        self.descriptors
            .iter()
            .filter(|d| d.category == category)
            .count()
    }

    /// Split the set by category, resolving archive locations to URLs
    pub fn partition(&self) -> Result<PartitionedArtifacts, ContextError> {
        let mut partitioned = PartitionedArtifacts::default();
        for descriptor in self.descriptors.iter() {
            match descriptor.category {
                ArtifactCategory::Archive => partitioned.archives.push(descriptor.url()?),
                ArtifactCategory::AuxiliaryDirectory => partitioned
                    .auxiliary_directories
                    .push(descriptor.location.clone()),
                ArtifactCategory::ResourceFragment => partitioned
                    .resource_fragments
                    .push(descriptor.location.clone()),
            }
        }
        Ok(partitioned)
    }
}

impl Deref for ArtifactSet {
    type Target = [ArtifactDescriptor];

    fn deref(&self) -> &Self::Target {
        &self.descriptors
    }
}
