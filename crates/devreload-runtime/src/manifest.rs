//! Line-oriented manifest reader and manifest watermark
//!
//! Manifest syntax, one artifact per line:
//!
//! ```text
//! # comment
//! /abs/path/libcore_ext.so            archive (no tag)
//! bundle:target/debug/libwidgets.so   archive, relative to the manifest
//! scripts:/work/app/scripts           auxiliary directory
//! resources:/work/app/i18n            resource fragment
//! file:///opt/dev/libextra.so         archive given as a file URL
//! ```

use std::path::{Path, PathBuf};
use std::time::SystemTime;

use devreload_kernel::{ArtifactCategory, ArtifactDescriptor, ManifestError, ManifestReader};
use tracing::debug;
use url::Url;

/// Reads the line-oriented manifest format
#[derive(Debug, Clone, Copy, Default)]
pub struct LineManifestReader;

impl LineManifestReader {
    pub fn new() -> Self {
        Self
    }

    /// Parse manifest content; relative locations resolve against `base`
    pub fn parse(content: &str, base: &Path) -> Result<Vec<ArtifactDescriptor>, ManifestError> {
        let mut descriptors = Vec::new();

        for (index, raw) in content.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let line_no = index + 1;

            let (category, location) = match split_tag(line) {
                Some((tag, rest)) => {
                    let category = ArtifactCategory::from_tag(tag).ok_or_else(|| {
                        ManifestError::UnknownCategory {
                            line: line_no,
                            tag: tag.to_string(),
                        }
                    })?;
                    (category, rest.trim())
                }
                None => (ArtifactCategory::Archive, line),
            };

            if location.is_empty() {
                return Err(ManifestError::EmptyLocation { line: line_no });
            }

            let location = match file_url_path(location) {
                Some(path) => path.ok_or_else(|| ManifestError::InvalidLocation {
                    line: line_no,
                    location: location.to_string(),
                })?,
                None if Path::new(location).is_absolute() => PathBuf::from(location),
                None => base.join(location),
            };

            descriptors.push(ArtifactDescriptor::new(category, location));
        }

        Ok(descriptors)
    }
}

/// Path of a `file:` URL location. `Some(None)` when the URL does not name a
/// local file.
fn file_url_path(location: &str) -> Option<Option<PathBuf>> {
    if !is_file_scheme(location) {
        return None;
    }
    Some(
        Url::parse(location)
            .ok()
            .and_then(|url| url.to_file_path().ok()),
    )
}

fn is_file_scheme(location: &str) -> bool {
    location
        .get(..5)
        .is_some_and(|scheme| scheme.eq_ignore_ascii_case("file:"))
}

/// Split `tag:rest`. Single-letter prefixes are drive names and `file:` is
/// a URL scheme, neither is a tag.
fn split_tag(line: &str) -> Option<(&str, &str)> {
    if is_file_scheme(line) {
        return None;
    }
    let (tag, rest) = line.split_once(':')?;
    if tag.len() > 1 && tag.chars().all(|c| c.is_ascii_alphabetic()) {
        Some((tag, rest))
    } else {
        None
    }
}

impl ManifestReader for LineManifestReader {
    fn read(&self, path: &Path) -> Result<Vec<ArtifactDescriptor>, ManifestError> {
        let content =
            std::fs::read_to_string(path).map_err(|e| ManifestError::from_io(path, e))?;
        let base = path.parent().unwrap_or_else(|| Path::new("."));
        let descriptors = Self::parse(&content, base)?;
        debug!("Parsed {} artifact(s) from {:?}", descriptors.len(), path);
        Ok(descriptors)
    }
}

/// Modification time of `path`
pub fn modified_time(path: &Path) -> Result<SystemTime, ManifestError> {
    std::fs::metadata(path)
        .and_then(|m| m.modified())
        .map_err(|e| ManifestError::from_io(path, e))
}

/// Manifest location plus the last modification time acted upon
#[derive(Debug, Clone)]
pub struct ManifestState {
    file: PathBuf,
    watermark: SystemTime,
}

impl ManifestState {
    pub fn new(file: impl Into<PathBuf>) -> Self {
        Self {
            file: file.into(),
            watermark: SystemTime::UNIX_EPOCH,
        }
    }

    pub fn file(&self) -> &Path {
        &self.file
    }

    pub fn watermark(&self) -> SystemTime {
        self.watermark
    }

    /// Record `time` as acted upon. The watermark never moves backwards.
    pub fn observe(&mut self, time: SystemTime) {
        if time > self.watermark {
            self.watermark = time;
        }
    }

    /// Point at another manifest and forget the watermark
    pub fn repoint(&mut self, file: impl Into<PathBuf>) {
        self.file = file.into();
        self.watermark = SystemTime::UNIX_EPOCH;
    }

    /// Check the manifest for a change.
    ///
    /// Returns the manifest path when its modification time is newer than
    /// the watermark, advancing the watermark first so a failing reload is
    /// not retried until the next real change. Returns `None` when nothing
    /// changed. A missing manifest counts as never modified.
    pub fn advance(&mut self) -> Result<Option<PathBuf>, ManifestError> {
        let modified = match modified_time(&self.file) {
            Ok(modified) => modified,
            Err(ManifestError::NotFound(_)) => SystemTime::UNIX_EPOCH,
            Err(e) => return Err(e),
        };
        if modified <= self.watermark {
            return Ok(None);
        }
        self.watermark = modified;
        Ok(Some(self.file.clone()))
    }
}
