//! Library-backed loading context
//!
//! Archives are dynamic libraries opened with `libloading`; auxiliary
//! directories and resource fragments are enumerated and indexed so the host
//! can resolve script units and resource overrides from them.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use devreload_kernel::{ContextError, LoadingContext};
use libloading::Library;
use sha2::{Digest, Sha256};
use tracing::{debug, info};
use url::Url;
use walkdir::WalkDir;

/// An archive opened in the context
pub struct LoadedArchive {
    location: Url,
    path: PathBuf,
    fingerprint: String,
    library: Library,
}

impl LoadedArchive {
    pub fn location(&self) -> &Url {
        &self.location
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// SHA-256 of the archive bytes at load time
    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    /// Borrow the underlying library handle
    pub fn library(&self) -> &Library {
        &self.library
    }
}

impl std::fmt::Debug for LoadedArchive {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoadedArchive")
            .field("location", &self.location)
            .field("fingerprint", &self.fingerprint)
            .finish()
    }
}

impl Drop for LoadedArchive {
    fn drop(&mut self) {
        debug!("Unloading archive: {:?}", self.path);
    }
}

/// An installed directory and the files found under it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstalledDirectory {
    root: PathBuf,
    units: Vec<PathBuf>,
}

impl InstalledDirectory {
    fn scan(root: &Path) -> Result<Self, ContextError> {
        if !root.is_dir() {
            return Err(ContextError::MissingDirectory(root.to_path_buf()));
        }

        let mut units = Vec::new();
        for entry in WalkDir::new(root).sort_by_file_name() {
            let entry = entry.map_err(|e| ContextError::Other(e.to_string()))?;
            if entry.file_type().is_file() {
                let relative = entry
                    .path()
                    .strip_prefix(root)
                    .map_err(|e| ContextError::Other(e.to_string()))?;
                units.push(relative.to_path_buf());
            }
        }

        Ok(Self {
            root: root.to_path_buf(),
            units,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Files under the root, relative to it, sorted
    pub fn units(&self) -> &[PathBuf] {
        &self.units
    }
}

/// Loading context backed by dynamic libraries
#[derive(Debug, Default)]
pub struct LibraryContext {
    archives: Vec<LoadedArchive>,
    auxiliary: Vec<InstalledDirectory>,
    fragments: Vec<InstalledDirectory>,
    // relative path -> index into `fragments` of the overriding fragment
    resources: HashMap<PathBuf, usize>,
}

impl LibraryContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn archives(&self) -> &[LoadedArchive] {
        &self.archives
    }

    pub fn auxiliary_directories(&self) -> &[InstalledDirectory] {
        &self.auxiliary
    }

    pub fn resource_fragments(&self) -> &[InstalledDirectory] {
        &self.fragments
    }

    /// Resolve a resource by its path relative to a fragment root.
    ///
    /// When several fragments provide the same path the last one wins.
    pub fn resource(&self, relative: impl AsRef<Path>) -> Option<PathBuf> {
        let relative = relative.as_ref();
        self.resources
            .get(relative)
            .map(|&idx| self.fragments[idx].root.join(relative))
    }

    /// Every auxiliary unit as an absolute path, in installation order
    pub fn auxiliary_units(&self) -> impl Iterator<Item = PathBuf> + '_ {
        self.auxiliary
            .iter()
            .flat_map(|dir| dir.units.iter().map(move |unit| dir.root.join(unit)))
    }

    pub fn is_empty(&self) -> bool {
        self.archives.is_empty() && self.auxiliary.is_empty() && self.fragments.is_empty()
    }

    fn fingerprint(path: &Path) -> Result<String, ContextError> {
        let contents = std::fs::read(path)?;
        let mut hasher = Sha256::new();
        hasher.update(&contents);
        Ok(format!("{:x}", hasher.finalize()))
    }

    fn open(location: &Url) -> Result<LoadedArchive, ContextError> {
        let path = location
            .to_file_path()
            .map_err(|_| ContextError::UnsupportedLocation(location.clone()))?;

        let fingerprint = Self::fingerprint(&path).map_err(|e| ContextError::ArchiveLoad {
            location: location.clone(),
            reason: e.to_string(),
        })?;

        // SAFETY: loading a library runs its initialisers. Development
        // archives are trusted code built for this host.
        let library = unsafe {
            Library::new(&path).map_err(|e| ContextError::ArchiveLoad {
                location: location.clone(),
                reason: e.to_string(),
            })?
        };

        Ok(LoadedArchive {
            location: location.clone(),
            path,
            fingerprint,
            library,
        })
    }
}

impl LoadingContext for LibraryContext {
    fn reset(&mut self) {
        let dropped = self.archives.len();
        self.resources.clear();
        self.fragments.clear();
        self.auxiliary.clear();
        // Library handles are closed here, before anything new is opened.
        self.archives.clear();
        debug!("Loading context reset ({} archive(s) released)", dropped);
    }

    fn load_archives(&mut self, locations: &[Url]) -> Result<(), ContextError> {
        let loaded = locations
            .iter()
            .map(Self::open)
            .collect::<Result<Vec<_>, _>>()?;

        for archive in &loaded {
            info!(
                "Loaded archive {} ({})",
                archive.location,
                &archive.fingerprint[..12]
            );
        }
        self.archives.extend(loaded);
        Ok(())
    }

    fn install_auxiliary_directories(
        &mut self,
        directories: &[PathBuf],
    ) -> Result<(), ContextError> {
        let installed = directories
            .iter()
            .map(|dir| InstalledDirectory::scan(dir))
            .collect::<Result<Vec<_>, _>>()?;

        for dir in &installed {
            debug!("Installed {} unit(s) from {:?}", dir.units.len(), dir.root);
        }
        self.auxiliary.extend(installed);
        Ok(())
    }

    fn install_resource_fragments(&mut self, directories: &[PathBuf]) -> Result<(), ContextError> {
        let installed = directories
            .iter()
            .map(|dir| InstalledDirectory::scan(dir))
            .collect::<Result<Vec<_>, _>>()?;

        for fragment in installed {
            let idx = self.fragments.len();
            for unit in &fragment.units {
                self.resources.insert(unit.clone(), idx);
            }
            debug!(
                "Installed resource fragment {:?} ({} file(s))",
                fragment.root,
                fragment.units.len()
            );
            self.fragments.push(fragment);
        }
        Ok(())
    }
}
