//! Reload configuration
//!
//! [`ReloadConfig`] can be built in code or loaded with [`load_config`],
//! which layers, from lowest to highest priority:
//!
//! - built-in defaults
//! - an optional configuration file (YAML, TOML or JSON, detected from the
//!   extension) with `${VAR}` / `$VAR` substitution applied to its content
//! - `DEVRELOAD_*` environment variables, e.g.
//!   `DEVRELOAD_INSTALL_RELOAD_TIMER=true`
//!
//! The poll interval is deliberately not a tunable.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::lifecycle::ReloadFailurePolicy;

#[cfg(feature = "config")]
use config::{Config as Cfg, Environment, File, FileFormat};
#[cfg(feature = "config")]
use regex::Regex;
#[cfg(feature = "config")]
use std::sync::LazyLock;


/// Prefix of the environment variables read by [`load_config`]
pub const ENV_PREFIX: &str = "DEVRELOAD";

/// Manifest file name looked up in the home directory
pub const DEFAULT_MANIFEST_NAME: &str = "dev.artifacts";

/// Reload orchestrator configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReloadConfig {
    /// Home directory of the host runtime
    pub home: PathBuf,
    /// Manifest location; defaults to `<home>/dev.artifacts`
    pub manifest: Option<PathBuf>,
    /// Install the background poll scheduler on start
    pub install_reload_timer: bool,
    /// Component index location; defaults to `<home>/../sdk/components.index`
    pub component_index: Option<PathBuf>,
    /// Bookkeeping after a failed deploy
    pub failure_policy: ReloadFailurePolicy,
}

impl Default for ReloadConfig {
    fn default() -> Self {
        Self {
            home: PathBuf::from("."),
            manifest: None,
            install_reload_timer: false,
            component_index: None,
            failure_policy: ReloadFailurePolicy::default(),
        }
    }
}

impl ReloadConfig {
    /// Create a configuration rooted at `home`
    pub fn new(home: impl Into<PathBuf>) -> Self {
        Self {
            home: home.into(),
            ..Self::default()
        }
    }

    /// Set an explicit manifest location
    pub fn with_manifest(mut self, manifest: impl Into<PathBuf>) -> Self {
        self.manifest = Some(manifest.into());
        self
    }

    /// Enable/disable the poll scheduler
    pub fn with_reload_timer(mut self, enabled: bool) -> Self {
        self.install_reload_timer = enabled;
        self
    }

    /// Set an explicit component index location
    pub fn with_component_index(mut self, path: impl Into<PathBuf>) -> Self {
        self.component_index = Some(path.into());
        self
    }

    /// Set the deploy failure policy
    pub fn with_failure_policy(mut self, policy: ReloadFailurePolicy) -> Self {
        self.failure_policy = policy;
        self
    }

    /// Effective manifest location
    pub fn manifest_path(&self) -> PathBuf {
        self.manifest
            .clone()
            .unwrap_or_else(|| self.home.join(DEFAULT_MANIFEST_NAME))
    }

    /// Effective component index location
    pub fn component_index_path(&self) -> PathBuf {
        self.component_index.clone().unwrap_or_else(|| {
            self.home
                .parent()
                .unwrap_or(&self.home)
                .join("sdk")
                .join("components.index")
        })
    }
}

/// Configuration loading error
#[cfg(feature = "config")]
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config parsing error: {0}")]
    Parse(String),

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Result type for config operations
#[cfg(feature = "config")]
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Detect configuration format from file extension
///
/// - YAML: `.yaml`, `.yml`
/// - TOML: `.toml`
/// - JSON: `.json`
#[cfg(feature = "config")]
pub fn detect_format(path: &Path) -> ConfigResult<FileFormat> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .ok_or_else(|| ConfigError::UnsupportedFormat("No file extension found".to_string()))?;

    match ext.to_lowercase().as_str() {
        "yaml" | "yml" => Ok(FileFormat::Yaml),
        "toml" => Ok(FileFormat::Toml),
        "json" => Ok(FileFormat::Json),
        _ => Err(ConfigError::UnsupportedFormat(ext.to_string())),
    }
}

#[cfg(feature = "config")]
static BRACED_VAR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}").expect("valid pattern"));

#[cfg(feature = "config")]
static SIMPLE_VAR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$([A-Za-z_][A-Za-z0-9_]*)\b").expect("valid pattern"));

/// Substitute environment variables in a string
///
/// Supports `${VAR_NAME}` and `$VAR_NAME`. Unset variables are left as is.
#[cfg(feature = "config")]
pub fn substitute_env_vars(content: &str) -> String {
    substitute_with(content, |name| std::env::var(name).ok())
}

#[cfg(feature = "config")]
fn substitute_with(content: &str, lookup: impl Fn(&str) -> Option<String>) -> String {
    let braced = BRACED_VAR.replace_all(content, |caps: &regex::Captures| {
        lookup(&caps[1]).unwrap_or_else(|| caps[0].to_string())
    });

    SIMPLE_VAR
        .replace_all(&braced, |caps: &regex::Captures| {
            lookup(&caps[1]).unwrap_or_else(|| caps[0].to_string())
        })
        .into_owned()
}

/// Load configuration from a string with explicit format
#[cfg(feature = "config")]
pub fn from_str(content: &str, format: FileFormat) -> ConfigResult<ReloadConfig> {
    let config = Cfg::builder()
        .add_source(File::from_str(&substitute_env_vars(content), format))
        .build()
        .map_err(|e| ConfigError::Parse(e.to_string()))?;

    config
        .try_deserialize()
        .map_err(|e| ConfigError::Serialization(e.to_string()))
}

/// Load configuration from an optional file plus `DEVRELOAD_*` variables
#[cfg(feature = "config")]
pub fn load_config(path: Option<&Path>) -> ConfigResult<ReloadConfig> {
    load_with_env(path, None)
}

/// Same as [`load_config`], reading environment overrides from `env`
/// instead of the process environment when given
#[cfg(feature = "config")]
pub fn load_with_env(
    path: Option<&Path>,
    env: Option<config::Map<String, String>>,
) -> ConfigResult<ReloadConfig> {
    let mut builder = Cfg::builder();

    if let Some(path) = path {
        let format = detect_format(path)?;
        let content = std::fs::read_to_string(path)?;
        builder = builder.add_source(File::from_str(&substitute_env_vars(&content), format));
    }

    let config = builder
        .add_source(
            Environment::with_prefix(ENV_PREFIX)
                .try_parsing(true)
                .source(env),
        )
        .build()
        .map_err(|e| ConfigError::Parse(e.to_string()))?;

    config
        .try_deserialize()
        .map_err(|e| ConfigError::Serialization(e.to_string()))
}
