//! Verifier configuration (`conformance-verify.toml`).
//!
//! ```toml
//! [metadata]
//! root = "/srv/conformance/metadata"
//!
//! [release]
//! latest = "v1.31"
//! lookback = 2
//!
//! [rules]
//! script = "rules/verify-conformance.feature"
//!
//! [logging]
//! json = false
//! level = "info"
//! ```
//!
//! Every section is optional. Lookup order for the file: explicit path, then
//! `CONFORMANCE_VERIFY_CONFIG`, then `conformance-verify.toml` in the working
//! directory if it exists, else built-in defaults.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::Level;

use crate::domain::{ReleaseVersion, DEFAULT_RELEASE_LOOKBACK};
use crate::telemetry::parse_level;

/// Default config filename, looked up in the working directory.
pub const DEFAULT_CONFIG_NAME: &str = "conformance-verify.toml";
/// Environment variable override for the config path.
pub const CONFIG_ENV_VAR: &str = "CONFORMANCE_VERIFY_CONFIG";
/// Largest accepted lookback window.
pub const MAX_LOOKBACK: u64 = 10;
const MAX_CONFIG_FILE_SIZE: u64 = 256 * 1024;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config io error: {0}")]
    Io(String),
    #[error("config parse error: {0}")]
    Parse(String),
    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MetadataConfig {
    /// Directory holding `{version}/conformance.yaml` manifests.
    pub root: PathBuf,
}

impl Default for MetadataConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("metadata"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ReleaseConfig {
    /// Latest published release, e.g. `v1.31`. Empty disables the
    /// supported-release check.
    pub latest: String,
    pub lookback: u64,
}

impl Default for ReleaseConfig {
    fn default() -> Self {
        Self {
            latest: String::new(),
            lookback: DEFAULT_RELEASE_LOOKBACK,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RulesConfig {
    /// Rule script path; the embedded script is used when unset.
    pub script: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingConfig {
    pub json: bool,
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            json: false,
            level: "info".to_string(),
        }
    }
}

/// Top-level verifier configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct VerifierConfig {
    pub metadata: MetadataConfig,
    pub release: ReleaseConfig,
    pub rules: RulesConfig,
    pub logging: LoggingConfig,
    /// Directory of the loaded file; relative paths resolve against it.
    #[serde(skip)]
    pub base_dir: Option<PathBuf>,
}

impl VerifierConfig {
    /// Load and validate configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the file cannot be read or parsed, or
    /// fails validation.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let Some(resolved) = resolve_path(path) else {
            let config = Self::default();
            config.validate()?;
            return Ok(config);
        };

        let size = fs::metadata(&resolved)
            .map_err(|err| ConfigError::Io(format!("{}: {err}", resolved.display())))?
            .len();
        if size > MAX_CONFIG_FILE_SIZE {
            return Err(ConfigError::Invalid(
                "config file exceeds size limit".to_string(),
            ));
        }
        let content = fs::read_to_string(&resolved)
            .map_err(|err| ConfigError::Io(format!("{}: {err}", resolved.display())))?;

        let mut config = Self::from_toml(&content)?;
        config.base_dir = resolved.parent().map(Path::to_path_buf);
        Ok(config)
    }

    /// Parse and validate configuration text.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self =
            toml::from_str(content).map_err(|err| ConfigError::Parse(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.release.latest.is_empty() {
            ReleaseVersion::parse(&self.release.latest).map_err(|err| {
                ConfigError::Invalid(format!("release.latest: {err}"))
            })?;
        }
        if self.release.lookback > MAX_LOOKBACK {
            return Err(ConfigError::Invalid(format!(
                "release.lookback must be at most {MAX_LOOKBACK}, got {}",
                self.release.lookback
            )));
        }
        if parse_level(&self.logging.level).is_none() {
            return Err(ConfigError::Invalid(format!(
                "logging.level '{}' is not one of trace, debug, info, warn, error",
                self.logging.level
            )));
        }
        Ok(())
    }

    /// Configured log level, `INFO` if unparsable.
    pub fn log_level(&self) -> Level {
        parse_level(&self.logging.level).unwrap_or(Level::INFO)
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        match &self.base_dir {
            Some(base) if path.is_relative() => base.join(path),
            _ => path.to_path_buf(),
        }
    }

    /// Metadata root, resolved against the config file's directory.
    pub fn metadata_root(&self) -> PathBuf {
        self.resolve(&self.metadata.root)
    }

    /// Rule script path, resolved against the config file's directory.
    pub fn rules_script(&self) -> Option<PathBuf> {
        self.rules.script.as_deref().map(|p| self.resolve(p))
    }
}

fn resolve_path(path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = path {
        return Some(path.to_path_buf());
    }
    if let Ok(env_path) = env::var(CONFIG_ENV_VAR) {
        if !env_path.trim().is_empty() {
            return Some(PathBuf::from(env_path));
        }
    }
    let default = PathBuf::from(DEFAULT_CONFIG_NAME);
    default.is_file().then_some(default)
}
