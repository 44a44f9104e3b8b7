//! Catalogue configuration.
//!
//! Read from a YAML file (`ifw.yaml` at the repository root by default),
//! then overridden from the environment:
//!
//! - `IFW_INTEGRATIONS_DIR` (default: `integrations`)
//! - `IFW_SCHEMA_DIR` (default: none, the bundled schema is used)
//! - `IFW_PAYLOADS_DIR` (default: none, the bundled payloads are used)
//!
//! Relative paths are resolved against the repository root.
//!
//! ```yaml
//! integrations_dir: integrations
//! oauth_allow_list:
//!   - acme-oauth
//! workers: 4
//! ```

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default config file name looked up at the repository root.
pub const CONFIG_FILE: &str = "ifw.yaml";

pub const ENV_INTEGRATIONS_DIR: &str = "IFW_INTEGRATIONS_DIR";
pub const ENV_SCHEMA_DIR: &str = "IFW_SCHEMA_DIR";
pub const ENV_PAYLOADS_DIR: &str = "IFW_PAYLOADS_DIR";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CatalogueConfig {
    /// Directory holding one sub-directory per integration.
    pub integrations_dir: PathBuf,
    /// Directory of `*.schema.json` files to use instead of the bundled schema.
    pub schema_dir: Option<PathBuf>,
    /// Directory of sample payloads to use instead of the bundled ones.
    pub payloads_dir: Option<PathBuf>,
    /// Integration keys allowed to declare `requiresOAuth: true`.
    pub oauth_allow_list: BTreeSet<String>,
    /// Worker threads for whole-catalogue runs. Defaults to available parallelism.
    pub workers: Option<usize>,
}

impl Default for CatalogueConfig {
    fn default() -> Self {
        Self {
            integrations_dir: PathBuf::from("integrations"),
            schema_dir: None,
            payloads_dir: None,
            oauth_allow_list: BTreeSet::new(),
            workers: None,
        }
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("workers must be at least 1")]
    ZeroWorkers,
}

impl CatalogueConfig {
    /// Parse a config file. Missing keys take their defaults.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = serde_yaml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        if config.workers == Some(0) {
            return Err(ConfigError::ZeroWorkers);
        }
        Ok(config)
    }

    /// Load the effective configuration for a repository.
    ///
    /// Uses `explicit` if given, otherwise `<repo_root>/ifw.yaml` when it
    /// exists, otherwise defaults. Environment overrides are applied and all
    /// paths are resolved against `repo_root`.
    pub fn load(repo_root: &Path, explicit: Option<&Path>) -> Result<Self, ConfigError> {
        let default_file = repo_root.join(CONFIG_FILE);
        let file = match explicit {
            Some(path) => Some(path.to_path_buf()),
            None if default_file.is_file() => Some(default_file),
            None => None,
        };

        let mut config = match &file {
            Some(path) => {
                tracing::debug!(path = %path.display(), "loading catalogue config");
                Self::from_file(path)?
            }
            None => Self::default(),
        };
        config.apply_overrides(|var| std::env::var(var).ok());
        Ok(config.resolved_against(repo_root))
    }

    /// Apply overrides from `lookup` (normally the process environment).
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let non_empty = |var: &str| lookup(var).filter(|v| !v.trim().is_empty());

        if let Some(dir) = non_empty(ENV_INTEGRATIONS_DIR) {
            self.integrations_dir = PathBuf::from(dir);
        }
        if let Some(dir) = non_empty(ENV_SCHEMA_DIR) {
            self.schema_dir = Some(PathBuf::from(dir));
        }
        if let Some(dir) = non_empty(ENV_PAYLOADS_DIR) {
            self.payloads_dir = Some(PathBuf::from(dir));
        }
    }

    /// Make every relative path absolute under `base`.
    pub fn resolved_against(mut self, base: &Path) -> Self {
        let resolve = |p: PathBuf| if p.is_absolute() { p } else { base.join(p) };
        self.integrations_dir = resolve(self.integrations_dir);
        self.schema_dir = self.schema_dir.map(resolve);
        self.payloads_dir = self.payloads_dir.map(resolve);
        self
    }

    /// Worker count for whole-catalogue runs, never zero.
    pub fn worker_count(&self) -> usize {
        self.workers
            .filter(|&n| n > 0)
            .unwrap_or_else(|| std::thread::available_parallelism().map_or(1, |n| n.get()))
    }
}
