//! core::config
//!
//! Configuration schema and loading.
//!
//! # Precedence
//!
//! Values resolve in this order (later overrides earlier):
//! 1. Default values
//! 2. Global config file
//! 3. Repo config file
//! 4. CLI flags (not handled here)
//!
//! # Global Config Locations
//!
//! Searched in order:
//! 1. `$FORKLINE_CONFIG` if set
//! 2. `$XDG_CONFIG_HOME/forkline/config.toml`
//! 3. `~/.forkline/config.toml`
//!
//! # Repo Config Location
//!
//! `<common_dir>/forkline/config.toml`, shared by the base working tree
//! and every fork.
//!
//! # Example
//!
//! ```no_run
//! use forkline::core::config::Config;
//! use std::path::Path;
//!
//! let config = Config::load(Some(Path::new("/path/to/repo/.git"))).unwrap();
//! println!("forks live in {}", config.fork_dir());
//! ```

pub mod schema;

pub use schema::{GlobalConfig, RepoConfig};

use std::fs;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use thiserror::Error;

use crate::core::paths::{ForkPaths, DEFAULT_FORK_DIR};

/// Errors from configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file '{path}': {source}")]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config file '{path}': {message}")]
    ParseError { path: PathBuf, message: String },

    #[error("invalid config value: {0}")]
    InvalidValue(String),
}

/// Merged configuration from all sources.
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// Global configuration
    pub global: GlobalConfig,
    /// Repository configuration (if in a repo)
    pub repo: Option<RepoConfig>,
    /// Path to the global config file (if loaded)
    global_path: Option<PathBuf>,
    /// Path to the repo config file (if loaded)
    repo_path: Option<PathBuf>,
}

impl Config {
    /// Load configuration from default locations.
    ///
    /// If `common_dir` is provided, also loads the repository config stored
    /// under it.
    ///
    /// # Errors
    ///
    /// Returns an error if a config file exists but cannot be parsed or
    /// holds an invalid value. Missing files are not an error.
    pub fn load(common_dir: Option<&Path>) -> Result<Config, ConfigError> {
        let (global, global_path) = Self::load_global()?;

        let (repo, repo_path) = match common_dir {
            Some(dir) => {
                let path = ForkPaths::config_path_in(dir);
                if path.exists() {
                    (Some(read_toml::<RepoConfig>(&path)?), Some(path))
                } else {
                    (None, None)
                }
            }
            None => (None, None),
        };

        global.validate()?;
        if let Some(ref r) = repo {
            r.validate()?;
        }

        Ok(Config {
            global,
            repo,
            global_path,
            repo_path,
        })
    }

    /// Load global configuration from the first location that exists.
    fn load_global() -> Result<(GlobalConfig, Option<PathBuf>), ConfigError> {
        let mut candidates = Vec::new();
        if let Ok(path) = std::env::var("FORKLINE_CONFIG") {
            candidates.push(PathBuf::from(path));
        }
        if let Ok(xdg_home) = std::env::var("XDG_CONFIG_HOME") {
            candidates.push(PathBuf::from(xdg_home).join("forkline/config.toml"));
        }
        if let Some(home) = dirs::home_dir() {
            candidates.push(home.join(".forkline/config.toml"));
        }

        for path in candidates {
            if path.exists() {
                let config = read_toml::<GlobalConfig>(&path)?;
                return Ok((config, Some(path)));
            }
        }

        Ok((GlobalConfig::default(), None))
    }

    // =========================================================================
    // Accessor methods with precedence
    // =========================================================================

    /// Name of the fork root directory. Defaults to `.forks`.
    pub fn fork_dir(&self) -> &str {
        self.repo
            .as_ref()
            .and_then(|r| r.fork_dir.as_deref())
            .unwrap_or(DEFAULT_FORK_DIR)
    }

    /// Whether output is quiet by default. Defaults to `false`.
    pub fn quiet(&self) -> bool {
        self.global.quiet.unwrap_or(false)
    }

    /// Whether `pick` warns about uncommitted fork changes. Defaults to `true`.
    pub fn warn_dirty_forks(&self) -> bool {
        self.global.warn_dirty_forks.unwrap_or(true)
    }

    /// Get the path to the loaded global config file.
    pub fn global_config_loaded_from(&self) -> Option<&Path> {
        self.global_path.as_deref()
    }

    /// Get the path to the loaded repo config file.
    pub fn repo_config_loaded_from(&self) -> Option<&Path> {
        self.repo_path.as_deref()
    }
}

/// Read and parse a TOML config file.
fn read_toml<T: DeserializeOwned>(path: &Path) -> Result<T, ConfigError> {
    let contents = fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
        path: path.to_path_buf(),
        source: e,
    })?;

    toml::from_str(&contents).map_err(|e| ConfigError::ParseError {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}
