//! core::config::schema
//!
//! Configuration schema types.
//!
//! Values are validated after parsing so a bad file fails at load time
//! rather than halfway through an operation.

use serde::{Deserialize, Serialize};

use super::ConfigError;

/// Global configuration (user scope).
///
/// # Example
///
/// ```toml
/// quiet = false
/// warn_dirty_forks = true
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct GlobalConfig {
    /// Suppress non-error output by default
    pub quiet: Option<bool>,

    /// Warn when picking a fork that has uncommitted changes
    pub warn_dirty_forks: Option<bool>,
}

impl GlobalConfig {
    /// Validate the configuration values.
    pub fn validate(&self) -> Result<(), ConfigError> {
        Ok(())
    }
}

/// Repository configuration.
///
/// # Example
///
/// ```toml
/// fork_dir = ".forks"
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct RepoConfig {
    /// Name of the fork root directory inside the base working tree
    pub fork_dir: Option<String>,
}

impl RepoConfig {
    /// Validate the configuration values.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if `fork_dir` is not a single,
    /// plain path component.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(dir) = &self.fork_dir {
            if dir.is_empty() {
                return Err(ConfigError::InvalidValue(
                    "fork_dir cannot be empty".to_string(),
                ));
            }
            if dir == "." || dir == ".." || dir.contains(['/', '\\']) {
                return Err(ConfigError::InvalidValue(format!(
                    "fork_dir '{}' must be a single directory name",
                    dir
                )));
            }
            if dir == ".git" {
                return Err(ConfigError::InvalidValue(
                    "fork_dir cannot be '.git'".to_string(),
                ));
            }
        }

        Ok(())
    }
}
