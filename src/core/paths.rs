//! core::paths
//!
//! Centralized path routing for fork storage locations.
//!
//! # Layout
//!
//! - `<work_dir>/<fork_dir>/` - fork root (default `.forks`)
//! - `<work_dir>/<fork_dir>/<name>/` - one linked working tree per fork
//! - `<work_dir>/.gitignore` - carries the `/<fork_dir>/` pattern
//! - `<common_dir>/forkline/config.toml` - repository configuration
//!
//! `work_dir` is always the *base* working tree, even when the tool was
//! started inside a fork. Repository configuration lives under `common_dir`
//! so every working tree of the repository sees the same file.
//!
//! # Example
//!
//! ```
//! use forkline::core::paths::ForkPaths;
//! use std::path::PathBuf;
//!
//! let paths = ForkPaths::new(PathBuf::from("/repo"), PathBuf::from("/repo/.git"), ".forks");
//! assert_eq!(paths.fork_root(), PathBuf::from("/repo/.forks"));
//! assert_eq!(paths.ignore_pattern(), "/.forks/");
//! ```

use std::path::{Path, PathBuf};

use crate::core::naming::ForkName;

/// Default name of the fork root directory.
pub const DEFAULT_FORK_DIR: &str = ".forks";

/// Every on-disk location the fork subsystem touches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForkPaths {
    /// The base working tree.
    pub work_dir: PathBuf,
    /// The git directory shared by all working trees.
    pub common_dir: PathBuf,
    /// Name of the fork root directory inside `work_dir`.
    fork_dir: String,
}

impl ForkPaths {
    /// Create the path table for a base working tree.
    pub fn new(work_dir: PathBuf, common_dir: PathBuf, fork_dir: impl Into<String>) -> Self {
        Self {
            work_dir,
            common_dir,
            fork_dir: fork_dir.into(),
        }
    }

    /// Directory holding every fork's working tree.
    pub fn fork_root(&self) -> PathBuf {
        self.work_dir.join(&self.fork_dir)
    }

    /// Working tree location of a fork.
    pub fn fork_path(&self, name: &ForkName) -> PathBuf {
        self.fork_root().join(name.as_str())
    }

    /// The ignore file the fork root pattern is written to.
    pub fn ignore_file(&self) -> PathBuf {
        self.work_dir.join(".gitignore")
    }

    /// Ignore pattern that excludes the fork root, anchored at the work dir.
    pub fn ignore_pattern(&self) -> String {
        format!("/{}/", self.fork_dir)
    }

    /// Configuration file location for a given common dir.
    pub fn config_path_in(common_dir: &Path) -> PathBuf {
        common_dir.join("forkline").join("config.toml")
    }

    /// If `path` lies inside a fork's working tree, return that fork's name.
    ///
    /// Only direct children of the fork root count; paths are compared
    /// component-wise, so `/repo/.forks-old/x` is not inside `/repo/.forks`.
    pub fn fork_containing(&self, path: &Path) -> Option<ForkName> {
        let rest = path.strip_prefix(self.fork_root()).ok()?;
        let first = rest.components().next()?;
        ForkName::new(first.as_os_str().to_str()?).ok()
    }
}
