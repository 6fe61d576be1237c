//! core::naming
//!
//! Fork naming rules and validation.
//!
//! A fork name is used three ways at once: as a directory under the fork
//! root, as a linked-worktree name, and as a local branch name. [`ForkName`]
//! enforces the structural rules that make a name safe for all three, so a
//! value of that type never needs path-traversal checks again.
//!
//! [`validate`] layers the contextual rules on top: resulting path length,
//! collision with an existing fork and collision with an existing branch.
//! Every failure has its own [`NameError`] variant so the caller can print
//! the exact cause.

use std::path::Path;

use thiserror::Error;

use crate::core::types::BranchName;

/// Longest path the platform accepts, in bytes.
#[cfg(windows)]
pub const MAX_PATH_LEN: usize = 260;
/// Longest path the platform accepts, in bytes.
#[cfg(target_os = "macos")]
pub const MAX_PATH_LEN: usize = 1024;
/// Longest path the platform accepts, in bytes.
#[cfg(not(any(windows, target_os = "macos")))]
pub const MAX_PATH_LEN: usize = 4096;

/// Longest single path component, in bytes.
pub const MAX_NAME_LEN: usize = 255;

/// Reasons a fork name is rejected.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum NameError {
    #[error("fork name cannot be empty")]
    Empty,

    #[error("fork name '{name}' cannot contain a path separator ('{separator}')")]
    PathSeparator { name: String, separator: char },

    #[error("fork name '{0}' cannot start with '.'")]
    LeadingDot(String),

    #[error("fork name '{0}' cannot contain '..'")]
    PathTraversal(String),

    #[error("fork name '{name}' is not a valid branch name: {reason}")]
    InvalidBranchName { name: String, reason: String },

    #[error("fork name '{name}' is too long ({len} bytes, limit {max})")]
    NameTooLong { name: String, len: usize, max: usize },

    #[error("fork path for '{name}' is too long ({len} bytes, limit {max})")]
    PathTooLong { name: String, len: usize, max: usize },

    #[error("fork '{0}' already exists")]
    ForkExists(String),

    #[error("a branch named '{0}' already exists")]
    BranchExists(String),
}

/// A validated fork identifier.
///
/// # Example
///
/// ```
/// use forkline::core::naming::ForkName;
///
/// let name = ForkName::new("feature").unwrap();
/// assert_eq!(name.as_str(), "feature");
/// assert_eq!(name.branch().as_str(), "feature");
///
/// assert!(ForkName::new("").is_err());
/// assert!(ForkName::new("a/b").is_err());
/// assert!(ForkName::new(".hidden").is_err());
/// assert!(ForkName::new("a..b").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ForkName(String);

impl ForkName {
    /// Create a new fork name, enforcing the structural rules.
    ///
    /// # Errors
    ///
    /// Returns the first violated rule as a [`NameError`].
    pub fn new(name: impl Into<String>) -> Result<Self, NameError> {
        let name = name.into();

        if name.is_empty() {
            return Err(NameError::Empty);
        }
        if let Some(separator) = name.chars().find(|&c| matches!(c, '/' | '\\')) {
            return Err(NameError::PathSeparator { name, separator });
        }
        if name.starts_with('.') {
            return Err(NameError::LeadingDot(name));
        }
        if name.contains("..") {
            return Err(NameError::PathTraversal(name));
        }
        if let Err(e) = BranchName::new(name.as_str()) {
            let reason = e.to_string();
            let reason = reason
                .strip_prefix("invalid branch name: branch name ")
                .unwrap_or(&reason)
                .to_string();
            return Err(NameError::InvalidBranchName { name, reason });
        }

        Ok(Self(name))
    }

    /// The branch that backs this fork. Forks and branches share one namespace.
    pub fn branch(&self) -> BranchName {
        // The structural rules are a superset of the branch rules.
        BranchName::from_validated(self.0.clone())
    }

    /// Get the fork name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for ForkName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ForkName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Validate a candidate fork name against every rule.
///
/// `fork_root` is where the fork's working tree would be created; the
/// resulting path must fit the platform limit. `existing_forks` and
/// `existing_branches` are the current registry keys and local branches.
///
/// # Example
///
/// ```
/// use std::path::Path;
/// use forkline::core::naming::{validate, NameError};
/// use forkline::core::types::BranchName;
///
/// let branches = vec![BranchName::new("main").unwrap()];
/// let root = Path::new("/repo/.forks");
///
/// assert!(validate("feature", root, &branches, &[]).is_ok());
/// assert_eq!(
///     validate("main", root, &branches, &[]),
///     Err(NameError::BranchExists("main".into()))
/// );
/// ```
pub fn validate(
    name: &str,
    fork_root: &Path,
    existing_branches: &[BranchName],
    existing_forks: &[ForkName],
) -> Result<ForkName, NameError> {
    let fork = ForkName::new(name)?;

    if fork.as_str().len() > MAX_NAME_LEN {
        return Err(NameError::NameTooLong {
            len: fork.as_str().len(),
            name: fork.0,
            max: MAX_NAME_LEN,
        });
    }
    let len = fork_root.join(fork.as_str()).as_os_str().len();
    if len > MAX_PATH_LEN {
        return Err(NameError::PathTooLong {
            name: fork.0,
            len,
            max: MAX_PATH_LEN,
        });
    }

    if existing_forks.contains(&fork) {
        return Err(NameError::ForkExists(fork.0));
    }
    if existing_branches
        .iter()
        .any(|branch| branch.as_str() == fork.as_str())
    {
        return Err(NameError::BranchExists(fork.0));
    }

    Ok(fork)
}
