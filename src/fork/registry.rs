//! fork::registry
//!
//! Enumerates forks and computes their divergence from the base.
//!
//! The registry is an arena keyed by [`ForkName`]: every entry was parsed
//! through the naming rules when loaded, so nothing downstream re-checks
//! paths built from it. It is rebuilt from disk on every load; ahead and
//! dirty counts are never persisted.

use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;

use crate::core::naming::ForkName;
use crate::core::types::{BranchName, Oid, RefName};
use crate::fork::{ForkError, Workspace};
use crate::git::Git;

/// One fork as observed right now.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fork {
    pub name: ForkName,
    /// Root of the fork's linked working tree.
    pub path: PathBuf,
    /// The fork's own branch, always named after the fork.
    pub branch: BranchName,
    /// Whether `branch` still exists in the repository.
    pub branch_exists: bool,
    /// Branch checked out in the fork's working tree, `None` if detached.
    pub checked_out: Option<BranchName>,
    /// Commit the fork's branch points at, or the fork's HEAD if the
    /// branch is gone.
    pub tip: Oid,
    /// Commits on `branch` not reachable from the base HEAD.
    pub ahead_count: usize,
    /// Files with uncommitted or untracked changes in the fork.
    pub dirty_file_count: usize,
}

impl Fork {
    /// The fork's branch, for operations that read commits from it.
    ///
    /// # Errors
    ///
    /// `BranchMissing` if the branch was deleted behind the fork's back.
    pub fn require_branch(&self) -> Result<&BranchName, ForkError> {
        if self.branch_exists {
            Ok(&self.branch)
        } else {
            Err(ForkError::BranchMissing {
                name: self.name.clone(),
                branch: self.branch.clone(),
            })
        }
    }
}

/// All forks of a workspace, keyed by name.
#[derive(Debug, Default)]
pub struct ForkRegistry {
    forks: BTreeMap<ForkName, Fork>,
}

impl ForkRegistry {
    /// Scan the fork root and build a fresh registry.
    ///
    /// Directories that are not valid fork names or not linked worktrees
    /// of this repository are skipped with a warning.
    pub fn load(ws: &Workspace) -> Result<Self, ForkError> {
        let root = ws.paths().fork_root();
        if !root.is_dir() {
            return Ok(Self::default());
        }

        let mut dirs = Vec::new();
        for entry in fs::read_dir(&root).map_err(ForkError::io(&root))? {
            let entry = entry.map_err(ForkError::io(&root))?;
            if entry.path().is_dir() {
                dirs.push(entry.file_name());
            }
        }
        if dirs.is_empty() {
            return Ok(Self::default());
        }

        let base_tip = ws.base_tip()?;
        let common_dir = &ws.paths().common_dir;
        let common_dir = common_dir
            .canonicalize()
            .map_err(ForkError::io(common_dir))?;

        let mut forks = BTreeMap::new();
        for dir in dirs {
            let Some(name) = dir.to_str().and_then(|s| ForkName::new(s).ok()) else {
                tracing::warn!(
                    "skipping '{}' in fork root: not a valid fork name",
                    dir.to_string_lossy()
                );
                continue;
            };
            let path = ws.paths().fork_path(&name);

            let fork_git = match Git::open(&path) {
                Ok(git) => git,
                Err(e) => {
                    tracing::warn!("skipping fork '{}': {}", name, e);
                    continue;
                }
            };
            let info = fork_git.info()?;
            let same_repo = info
                .common_dir
                .canonicalize()
                .map(|dir| dir == common_dir)
                .unwrap_or(false);
            if !info.is_linked_worktree || !same_repo {
                tracing::warn!(
                    "skipping fork '{}': not a linked worktree of this repository",
                    name
                );
                continue;
            }

            let branch = name.branch();
            let checked_out = fork_git.current_branch()?;
            if checked_out.as_ref() != Some(&branch) {
                tracing::warn!(
                    "fork '{}' has {} checked out instead of its branch '{}'",
                    name,
                    checked_out
                        .as_ref()
                        .map(|b| format!("'{b}'"))
                        .unwrap_or_else(|| "a detached HEAD".to_string()),
                    branch
                );
            }
            let (tip, branch_exists) = match ws
                .git()
                .try_resolve_ref(RefName::for_branch(&branch).as_str())?
            {
                Some(tip) => (tip, true),
                None => {
                    tracing::warn!("branch '{}' of fork '{}' no longer exists", branch, name);
                    (fork_git.head_oid()?, false)
                }
            };
            let ahead_count = ws.git().commit_count(&base_tip, &tip)?;
            let dirty_file_count = fork_git.dirty_paths(true)?.len();

            forks.insert(
                name.clone(),
                Fork {
                    name,
                    path,
                    branch,
                    branch_exists,
                    checked_out,
                    tip,
                    ahead_count,
                    dirty_file_count,
                },
            );
        }

        Ok(Self { forks })
    }

    /// Forks in name order.
    pub fn list(&self) -> impl Iterator<Item = &Fork> {
        self.forks.values()
    }

    pub fn names(&self) -> Vec<ForkName> {
        self.forks.keys().cloned().collect()
    }

    /// Look up a fork by user-supplied name.
    ///
    /// # Errors
    ///
    /// `InvalidName` if the string is not a legal fork name, `NotFound` if no
    /// such fork exists.
    pub fn resolve(&self, name: &str) -> Result<&Fork, ForkError> {
        let key = ForkName::new(name)?;
        self.forks.get(&key).ok_or_else(|| ForkError::NotFound {
            name: name.to_string(),
        })
    }

    pub fn len(&self) -> usize {
        self.forks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.forks.is_empty()
    }
}
