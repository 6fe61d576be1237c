//! fork::workspace
//!
//! Resolves the base working tree from wherever the tool was started.
//!
//! Started inside a fork, discovery finds the fork's linked working tree.
//! The base is then reopened through the shared common dir, and the fork
//! the user is standing in is remembered so operations can refuse to pull
//! the floor out from under them.

use std::path::{Path, PathBuf};

use crate::core::config::Config;
use crate::core::naming::ForkName;
use crate::core::paths::ForkPaths;
use crate::core::types::{BranchName, Oid};
use crate::fork::ForkError;
use crate::git::{Git, GitError};

/// The base working tree plus everything fork operations need around it.
#[derive(Debug)]
pub struct Workspace {
    git: Git,
    paths: ForkPaths,
    config: Config,
    /// Root of the linked working tree the tool was started in, if any.
    started_in: Option<PathBuf>,
}

impl Workspace {
    /// Open the workspace containing `cwd`.
    pub fn open(cwd: &Path) -> Result<Self, ForkError> {
        let opened = Git::open(cwd)?;
        let info = opened.info()?;

        let (git, started_in) = if info.is_linked_worktree {
            let base = Git::open_common(&info.common_dir)?;
            (base, Some(canonical(&info.work_dir)))
        } else {
            (opened, None)
        };

        let base_info = git.info()?;
        let config = Config::load(Some(&base_info.common_dir))?;
        let paths = ForkPaths::new(
            canonical(&base_info.work_dir),
            base_info.common_dir,
            config.fork_dir(),
        );

        tracing::debug!(
            work_dir = %paths.work_dir.display(),
            inside_fork = started_in.is_some(),
            "opened workspace"
        );

        Ok(Self {
            git,
            paths,
            config,
            started_in,
        })
    }

    /// Engine handle on the base working tree.
    pub fn git(&self) -> &Git {
        &self.git
    }

    pub fn paths(&self) -> &ForkPaths {
        &self.paths
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// The fork containing the directory the tool was started in.
    pub fn current_fork(&self) -> Option<ForkName> {
        self.started_in
            .as_deref()
            .and_then(|path| self.paths.fork_containing(path))
    }

    /// Fail unless started from the base working tree.
    pub fn require_base(&self) -> Result<(), ForkError> {
        match &self.started_in {
            Some(path) => Err(ForkError::InsideFork {
                path: path.clone(),
                base: self.paths.work_dir.clone(),
            }),
            None => Ok(()),
        }
    }

    /// Fail if the base has a merge, rebase or similar operation in progress.
    pub fn require_idle(&self) -> Result<(), ForkError> {
        let state = self.git.state();
        if state.is_in_progress() {
            return Err(ForkError::OperationInProgress { state });
        }
        Ok(())
    }

    /// The branch the base working tree has checked out.
    pub fn require_branch(&self) -> Result<BranchName, ForkError> {
        self.git.current_branch()?.ok_or(ForkError::DetachedHead)
    }

    /// The base working tree's HEAD commit.
    pub fn base_tip(&self) -> Result<Oid, ForkError> {
        match self.git.head_oid() {
            Ok(oid) => Ok(oid),
            Err(GitError::RefNotFound { .. }) => Err(ForkError::NoBaseCommit),
            Err(e) => Err(e.into()),
        }
    }
}

/// Resolve symlinks so paths from git and from the OS compare equal.
fn canonical(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| path.to_path_buf())
}
