//! fork
//!
//! The fork lifecycle: create, list, promote, pick, delete.
//!
//! A fork is one linked working tree plus one local branch of the same name,
//! living under the fork root of the base working tree. Forks share the
//! base's object store and refs, so folding work back is a ref and tree
//! operation rather than a copy.
//!
//! # Modules
//!
//! - [`workspace`] - Locates the base working tree, config and paths
//! - [`registry`] - Arena of forks keyed by validated name
//! - [`create`] - Provisioning a new fork
//! - [`promote`] - Squash-transplant of a fork's net change
//! - [`pick`] - Fast-forward or merge of a fork's branch
//! - [`destroy`] - Removing forks
//!
//! # Invariants
//!
//! - One fork = one working tree = one branch, all named alike
//! - Mutating operations refuse while the base has an operation in progress
//! - The base branch only moves through a CAS ref update, after the working
//!   tree and index already hold the new state

pub mod create;
pub mod destroy;
pub mod pick;
pub mod promote;
pub mod registry;
mod transition;
pub mod workspace;

pub use create::{create, Created};
pub use destroy::{delete, delete_all, DeleteAllOutcome, Deleted};
pub use pick::{pick, PickMode, PickResult};
pub use promote::{promote, PromoteResult};
pub use registry::{Fork, ForkRegistry};
pub use workspace::Workspace;

use std::path::PathBuf;

use thiserror::Error;

use crate::core::config::ConfigError;
use crate::core::naming::{ForkName, NameError};
use crate::core::types::BranchName;
use crate::git::{GitError, GitState};

/// The part of a fork that could not be removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForkPart {
    /// The fork's working directory.
    WorkingTree,
    /// The worktree administrative entry in the common dir.
    WorktreeEntry,
    /// The fork's branch.
    Branch,
}

impl std::fmt::Display for ForkPart {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            ForkPart::WorkingTree => "working tree",
            ForkPart::WorktreeEntry => "worktree entry",
            ForkPart::Branch => "branch",
        })
    }
}

/// Errors from fork operations.
#[derive(Debug, Error)]
pub enum ForkError {
    #[error(transparent)]
    InvalidName(#[from] NameError),

    #[error("fork '{name}' not found")]
    NotFound { name: String },

    #[error("running inside fork working tree '{}'; run from the base working tree at '{}'", .path.display(), .base.display())]
    InsideFork { path: PathBuf, base: PathBuf },

    #[error("cannot delete fork '{name}' from inside it; run from the base working tree")]
    CurrentFork { name: ForkName },

    #[error("HEAD is detached; checkout a branch first")]
    DetachedHead,

    #[error("{state} in progress on the base working tree{}", abort_hint(.state))]
    OperationInProgress { state: GitState },

    #[error("the base branch has no commits yet; commit something before forking")]
    NoBaseCommit,

    #[error("branch '{branch}' of fork '{name}' no longer exists; delete the fork or recreate the branch")]
    BranchMissing { name: ForkName, branch: BranchName },

    #[error("fork '{name}' shares no history with the base branch")]
    Unrelated { name: ForkName },

    #[error("promote of '{name}' conflicts with {}; nothing was committed", join(.paths))]
    PromoteConflict { name: ForkName, paths: Vec<String> },

    #[error("cannot pick '{name}': uncommitted changes in the base working tree would be overwritten ({detail})")]
    BaseWorktreeConflict { name: ForkName, detail: String },

    #[error("branch '{branch}' is checked out in the base working tree; switch branches before deleting fork '{name}'")]
    BranchCheckedOut { name: ForkName, branch: String },

    #[error("fork '{name}': could not remove the {part}{}: {reason}", removed_note(.removed))]
    PartialDelete {
        name: ForkName,
        part: ForkPart,
        removed: Vec<ForkPart>,
        reason: String,
    },

    #[error("{context}, and restoring the previous state also failed ({rollback}); check the base working tree")]
    RollbackFailed {
        context: Box<ForkError>,
        rollback: String,
    },

    #[error(transparent)]
    Git(#[from] GitError),

    #[error("{}: {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error(transparent)]
    Config(#[from] ConfigError),
}

fn abort_hint(state: &GitState) -> String {
    state
        .abort_command()
        .map(|command| format!("; finish it or run '{command}'"))
        .unwrap_or_default()
}

fn join<T: std::fmt::Display>(items: &[T]) -> String {
    items
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

fn removed_note(removed: &[ForkPart]) -> String {
    if removed.is_empty() {
        String::new()
    } else {
        format!(" (already removed: {})", join(removed))
    }
}

impl ForkError {
    pub(crate) fn io(path: impl Into<PathBuf>) -> impl FnOnce(std::io::Error) -> ForkError {
        let path = path.into();
        move |source| ForkError::Io { path, source }
    }
}
