//! fork::destroy
//!
//! Removes forks: working directory, worktree entry and branch together.
//!
//! Everything that could stop a removal halfway (fork in use, branch
//! checked out in the base) is checked before the first deletion. If a
//! later step still fails, the error names the part that remains and the
//! parts already gone.

use std::fs;

use crate::core::naming::ForkName;
use crate::core::types::Oid;
use crate::fork::{Fork, ForkError, ForkPart, ForkRegistry, Workspace};

/// A removed fork.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Deleted {
    pub name: ForkName,
    /// Where the fork's branch pointed when it was deleted.
    pub tip: Oid,
    /// Uncommitted files discarded with the working tree.
    pub discarded_files: usize,
}

/// Outcome of deleting every fork.
#[derive(Debug)]
pub enum DeleteAllOutcome {
    /// There was nothing to delete.
    NoForks,
    /// Every fork was attempted; `failed` holds the ones that remain.
    Processed {
        deleted: Vec<Deleted>,
        failed: Vec<(ForkName, ForkError)>,
    },
}

/// Delete fork `name`.
pub fn delete(ws: &Workspace, name: &str) -> Result<Deleted, ForkError> {
    ws.require_idle()?;
    let registry = ForkRegistry::load(ws)?;
    let fork = registry.resolve(name)?;
    remove(ws, fork)
}

/// Delete every registered fork, continuing past individual failures.
pub fn delete_all(ws: &Workspace) -> Result<DeleteAllOutcome, ForkError> {
    ws.require_idle()?;
    let registry = ForkRegistry::load(ws)?;
    if registry.is_empty() {
        return Ok(DeleteAllOutcome::NoForks);
    }

    let mut deleted = Vec::new();
    let mut failed = Vec::new();
    for fork in registry.list() {
        match remove(ws, fork) {
            Ok(done) => deleted.push(done),
            Err(e) => {
                tracing::debug!("failed to delete fork '{}': {}", fork.name, e);
                failed.push((fork.name.clone(), e));
            }
        }
    }
    Ok(DeleteAllOutcome::Processed { deleted, failed })
}

fn remove(ws: &Workspace, fork: &Fork) -> Result<Deleted, ForkError> {
    let git = ws.git();

    if ws.current_fork().as_ref() == Some(&fork.name) {
        return Err(ForkError::CurrentFork {
            name: fork.name.clone(),
        });
    }
    if git.current_branch()?.as_ref() == Some(&fork.branch) {
        return Err(ForkError::BranchCheckedOut {
            name: fork.name.clone(),
            branch: fork.branch.to_string(),
        });
    }

    let partial = |part: ForkPart, removed: &[ForkPart], reason: String| ForkError::PartialDelete {
        name: fork.name.clone(),
        part,
        removed: removed.to_vec(),
        reason,
    };

    fs::remove_dir_all(&fork.path)
        .map_err(|e| partial(ForkPart::WorkingTree, &[], e.to_string()))?;
    tracing::debug!("removed {}", fork.path.display());

    git.prune_worktree(fork.name.as_str())
        .map_err(|e| partial(ForkPart::WorktreeEntry, &[ForkPart::WorkingTree], e.to_string()))?;

    if fork.branch_exists {
        git.delete_branch(&fork.branch).map_err(|e| {
            partial(
                ForkPart::Branch,
                &[ForkPart::WorkingTree, ForkPart::WorktreeEntry],
                e.to_string(),
            )
        })?;
        tracing::debug!("deleted branch '{}' at {}", fork.branch, fork.tip.short(7));
    }

    Ok(Deleted {
        name: fork.name.clone(),
        tip: fork.tip.clone(),
        discarded_files: fork.dirty_file_count,
    })
}
