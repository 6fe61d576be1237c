//! fork::pick
//!
//! Merges a fork's branch into the base branch.
//!
//! # Modes
//!
//! - **AlreadyUpToDate**: the fork has no commits beyond the base
//! - **FastForward**: the base tip is an ancestor of the fork tip
//! - **Merged**: diverged histories merged cleanly into a two-parent commit
//! - **ConflictsPresent**: a real merge was started and left open, with
//!   conflict markers in the base working tree and `MERGE_HEAD` set
//!
//! Fast-forward and clean merges are computed in memory and applied as a
//! transition, so the base's staged changes never end up in the merge
//! commit and unrelated uncommitted edits are kept. If uncommitted base
//! changes sit on a path the merge rewrites, the pick stops with nothing
//! changed.
//!
//! The fork's own working tree is never read or modified here. Callers
//! that want to warn about its uncommitted files read
//! [`Fork::dirty_file_count`] from the registry before picking.

use crate::core::naming::ForkName;
use crate::core::types::{BranchName, Oid};
use crate::fork::transition::{self, Plan};
use crate::fork::{Fork, ForkError, ForkRegistry, Workspace};
use crate::git::{GitError, MergeOutcome};

/// How a pick concluded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PickMode {
    AlreadyUpToDate,
    FastForward,
    Merged,
    /// The merge is open; these paths need manual resolution.
    ConflictsPresent { paths: Vec<String> },
}

/// Outcome of a pick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PickResult {
    pub name: ForkName,
    /// The base branch the fork was merged into.
    pub base: BranchName,
    pub mode: PickMode,
    /// New base tip for fast-forward and merged outcomes.
    pub commit: Option<Oid>,
}

/// Pick fork `name` into the base branch.
pub fn pick(ws: &Workspace, name: &str) -> Result<PickResult, ForkError> {
    let registry = ForkRegistry::load(ws)?;
    let fork = registry.resolve(name)?;
    fork.require_branch()?;
    let base = ws.require_branch()?;
    if ws.git().is_merge_in_progress() {
        return Err(ForkError::OperationInProgress {
            state: ws.git().state(),
        });
    }
    ws.require_idle()?;

    if fork.dirty_file_count > 0 {
        tracing::debug!(
            "fork '{}' has {} uncommitted file(s); they are not part of the pick",
            fork.name,
            fork.dirty_file_count
        );
    }

    let status = ws.git().worktree_status(true)?;
    if !status.is_clean() {
        tracing::debug!(
            staged = status.staged,
            unstaged = status.unstaged,
            untracked = status.untracked,
            "base has uncommitted changes"
        );
    }

    let (mode, commit) = integrate(ws, fork, &base)?;
    Ok(PickResult {
        name: fork.name.clone(),
        base,
        mode,
        commit,
    })
}

fn integrate(
    ws: &Workspace,
    fork: &Fork,
    base: &BranchName,
) -> Result<(PickMode, Option<Oid>), ForkError> {
    let git = ws.git();
    let base_tip = ws.base_tip()?;

    if git.commit_count(&base_tip, &fork.tip)? == 0 {
        return Ok((PickMode::AlreadyUpToDate, None));
    }

    if git.is_ancestor(&base_tip, &fork.tip)? {
        tracing::debug!("fast-forward {} to {}", base, fork.tip.short(7));
        let reflog = format!("pick {}: fast-forward", fork.name);
        advance(ws, fork, base, &base_tip, &fork.tip, &reflog)?;
        return Ok((PickMode::FastForward, Some(fork.tip.clone())));
    }

    match git.merge_commits(&base_tip, &fork.tip)? {
        MergeOutcome::Clean { tree } => {
            let message = format!("Merge fork '{}' into {}", fork.name, base);
            let commit = git.create_commit(&tree, &[base_tip.clone(), fork.tip.clone()], &message)?;
            tracing::debug!("merge commit {}", commit.short(7));
            let reflog = format!("pick {}: merge", fork.name);
            advance(ws, fork, base, &base_tip, &commit, &reflog)?;
            Ok((PickMode::Merged, Some(commit)))
        }
        MergeOutcome::Conflicted { paths } => {
            tracing::debug!("{} conflicting path(s); starting merge", paths.len());
            match git.start_merge(&fork.branch) {
                Ok(conflicts) => Ok((PickMode::ConflictsPresent { paths: conflicts }, None)),
                Err(GitError::DirtyWorktree { details }) => Err(ForkError::BaseWorktreeConflict {
                    name: fork.name.clone(),
                    detail: details,
                }),
                Err(e) => Err(e.into()),
            }
        }
    }
}

/// Move the base from `from` to `to` in place, refusing over dirty paths.
fn advance(
    ws: &Workspace,
    fork: &Fork,
    base: &BranchName,
    from: &Oid,
    to: &Oid,
    reflog: &str,
) -> Result<(), ForkError> {
    let work_dir = &ws.paths().work_dir;
    let Plan {
        transition,
        blocked,
    } = transition::plan(ws.git(), work_dir, from, to, false)?;

    if !blocked.is_empty() {
        return Err(ForkError::BaseWorktreeConflict {
            name: fork.name.clone(),
            detail: blocked.join(", "),
        });
    }
    transition.apply(ws.git(), work_dir, base, reflog)
}
