//! fork::promote
//!
//! Squash-transplant of a fork's net change onto the base branch.
//!
//! The fork's commits are not replayed. Their cumulative effect is taken as
//! a three-way tree merge (merge-base, base tip, fork tip) and recorded as
//! one new commit whose only parent is the base tip. The fork branch is
//! left as it was.
//!
//! Uncommitted base changes survive: paths the transplant does not touch
//! are never rewritten, and an unstaged edit to a touched file is merged at
//! region level. Overlapping regions, staged edits, untracked files in the
//! way and local deletions all abort the promote before anything changes.

use crate::core::naming::ForkName;
use crate::core::types::Oid;
use crate::fork::transition;
use crate::fork::{ForkError, ForkRegistry, Workspace};
use crate::git::{Git, MergeOutcome};

/// Outcome of a promote.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromoteResult {
    pub name: ForkName,
    /// Fork commits folded into the new commit; 0 if nothing was committed.
    pub commits_applied: usize,
    /// The squash commit, if one was created.
    pub commit: Option<Oid>,
}

/// Promote fork `name` onto the base branch.
pub fn promote(ws: &Workspace, name: &str) -> Result<PromoteResult, ForkError> {
    let registry = ForkRegistry::load(ws)?;
    let fork = registry.resolve(name)?;
    fork.require_branch()?;
    let branch = ws.require_branch()?;
    ws.require_idle()?;

    let git = ws.git();
    let base_tip = ws.base_tip()?;
    let commits = git.commits_between(&base_tip, &fork.tip)?;

    let up_to_date = PromoteResult {
        name: fork.name.clone(),
        commits_applied: 0,
        commit: None,
    };
    if commits.is_empty() {
        tracing::debug!("fork '{}' has no commits beyond {}", fork.name, branch);
        return Ok(up_to_date);
    }

    let ancestor = git
        .merge_base(&base_tip, &fork.tip)?
        .ok_or_else(|| ForkError::Unrelated {
            name: fork.name.clone(),
        })?;

    let tree = match git.merge_trees(&ancestor, &base_tip, &fork.tip)? {
        MergeOutcome::Clean { tree } => tree,
        MergeOutcome::Conflicted { paths } => {
            return Err(ForkError::PromoteConflict {
                name: fork.name.clone(),
                paths,
            })
        }
    };
    if tree == git.commit_tree(&base_tip)? {
        tracing::debug!("net change of '{}' is already on {}", fork.name, branch);
        return Ok(up_to_date);
    }

    let message = squash_message(git, &fork.name, &commits)?;
    let commit = git.create_commit(&tree, std::slice::from_ref(&base_tip), &message)?;
    tracing::debug!("squash commit {} for {} commit(s)", commit.short(7), commits.len());

    let plan = transition::plan(git, &ws.paths().work_dir, &base_tip, &commit, true)?;
    if !plan.blocked.is_empty() {
        return Err(ForkError::PromoteConflict {
            name: fork.name.clone(),
            paths: plan.blocked,
        });
    }

    let reflog = format!("promote {}: squash {} commit(s)", fork.name, commits.len());
    plan.transition
        .apply(git, &ws.paths().work_dir, &branch, &reflog)?;

    Ok(PromoteResult {
        name: fork.name.clone(),
        commits_applied: commits.len(),
        commit: Some(commit),
    })
}

/// Subject naming the fork and count, then one line per squashed commit.
fn squash_message(git: &Git, name: &ForkName, commits: &[Oid]) -> Result<String, ForkError> {
    let mut message = format!("promote {}: squash {} commit(s)\n\n", name, commits.len());
    for oid in commits {
        let info = git.commit_info(oid)?;
        message.push_str(&format!("* {} {}\n", oid.short(7), info.summary));
    }
    Ok(message)
}
