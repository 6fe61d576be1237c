//! fork::create
//!
//! Provisions a new fork: a branch at the base HEAD plus a linked working
//! tree under the fork root with that branch checked out.
//!
//! # Steps
//!
//! 1. Refuse inside a fork or while an operation is in progress
//! 2. Validate the name against existing forks and branches
//! 3. Make sure the fork root is ignored (`.gitignore`, append once)
//! 4. Prune stale worktree admin data left by a hand-deleted fork
//! 5. Create the branch, then the worktree; drop the branch if the
//!    worktree cannot be added

use std::fs;
use std::io::Write;
use std::path::Path;

use crate::core::naming;
use crate::core::paths::ForkPaths;
use crate::fork::{Fork, ForkError, ForkRegistry, Workspace};

/// A freshly created fork.
#[derive(Debug, Clone)]
pub struct Created {
    pub fork: Fork,
    /// Whether the ignore file was changed to exclude the fork root.
    pub ignore_updated: bool,
}

/// Create fork `name` from the base working tree's current commit.
pub fn create(ws: &Workspace, name: &str) -> Result<Created, ForkError> {
    ws.require_base()?;
    ws.require_idle()?;

    let git = ws.git();
    let paths = ws.paths();
    let registry = ForkRegistry::load(ws)?;
    let branches = git.list_branches()?;

    let name = naming::validate(name, &paths.fork_root(), &branches, &registry.names())?;
    let path = paths.fork_path(&name);
    if path.exists() {
        return Err(naming::NameError::ForkExists(name.to_string()).into());
    }

    let tip = ws.base_tip()?;
    let ignore_updated = ensure_ignored(paths)?;

    if git.prune_stale_worktree(name.as_str())? {
        tracing::debug!("pruned stale worktree entry for '{}'", name);
    }

    let branch = name.branch();
    git.create_branch(&branch, &tip)?;
    tracing::debug!("created branch '{}' at {}", branch, tip.short(7));

    if let Err(e) = add_worktree(ws, &name, &path) {
        if let Err(cleanup) = git.delete_branch(&branch) {
            tracing::warn!("failed to remove branch '{}' after error: {}", branch, cleanup);
        }
        return Err(e);
    }
    tracing::debug!("added worktree at {}", path.display());

    Ok(Created {
        fork: Fork {
            name,
            path,
            checked_out: Some(branch.clone()),
            branch,
            branch_exists: true,
            tip,
            ahead_count: 0,
            dirty_file_count: 0,
        },
        ignore_updated,
    })
}

fn add_worktree(ws: &Workspace, name: &naming::ForkName, path: &Path) -> Result<(), ForkError> {
    let root = ws.paths().fork_root();
    fs::create_dir_all(&root).map_err(ForkError::io(&root))?;
    ws.git().add_worktree(name.as_str(), path, &name.branch())?;
    Ok(())
}

/// Append the fork root pattern to the ignore file unless an equivalent
/// line is already there. Creates the file if needed.
///
/// Returns whether the file changed.
fn ensure_ignored(paths: &ForkPaths) -> Result<bool, ForkError> {
    let file = paths.ignore_file();
    let pattern = paths.ignore_pattern();

    let existing = match fs::read_to_string(&file) {
        Ok(contents) => contents,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => String::new(),
        Err(e) => return Err(ForkError::Io { path: file, source: e }),
    };

    if existing.lines().any(|line| covers(line.trim(), &pattern)) {
        return Ok(false);
    }

    let mut out = fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&file)
        .map_err(ForkError::io(&file))?;
    let separator = if existing.is_empty() || existing.ends_with('\n') {
        ""
    } else {
        "\n"
    };
    writeln!(out, "{separator}{pattern}").map_err(ForkError::io(&file))?;

    tracing::debug!("added '{}' to {}", pattern, file.display());
    Ok(true)
}

/// Whether an ignore line excludes the fork root as `/<dir>/` does.
fn covers(line: &str, pattern: &str) -> bool {
    let dir = pattern.trim_matches('/');
    [
        dir.to_string(),
        format!("{dir}/"),
        format!("/{dir}"),
        format!("/{dir}/"),
    ]
    .iter()
    .any(|form| form == line)
}
