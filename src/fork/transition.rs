//! fork::transition
//!
//! Moves the base working tree, index and branch from one commit to another
//! as a single transaction.
//!
//! # Phases
//!
//! 1. **Plan** (read-only): diff the two commits, match every changed path
//!    against the base's uncommitted state. Paths that would clobber
//!    uncommitted work are reported as blocked. With content merging
//!    enabled, an unstaged edit to a file the target also changes is merged
//!    at region level instead of blocking.
//! 2. **Apply**: snapshot the touched files and index entries, write the
//!    target content, stage it.
//! 3. **Commit point**: CAS update of the branch ref from the planned
//!    source commit to the target.
//!
//! Any failure in phase 2 or 3 restores the snapshot, so either the branch
//! moved and the tree matches it, or nothing changed.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use crate::core::types::{BranchName, Oid, RefName};
use crate::fork::ForkError;
use crate::git::{DirtyPath, Git, IndexSnapshot, TreeBlob};

/// One planned change to a path of the working tree.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Step {
    /// Remove a path the target no longer has.
    Remove { path: String },
    /// Write the target's content.
    Write { path: String, blob: TreeBlob },
    /// Stage the target's content but leave `content` (the target merged
    /// with an unstaged edit) in the working tree.
    Merged {
        path: String,
        blob: TreeBlob,
        content: Vec<u8>,
    },
}

impl Step {
    fn path(&self) -> &str {
        match self {
            Step::Remove { path } | Step::Write { path, .. } | Step::Merged { path, .. } => path,
        }
    }
}

/// A planned move of the base from `from` to `to`.
#[derive(Debug)]
pub(crate) struct Transition {
    from: Oid,
    to: Oid,
    steps: Vec<Step>,
}

/// Result of planning: the transition plus any paths that block it.
#[derive(Debug)]
pub(crate) struct Plan {
    pub transition: Transition,
    pub blocked: Vec<String>,
}

/// Plan moving the base working tree at `work_dir` from `from` to `to`.
pub(crate) fn plan(
    git: &Git,
    work_dir: &Path,
    from: &Oid,
    to: &Oid,
    merge_unstaged: bool,
) -> Result<Plan, ForkError> {
    let dirty: HashMap<String, DirtyPath> = git
        .dirty_paths(true)?
        .into_iter()
        .map(|d| (d.path.clone(), d))
        .collect();

    let mut steps = Vec::new();
    let mut blocked = Vec::new();

    for path in git.changed_paths(from, to)? {
        let old = git.tree_entry(from, &path)?;
        let new = git.tree_entry(to, &path)?;

        if new
            .as_ref()
            .is_some_and(|blob| !blob.is_file() && !blob.is_symlink())
        {
            tracing::debug!("{}: submodule entries are not applied", path);
            blocked.push(path);
            continue;
        }

        let Some(local) = dirty.get(&path) else {
            steps.push(match new {
                Some(blob) => Step::Write { path, blob },
                None => Step::Remove { path },
            });
            continue;
        };

        match (old, new) {
            (Some(old), Some(new))
                if merge_unstaged && local.is_unstaged_edit() && old.is_file() && new.is_file() =>
            {
                let full = work_dir.join(&path);
                let current = fs::read(&full).map_err(ForkError::io(&full))?;
                let ours = git.write_blob(&current)?;
                match git.merge_file(&path, &old.oid, &ours, &new.oid, new.mode)? {
                    Some(content) => {
                        tracing::debug!("{}: merged with unstaged edit", path);
                        steps.push(Step::Merged {
                            path,
                            blob: new,
                            content,
                        });
                    }
                    None => blocked.push(path),
                }
            }
            _ => blocked.push(path),
        }
    }

    // Removals first, so a file can be replaced by a directory of the same name.
    steps.sort_by_key(|step| !matches!(step, Step::Remove { .. }));

    Ok(Plan {
        transition: Transition {
            from: from.clone(),
            to: to.clone(),
            steps,
        },
        blocked,
    })
}

impl Transition {
    /// Apply the transition and advance `branch`, or restore everything.
    pub(crate) fn apply(
        &self,
        git: &Git,
        work_dir: &Path,
        branch: &BranchName,
        reflog: &str,
    ) -> Result<(), ForkError> {
        let paths: Vec<String> = self.steps.iter().map(|s| s.path().to_string()).collect();
        let files = snapshot_files(work_dir, &paths)?;
        let index = git.snapshot_index(&paths)?;

        let refname = RefName::for_branch(branch);
        let result = self.write(git, work_dir, &paths).and_then(|()| {
            git.update_ref_cas(refname.as_str(), &self.to, Some(&self.from), reflog)
                .map_err(ForkError::from)
        });

        match result {
            Ok(()) => {
                tracing::debug!(
                    "moved {} from {} to {} ({} path(s))",
                    refname,
                    self.from.short(7),
                    self.to.short(7),
                    paths.len()
                );
                Ok(())
            }
            Err(err) => {
                tracing::debug!("rolling back {} path(s) after: {}", paths.len(), err);
                match restore(git, work_dir, &files, &index) {
                    Ok(()) => Err(err),
                    Err(rollback) => Err(ForkError::RollbackFailed {
                        context: Box::new(err),
                        rollback: rollback.to_string(),
                    }),
                }
            }
        }
    }

    fn write(&self, git: &Git, work_dir: &Path, paths: &[String]) -> Result<(), ForkError> {
        for step in &self.steps {
            match step {
                Step::Remove { path } => remove_entry(work_dir, path)?,
                Step::Write { path, blob } | Step::Merged { path, blob, .. } => {
                    write_entry(work_dir, path, blob.mode, &git.read_blob(&blob.oid)?)?
                }
            }
        }

        git.stage_paths(paths)?;

        for step in &self.steps {
            if let Step::Merged {
                path,
                blob,
                content,
            } = step
            {
                write_entry(work_dir, path, blob.mode, content)?;
            }
        }
        Ok(())
    }
}

/// What a path held before the transition.
#[derive(Debug)]
enum Saved {
    Missing,
    File {
        content: Vec<u8>,
        permissions: fs::Permissions,
    },
    Symlink(std::path::PathBuf),
    /// A directory or something else the transition never replaces.
    Untouchable,
}

fn snapshot_files(work_dir: &Path, paths: &[String]) -> Result<Vec<(String, Saved)>, ForkError> {
    let mut saved = Vec::with_capacity(paths.len());
    for path in paths {
        let full = work_dir.join(path);
        let entry = match fs::symlink_metadata(&full) {
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Saved::Missing,
            // A parent is currently a file, so nothing can live here yet.
            Err(_) if !full.parent().is_some_and(Path::is_dir) => Saved::Missing,
            Err(e) => return Err(ForkError::Io { path: full, source: e }),
            Ok(meta) if meta.file_type().is_symlink() => {
                Saved::Symlink(fs::read_link(&full).map_err(ForkError::io(&full))?)
            }
            Ok(meta) if meta.is_file() => Saved::File {
                content: fs::read(&full).map_err(ForkError::io(&full))?,
                permissions: meta.permissions(),
            },
            Ok(_) => Saved::Untouchable,
        };
        saved.push((path.clone(), entry));
    }
    Ok(saved)
}

fn restore(
    git: &Git,
    work_dir: &Path,
    files: &[(String, Saved)],
    index: &IndexSnapshot,
) -> Result<(), ForkError> {
    restore_files(work_dir, files)?;
    git.restore_index(index)?;
    Ok(())
}

fn restore_files(work_dir: &Path, files: &[(String, Saved)]) -> Result<(), ForkError> {
    // Reverse of apply order: a directory written over a removed file is
    // cleared before the file comes back.
    for (path, saved) in files.iter().rev() {
        let full = work_dir.join(path);
        match saved {
            Saved::Missing => remove_entry(work_dir, path)?,
            Saved::File {
                content,
                permissions,
            } => {
                write_entry(work_dir, path, TreeBlob::MODE_FILE, content)?;
                fs::set_permissions(&full, permissions.clone()).map_err(ForkError::io(&full))?;
            }
            Saved::Symlink(target) => {
                clear(&full)?;
                make_symlink(target.as_os_str().as_encoded_bytes(), &full)?;
            }
            Saved::Untouchable => {}
        }
    }
    Ok(())
}

/// Replace whatever is at `path` with a file or symlink holding `content`.
fn write_entry(work_dir: &Path, path: &str, mode: u32, content: &[u8]) -> Result<(), ForkError> {
    let full = work_dir.join(path);
    if let Some(parent) = full.parent() {
        fs::create_dir_all(parent).map_err(ForkError::io(parent))?;
    }
    clear(&full)?;

    if mode == TreeBlob::MODE_SYMLINK {
        return make_symlink(content, &full);
    }
    fs::write(&full, content).map_err(ForkError::io(&full))?;
    if mode == TreeBlob::MODE_EXECUTABLE {
        set_executable(&full)?;
    }
    Ok(())
}

/// Remove the file at `path` and any parent directories left empty.
fn remove_entry(work_dir: &Path, path: &str) -> Result<(), ForkError> {
    let full = work_dir.join(path);
    clear(&full)?;

    let mut dir = full.parent();
    while let Some(current) = dir {
        if current == work_dir || fs::remove_dir(current).is_err() {
            break;
        }
        dir = current.parent();
    }
    Ok(())
}

/// Remove a file or symlink at `full`; directories are left in place.
fn clear(full: &Path) -> Result<(), ForkError> {
    match fs::symlink_metadata(full) {
        Ok(meta) if !meta.is_dir() => fs::remove_file(full).map_err(ForkError::io(full)),
        _ => Ok(()),
    }
}

#[cfg(unix)]
fn make_symlink(target: &[u8], link: &Path) -> Result<(), ForkError> {
    use std::os::unix::ffi::OsStrExt;
    std::os::unix::fs::symlink(std::ffi::OsStr::from_bytes(target), link)
        .map_err(ForkError::io(link))
}

#[cfg(not(unix))]
fn make_symlink(target: &[u8], link: &Path) -> Result<(), ForkError> {
    fs::write(link, target).map_err(ForkError::io(link))
}

#[cfg(unix)]
fn set_executable(path: &Path) -> Result<(), ForkError> {
    use std::os::unix::fs::PermissionsExt;
    let mut permissions = fs::metadata(path).map_err(ForkError::io(path))?.permissions();
    permissions.set_mode(permissions.mode() | 0o111);
    fs::set_permissions(path, permissions).map_err(ForkError::io(path))
}

#[cfg(not(unix))]
fn set_executable(_path: &Path) -> Result<(), ForkError> {
    Ok(())
}
