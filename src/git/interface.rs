//! git::interface
//!
//! Git interface implementation using git2.
//!
//! [`Git`] wraps one `git2::Repository` handle. Both the base working tree
//! and every fork are opened through it; a fork is simply a linked working
//! tree that shares the base's object store and refs.
//!
//! # Error Handling
//!
//! Git errors are categorized into typed variants:
//! - [`GitError::NotARepo`]: Not inside a Git repository
//! - [`GitError::RefNotFound`]: Requested ref does not exist
//! - [`GitError::CasFailed`]: Compare-and-swap precondition failed
//! - [`GitError::OperationInProgress`]: Rebase/merge/cherry-pick in progress
//! - [`GitError::DirtyWorktree`]: Uncommitted changes block the operation
//! - [`GitError::NoIdentity`]: No committer identity configured
//!
//! # Example
//!
//! ```ignore
//! use forkline::git::Git;
//! use std::path::Path;
//!
//! let git = Git::open(Path::new("."))?;
//! let oid = git.resolve_ref("refs/heads/main")?;
//! println!("main is at {}", oid.short(7));
//! ```

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::core::types::{BranchName, Oid, RefName, TypeError};

/// Errors from Git operations.
#[derive(Debug, Error)]
pub enum GitError {
    /// Not inside a Git repository.
    #[error("not a git repository: {path}")]
    NotARepo {
        /// The path that was searched
        path: PathBuf,
    },

    /// Repository is bare (no working directory).
    #[error("bare repository not supported")]
    BareRepo,

    /// Requested ref does not exist.
    #[error("ref not found: {refname}")]
    RefNotFound {
        /// The ref that was not found
        refname: String,
    },

    /// Compare-and-swap precondition failed.
    ///
    /// The ref moved between planning and applying an update.
    #[error("CAS failed for {refname}: expected {expected}, found {actual}")]
    CasFailed {
        /// The ref being updated
        refname: String,
        /// The expected old value
        expected: String,
        /// The actual current value
        actual: String,
    },

    /// Git operation in progress (rebase, merge, etc.).
    #[error("{operation} in progress")]
    OperationInProgress {
        /// The type of operation in progress
        operation: GitState,
    },

    /// Uncommitted changes block the operation.
    #[error("working tree is dirty: {details}")]
    DirtyWorktree {
        /// Description of what's dirty
        details: String,
    },

    /// Object not found in repository.
    #[error("object not found: {oid}")]
    ObjectNotFound {
        /// The OID that was not found
        oid: String,
    },

    /// Invalid object id format.
    #[error("invalid object id: {oid}")]
    InvalidOid {
        /// The invalid OID string
        oid: String,
    },

    /// Invalid ref name format.
    #[error("invalid ref name: {message}")]
    InvalidRefName {
        /// Description of the problem
        message: String,
    },

    /// No user.name / user.email to author commits with.
    #[error("no commit identity configured (set user.name and user.email): {message}")]
    NoIdentity {
        /// The underlying error message
        message: String,
    },

    /// Permission or filesystem error.
    #[error("repository access error: {message}")]
    AccessError {
        /// Description of the error
        message: String,
    },

    /// Internal git2 error.
    #[error("git error: {message}")]
    Internal {
        /// The error message
        message: String,
    },
}

impl GitError {
    /// Create a GitError from a git2::Error, naming what was being accessed.
    fn from_git2(err: git2::Error, context: &str) -> Self {
        match err.code() {
            git2::ErrorCode::NotFound if context.starts_with("refs/") || context == "HEAD" => {
                GitError::RefNotFound {
                    refname: context.to_string(),
                }
            }
            git2::ErrorCode::NotFound => GitError::ObjectNotFound {
                oid: context.to_string(),
            },
            git2::ErrorCode::InvalidSpec => GitError::InvalidOid {
                oid: context.to_string(),
            },
            git2::ErrorCode::Locked => GitError::AccessError {
                message: format!("repository is locked: {}", err.message()),
            },
            git2::ErrorCode::Conflict | git2::ErrorCode::MergeConflict => {
                GitError::DirtyWorktree {
                    details: err.message().to_string(),
                }
            }
            _ => GitError::Internal {
                message: format!("{}: {}", context, err.message()),
            },
        }
    }
}

impl From<git2::Error> for GitError {
    fn from(err: git2::Error) -> Self {
        match err.code() {
            git2::ErrorCode::NotFound => GitError::RefNotFound {
                refname: err.message().to_string(),
            },
            git2::ErrorCode::InvalidSpec => GitError::InvalidOid {
                oid: err.message().to_string(),
            },
            _ => GitError::Internal {
                message: err.message().to_string(),
            },
        }
    }
}

impl From<TypeError> for GitError {
    fn from(err: TypeError) -> Self {
        match err {
            TypeError::InvalidOid(msg) => GitError::InvalidOid { oid: msg },
            TypeError::InvalidRefName(msg) => GitError::InvalidRefName { message: msg },
            TypeError::InvalidBranchName(msg) => GitError::InvalidRefName { message: msg },
        }
    }
}

fn to_git2(oid: &Oid) -> Result<git2::Oid, GitError> {
    git2::Oid::from_str(oid.as_str()).map_err(|e| GitError::from_git2(e, oid.as_str()))
}

fn from_git2(oid: git2::Oid) -> Result<Oid, GitError> {
    Ok(Oid::new(oid.to_string())?)
}

/// Information about a Git repository.
#[derive(Debug, Clone)]
pub struct RepoInfo {
    /// Git directory shared by every working tree of the repository
    pub common_dir: PathBuf,
    /// Path to working directory
    pub work_dir: PathBuf,
    /// Whether this handle is a linked working tree rather than the base
    pub is_linked_worktree: bool,
}

/// State of in-progress Git operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GitState {
    /// No operation in progress.
    Clean,
    /// Rebase in progress.
    Rebase,
    /// Merge in progress.
    Merge,
    /// Cherry-pick in progress.
    CherryPick,
    /// Revert in progress.
    Revert,
    /// Bisect in progress.
    Bisect,
    /// Apply mailbox in progress.
    ApplyMailbox,
}

impl GitState {
    /// Check if any operation is in progress.
    ///
    /// # Example
    ///
    /// ```
    /// use forkline::git::GitState;
    ///
    /// assert!(!GitState::Clean.is_in_progress());
    /// assert!(GitState::Merge.is_in_progress());
    /// ```
    pub fn is_in_progress(&self) -> bool {
        !matches!(self, GitState::Clean)
    }

    /// Get a human-readable description of the state.
    pub fn description(&self) -> &'static str {
        match self {
            GitState::Clean => "clean",
            GitState::Rebase => "rebase",
            GitState::Merge => "merge",
            GitState::CherryPick => "cherry-pick",
            GitState::Revert => "revert",
            GitState::Bisect => "bisect",
            GitState::ApplyMailbox => "apply-mailbox",
        }
    }

    /// The git command that abandons this operation, if there is one.
    pub fn abort_command(&self) -> Option<&'static str> {
        match self {
            GitState::Merge => Some("git merge --abort"),
            GitState::Rebase => Some("git rebase --abort"),
            GitState::CherryPick => Some("git cherry-pick --abort"),
            GitState::Revert => Some("git revert --abort"),
            GitState::Bisect => Some("git bisect reset"),
            GitState::ApplyMailbox => Some("git am --abort"),
            GitState::Clean => None,
        }
    }
}

impl std::fmt::Display for GitState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.description())
    }
}

/// How a path differs between the index and the working tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorktreeChange {
    /// Tracked file with edited content.
    Modified,
    /// Tracked file removed from disk.
    Deleted,
    /// Tracked file changed kind (file, symlink, submodule).
    TypeChange,
    /// File not known to the index.
    Untracked,
}

/// One path with uncommitted changes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirtyPath {
    /// Path relative to the working tree root, `/`-separated
    pub path: String,
    /// Index differs from HEAD
    pub staged: bool,
    /// Working tree differs from the index
    pub worktree: Option<WorktreeChange>,
    /// Unresolved merge conflict
    pub conflicted: bool,
}

impl DirtyPath {
    /// True for a tracked file whose content was edited without staging.
    ///
    /// Only these can be three-way merged in place.
    pub fn is_unstaged_edit(&self) -> bool {
        !self.staged && !self.conflicted && self.worktree == Some(WorktreeChange::Modified)
    }
}

/// Summary of working tree status.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorktreeStatus {
    /// Number of staged changes
    pub staged: usize,
    /// Number of unstaged changes to tracked files
    pub unstaged: usize,
    /// Number of untracked files (if requested)
    pub untracked: usize,
    /// Whether there are unresolved conflicts
    pub has_conflicts: bool,
}

impl WorktreeStatus {
    /// Check if the worktree is completely clean (no changes at all).
    pub fn is_clean(&self) -> bool {
        self.staged == 0 && self.unstaged == 0 && self.untracked == 0 && !self.has_conflicts
    }
}

/// Information about a commit.
#[derive(Debug, Clone)]
pub struct CommitInfo {
    /// The commit OID
    pub oid: Oid,
    /// First line of the commit message
    pub summary: String,
}

/// A file entry in a commit's tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeBlob {
    /// Object id of the entry
    pub oid: Oid,
    /// Raw git file mode (`0o100644`, `0o100755`, `0o120000`, ...)
    pub mode: u32,
}

impl TreeBlob {
    /// Mode of a regular, non-executable file.
    pub const MODE_FILE: u32 = 0o100644;
    /// Mode of an executable file.
    pub const MODE_EXECUTABLE: u32 = 0o100755;
    /// Mode of a symbolic link.
    pub const MODE_SYMLINK: u32 = 0o120000;

    /// Regular file (executable or not).
    pub fn is_file(&self) -> bool {
        self.mode == Self::MODE_FILE || self.mode == Self::MODE_EXECUTABLE
    }

    /// Symbolic link.
    pub fn is_symlink(&self) -> bool {
        self.mode == Self::MODE_SYMLINK
    }
}

/// Result of a three-way merge computed in memory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MergeOutcome {
    /// Every path merged; `tree` is the written result.
    Clean {
        /// The merged tree
        tree: Oid,
    },
    /// Some paths conflict; nothing was written.
    Conflicted {
        /// Conflicting paths, sorted
        paths: Vec<String>,
    },
}

/// Saved index entries for a set of paths, restorable with
/// [`Git::restore_index`].
pub struct IndexSnapshot {
    entries: Vec<(String, Option<git2::IndexEntry>)>,
}

impl std::fmt::Debug for IndexSnapshot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.entries.iter().map(|(path, entry)| (path, entry.is_some())))
            .finish()
    }
}

/// The Git interface.
///
/// This is the **single point of interaction** with Git. All repository
/// reads and writes flow through this interface.
///
/// # CAS Semantics
///
/// Branch advances go through [`Git::update_ref_cas`], which only succeeds
/// if the ref still holds the value observed while planning.
pub struct Git {
    /// The underlying git2 repository
    repo: git2::Repository,
}

impl std::fmt::Debug for Git {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Git")
            .field("path", &self.repo.path())
            .finish()
    }
}

impl Git {
    // =========================================================================
    // Repository Opening and Info
    // =========================================================================

    /// Open the repository containing `path`.
    ///
    /// Uses `git2::Repository::discover`, so `path` can be any directory
    /// within a working tree. Inside a fork this opens the fork's linked
    /// working tree; use [`Git::open_common`] to reach the base.
    ///
    /// # Errors
    ///
    /// - [`GitError::NotARepo`] if no repository is found
    /// - [`GitError::BareRepo`] if the repository has no working directory
    pub fn open(path: &Path) -> Result<Self, GitError> {
        let repo = git2::Repository::discover(path).map_err(|_| GitError::NotARepo {
            path: path.to_path_buf(),
        })?;

        if repo.is_bare() {
            return Err(GitError::BareRepo);
        }

        Ok(Self { repo })
    }

    /// Open the base working tree through the shared git directory.
    pub fn open_common(common_dir: &Path) -> Result<Self, GitError> {
        let repo = git2::Repository::open(common_dir).map_err(|_| GitError::NotARepo {
            path: common_dir.to_path_buf(),
        })?;

        if repo.is_bare() {
            return Err(GitError::BareRepo);
        }

        Ok(Self { repo })
    }

    /// Get repository information.
    pub fn info(&self) -> Result<RepoInfo, GitError> {
        Ok(RepoInfo {
            common_dir: self.repo.commondir().to_path_buf(),
            work_dir: self.work_dir()?.to_path_buf(),
            is_linked_worktree: self.repo.is_worktree(),
        })
    }

    fn work_dir(&self) -> Result<&Path, GitError> {
        self.repo.workdir().ok_or(GitError::BareRepo)
    }

    // =========================================================================
    // State Detection
    // =========================================================================

    /// Get the current Git state (rebase, merge, etc.).
    pub fn state(&self) -> GitState {
        match self.repo.state() {
            git2::RepositoryState::Clean => GitState::Clean,
            git2::RepositoryState::Rebase
            | git2::RepositoryState::RebaseInteractive
            | git2::RepositoryState::RebaseMerge => GitState::Rebase,
            git2::RepositoryState::Merge => GitState::Merge,
            git2::RepositoryState::CherryPick | git2::RepositoryState::CherryPickSequence => {
                GitState::CherryPick
            }
            git2::RepositoryState::Revert | git2::RepositoryState::RevertSequence => {
                GitState::Revert
            }
            git2::RepositoryState::Bisect => GitState::Bisect,
            git2::RepositoryState::ApplyMailbox | git2::RepositoryState::ApplyMailboxOrRebase => {
                GitState::ApplyMailbox
            }
        }
    }

    /// Check whether a merge is waiting to be concluded or aborted.
    pub fn is_merge_in_progress(&self) -> bool {
        self.state() == GitState::Merge
    }

    // =========================================================================
    // Working Tree Status
    // =========================================================================

    /// List every path with uncommitted changes.
    ///
    /// Untracked directories are expanded to individual files when
    /// `include_untracked` is set. Ignored files are never listed.
    pub fn dirty_paths(&self, include_untracked: bool) -> Result<Vec<DirtyPath>, GitError> {
        let mut opts = git2::StatusOptions::new();
        opts.include_untracked(include_untracked)
            .recurse_untracked_dirs(include_untracked)
            .include_ignored(false);

        let statuses = self.repo.statuses(Some(&mut opts))?;

        let mut paths = Vec::with_capacity(statuses.len());
        for entry in statuses.iter() {
            let status = entry.status();
            if status.is_ignored() {
                continue;
            }

            let worktree = if status.is_wt_new() {
                Some(WorktreeChange::Untracked)
            } else if status.is_wt_deleted() {
                Some(WorktreeChange::Deleted)
            } else if status.is_wt_typechange() {
                Some(WorktreeChange::TypeChange)
            } else if status.is_wt_modified() || status.is_wt_renamed() {
                Some(WorktreeChange::Modified)
            } else {
                None
            };

            paths.push(DirtyPath {
                path: String::from_utf8_lossy(entry.path_bytes()).into_owned(),
                staged: status.is_index_new()
                    || status.is_index_modified()
                    || status.is_index_deleted()
                    || status.is_index_renamed()
                    || status.is_index_typechange(),
                worktree,
                conflicted: status.is_conflicted(),
            });
        }

        Ok(paths)
    }

    /// Get working tree status summary.
    pub fn worktree_status(&self, include_untracked: bool) -> Result<WorktreeStatus, GitError> {
        let mut result = WorktreeStatus::default();
        for path in self.dirty_paths(include_untracked)? {
            result.has_conflicts |= path.conflicted;
            if path.staged {
                result.staged += 1;
            }
            match path.worktree {
                Some(WorktreeChange::Untracked) => result.untracked += 1,
                Some(_) => result.unstaged += 1,
                None => {}
            }
        }
        Ok(result)
    }

    // =========================================================================
    // Refs and Branches
    // =========================================================================

    /// Resolve a ref to the commit it points at.
    ///
    /// # Errors
    ///
    /// - [`GitError::RefNotFound`] if the ref doesn't exist
    pub fn resolve_ref(&self, refname: &str) -> Result<Oid, GitError> {
        let commit = self
            .repo
            .find_reference(refname)
            .and_then(|reference| reference.peel_to_commit())
            .map_err(|e| GitError::from_git2(e, refname))?;
        from_git2(commit.id())
    }

    /// Resolve a ref, returning None if it doesn't exist.
    pub fn try_resolve_ref(&self, refname: &str) -> Result<Option<Oid>, GitError> {
        match self.resolve_ref(refname) {
            Ok(oid) => Ok(Some(oid)),
            Err(GitError::RefNotFound { .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Get HEAD commit OID.
    ///
    /// # Errors
    ///
    /// - [`GitError::RefNotFound`] if HEAD is unborn (no commits yet)
    pub fn head_oid(&self) -> Result<Oid, GitError> {
        let commit = self
            .repo
            .head()
            .and_then(|head| head.peel_to_commit())
            .map_err(|e| match e.code() {
                git2::ErrorCode::UnbornBranch => GitError::RefNotFound {
                    refname: "HEAD".to_string(),
                },
                _ => GitError::from_git2(e, "HEAD"),
            })?;
        from_git2(commit.id())
    }

    /// Get the current branch name, if on a branch.
    ///
    /// Returns `None` if HEAD is detached or unborn.
    pub fn current_branch(&self) -> Result<Option<BranchName>, GitError> {
        let head = match self.repo.head() {
            Ok(h) => h,
            Err(e) if e.code() == git2::ErrorCode::UnbornBranch => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        match (head.is_branch(), head.shorthand()) {
            (true, Some(name)) => Ok(Some(BranchName::new(name)?)),
            _ => Ok(None),
        }
    }

    /// List all local branches, sorted by name.
    pub fn list_branches(&self) -> Result<Vec<BranchName>, GitError> {
        let mut names = Vec::new();
        for branch in self.repo.branches(Some(git2::BranchType::Local))? {
            let (branch, _) = branch?;
            // Names git accepts but our stricter types do not are skipped.
            if let Some(name) = branch.name()? {
                if let Ok(name) = BranchName::new(name) {
                    names.push(name);
                }
            }
        }
        names.sort();
        Ok(names)
    }

    /// Create a local branch pointing at `target`. Fails if it exists.
    pub fn create_branch(&self, name: &BranchName, target: &Oid) -> Result<(), GitError> {
        let commit = self.find_commit(target)?;
        self.repo
            .branch(name.as_str(), &commit, false)
            .map_err(|e| GitError::from_git2(e, RefName::for_branch(name).as_str()))?;
        Ok(())
    }

    /// Delete a local branch.
    ///
    /// Refused by git while the branch is checked out in any working tree.
    pub fn delete_branch(&self, name: &BranchName) -> Result<(), GitError> {
        let refname = RefName::for_branch(name);
        let mut branch = self
            .repo
            .find_branch(name.as_str(), git2::BranchType::Local)
            .map_err(|e| GitError::from_git2(e, refname.as_str()))?;
        branch
            .delete()
            .map_err(|e| GitError::from_git2(e, refname.as_str()))
    }

    /// Update a ref with compare-and-swap semantics.
    ///
    /// With `expected_old` set, the update only happens if the ref currently
    /// points there. With `None`, the ref must not exist yet.
    ///
    /// # Errors
    ///
    /// - [`GitError::CasFailed`] if the current value doesn't match expected
    pub fn update_ref_cas(
        &self,
        refname: &str,
        new_oid: &Oid,
        expected_old: Option<&Oid>,
        message: &str,
    ) -> Result<(), GitError> {
        let current = self.try_resolve_ref_raw(refname)?;
        let expected = expected_old.map(|oid| oid.as_str().to_string());

        if current != expected {
            return Err(GitError::CasFailed {
                refname: refname.to_string(),
                expected: expected.unwrap_or_else(|| "<none>".to_string()),
                actual: current.unwrap_or_else(|| "<none>".to_string()),
            });
        }

        let target = to_git2(new_oid)?;
        match expected_old {
            Some(old) => self.repo.reference_matching(
                refname,
                target,
                true,
                to_git2(old)?,
                message,
            ),
            None => self.repo.reference(refname, target, false, message),
        }
        .map_err(|e| GitError::from_git2(e, refname))?;

        Ok(())
    }

    /// Resolve a ref to its raw target without peeling.
    fn try_resolve_ref_raw(&self, refname: &str) -> Result<Option<String>, GitError> {
        match self.repo.find_reference(refname) {
            Ok(reference) => {
                let resolved = reference.resolve()?;
                let oid = resolved.target().ok_or_else(|| GitError::Internal {
                    message: format!("ref {} has no target", refname),
                })?;
                Ok(Some(oid.to_string()))
            }
            Err(e) if e.code() == git2::ErrorCode::NotFound => Ok(None),
            Err(e) => Err(GitError::from_git2(e, refname)),
        }
    }

    // =========================================================================
    // Ancestry Queries
    // =========================================================================

    /// Find the merge base (common ancestor) of two commits.
    ///
    /// Returns `None` if there is no common ancestor.
    pub fn merge_base(&self, a: &Oid, b: &Oid) -> Result<Option<Oid>, GitError> {
        match self.repo.merge_base(to_git2(a)?, to_git2(b)?) {
            Ok(oid) => Ok(Some(from_git2(oid)?)),
            Err(e) if e.code() == git2::ErrorCode::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Check if `ancestor` is an ancestor of `descendant`.
    ///
    /// Returns true if ancestor == descendant.
    pub fn is_ancestor(&self, ancestor: &Oid, descendant: &Oid) -> Result<bool, GitError> {
        if ancestor == descendant {
            return Ok(true);
        }
        Ok(self
            .repo
            .graph_descendant_of(to_git2(descendant)?, to_git2(ancestor)?)?)
    }

    /// Count commits reachable from `tip` but not from `base`.
    pub fn commit_count(&self, base: &Oid, tip: &Oid) -> Result<usize, GitError> {
        Ok(self.walk(base, tip)?.count())
    }

    /// Commits reachable from `tip` but not from `base`, oldest first.
    pub fn commits_between(&self, base: &Oid, tip: &Oid) -> Result<Vec<Oid>, GitError> {
        let mut revwalk = self.walk(base, tip)?;
        revwalk.set_sorting(git2::Sort::TOPOLOGICAL | git2::Sort::REVERSE)?;
        revwalk
            .map(|oid| from_git2(oid?))
            .collect::<Result<Vec<_>, _>>()
    }

    fn walk(&self, base: &Oid, tip: &Oid) -> Result<git2::Revwalk<'_>, GitError> {
        let mut revwalk = self.repo.revwalk()?;
        revwalk.push(to_git2(tip)?)?;
        revwalk.hide(to_git2(base)?)?;
        Ok(revwalk)
    }

    // =========================================================================
    // Objects
    // =========================================================================

    fn find_commit(&self, oid: &Oid) -> Result<git2::Commit<'_>, GitError> {
        self.repo
            .find_commit(to_git2(oid)?)
            .map_err(|e| GitError::from_git2(e, oid.as_str()))
    }

    fn commit_tree_object(&self, oid: &Oid) -> Result<git2::Tree<'_>, GitError> {
        self.find_commit(oid)?
            .tree()
            .map_err(|e| GitError::from_git2(e, oid.as_str()))
    }

    /// Get information about a commit.
    pub fn commit_info(&self, oid: &Oid) -> Result<CommitInfo, GitError> {
        let commit = self.find_commit(oid)?;
        Ok(CommitInfo {
            oid: oid.clone(),
            summary: String::from_utf8_lossy(commit.summary_bytes().unwrap_or_default())
                .into_owned(),
        })
    }

    /// The tree a commit records.
    pub fn commit_tree(&self, oid: &Oid) -> Result<Oid, GitError> {
        from_git2(self.commit_tree_object(oid)?.id())
    }

    /// Write content as a blob and return its OID.
    pub fn write_blob(&self, content: &[u8]) -> Result<Oid, GitError> {
        from_git2(self.repo.blob(content)?)
    }

    /// Read a blob's content.
    pub fn read_blob(&self, oid: &Oid) -> Result<Vec<u8>, GitError> {
        let blob = self
            .repo
            .find_blob(to_git2(oid)?)
            .map_err(|e| GitError::from_git2(e, oid.as_str()))?;
        Ok(blob.content().to_vec())
    }

    /// Look up the entry at `path` in a commit's tree.
    ///
    /// Returns `None` if the commit has no file at that path.
    pub fn tree_entry(&self, commit: &Oid, path: &str) -> Result<Option<TreeBlob>, GitError> {
        let tree = self.commit_tree_object(commit)?;
        let entry = match tree.get_path(Path::new(path)) {
            Ok(entry) => entry,
            Err(e) if e.code() == git2::ErrorCode::NotFound => return Ok(None),
            Err(e) => return Err(GitError::from_git2(e, path)),
        };
        if entry.kind() == Some(git2::ObjectType::Tree) {
            return Ok(None);
        }
        Ok(Some(TreeBlob {
            oid: from_git2(entry.id())?,
            mode: u32::try_from(entry.filemode()).unwrap_or_default(),
        }))
    }

    /// Paths whose content differs between two commits.
    ///
    /// Renames are reported as a deletion of the old path plus an addition
    /// of the new one. The result is sorted.
    pub fn changed_paths(&self, from: &Oid, to: &Oid) -> Result<Vec<String>, GitError> {
        let old = self.commit_tree_object(from)?;
        let new = self.commit_tree_object(to)?;
        let diff = self.repo.diff_tree_to_tree(Some(&old), Some(&new), None)?;

        let mut paths = BTreeSet::new();
        for delta in diff.deltas() {
            for file in [delta.old_file(), delta.new_file()] {
                if let Some(path) = file.path() {
                    paths.insert(path.to_string_lossy().replace('\\', "/"));
                }
            }
        }
        Ok(paths.into_iter().collect())
    }

    /// Create a commit object without moving any ref.
    ///
    /// Author and committer come from the repository's configured identity.
    pub fn create_commit(
        &self,
        tree: &Oid,
        parents: &[Oid],
        message: &str,
    ) -> Result<Oid, GitError> {
        let signature = self.repo.signature().map_err(|e| GitError::NoIdentity {
            message: e.message().to_string(),
        })?;
        let tree = self
            .repo
            .find_tree(to_git2(tree)?)
            .map_err(|e| GitError::from_git2(e, tree.as_str()))?;
        let parents = parents
            .iter()
            .map(|oid| self.find_commit(oid))
            .collect::<Result<Vec<_>, _>>()?;
        let parent_refs: Vec<&git2::Commit<'_>> = parents.iter().collect();

        let oid = self
            .repo
            .commit(None, &signature, &signature, message, &tree, &parent_refs)?;
        from_git2(oid)
    }

    // =========================================================================
    // Merging
    // =========================================================================

    /// Three-way merge of the trees of three commits, in memory.
    ///
    /// Neither the index nor the working tree is touched.
    pub fn merge_trees(
        &self,
        ancestor: &Oid,
        ours: &Oid,
        theirs: &Oid,
    ) -> Result<MergeOutcome, GitError> {
        let ancestor = self.commit_tree_object(ancestor)?;
        let ours = self.commit_tree_object(ours)?;
        let theirs = self.commit_tree_object(theirs)?;
        let mut index = self.repo.merge_trees(&ancestor, &ours, &theirs, None)?;
        self.merge_outcome(&mut index)
    }

    /// Merge two commits using their merge base, in memory.
    pub fn merge_commits(&self, ours: &Oid, theirs: &Oid) -> Result<MergeOutcome, GitError> {
        let ours = self.find_commit(ours)?;
        let theirs = self.find_commit(theirs)?;
        let mut index = self.repo.merge_commits(&ours, &theirs, None)?;
        self.merge_outcome(&mut index)
    }

    fn merge_outcome(&self, index: &mut git2::Index) -> Result<MergeOutcome, GitError> {
        if index.has_conflicts() {
            return Ok(MergeOutcome::Conflicted {
                paths: conflict_paths(index)?,
            });
        }
        let tree = index.write_tree_to(&self.repo)?;
        Ok(MergeOutcome::Clean {
            tree: from_git2(tree)?,
        })
    }

    /// Merge one file's three versions at region granularity.
    ///
    /// Returns the merged content, or `None` when the same region changed
    /// on both sides.
    pub fn merge_file(
        &self,
        path: &str,
        ancestor: &Oid,
        ours: &Oid,
        theirs: &Oid,
        mode: u32,
    ) -> Result<Option<Vec<u8>>, GitError> {
        let entry = |oid: &Oid| -> Result<git2::IndexEntry, GitError> {
            let id = to_git2(oid)?;
            let size = self
                .repo
                .find_blob(id)
                .map_err(|e| GitError::from_git2(e, oid.as_str()))?
                .size();
            Ok(git2::IndexEntry {
                ctime: git2::IndexTime::new(0, 0),
                mtime: git2::IndexTime::new(0, 0),
                dev: 0,
                ino: 0,
                mode,
                uid: 0,
                gid: 0,
                file_size: u32::try_from(size).unwrap_or(u32::MAX),
                id,
                flags: u16::try_from(path.len()).unwrap_or(0xfff).min(0xfff),
                flags_extended: 0,
                path: path.as_bytes().to_vec(),
            })
        };

        let result =
            self.repo
                .merge_file_from_index(&entry(ancestor)?, &entry(ours)?, &entry(theirs)?, None)?;
        if result.is_automergeable() {
            Ok(Some(result.content().to_vec()))
        } else {
            Ok(None)
        }
    }

    /// Start a real merge of `branch` into HEAD, leaving conflict markers in
    /// the working tree and `MERGE_HEAD` for the user to conclude.
    ///
    /// Returns the conflicted paths. If the merge cannot even start (for
    /// example because uncommitted changes would be overwritten), merge
    /// state is cleaned up and the error is returned.
    pub fn start_merge(&self, branch: &BranchName) -> Result<Vec<String>, GitError> {
        let refname = RefName::for_branch(branch);
        let reference = self
            .repo
            .find_reference(refname.as_str())
            .map_err(|e| GitError::from_git2(e, refname.as_str()))?;
        let annotated = self.repo.reference_to_annotated_commit(&reference)?;

        let mut checkout = git2::build::CheckoutBuilder::new();
        checkout.safe().allow_conflicts(true).conflict_style_merge(true);

        if let Err(e) = self.repo.merge(&[&annotated], None, Some(&mut checkout)) {
            if let Err(cleanup) = self.repo.cleanup_state() {
                tracing::warn!("failed to clean up merge state: {}", cleanup.message());
            }
            return Err(GitError::from_git2(e, refname.as_str()));
        }

        conflict_paths(&self.repo.index()?)
    }

    // =========================================================================
    // Index
    // =========================================================================

    /// Record the current index entries for `paths`.
    pub fn snapshot_index(&self, paths: &[String]) -> Result<IndexSnapshot, GitError> {
        let index = self.repo.index()?;
        let entries = paths
            .iter()
            .map(|path| (path.clone(), index.get_path(Path::new(path), 0)))
            .collect();
        Ok(IndexSnapshot { entries })
    }

    /// Put back the index entries recorded in `snapshot` and write the index.
    pub fn restore_index(&self, snapshot: &IndexSnapshot) -> Result<(), GitError> {
        let mut index = self.repo.index()?;
        for (path, entry) in &snapshot.entries {
            match entry {
                Some(entry) => index.add(entry)?,
                None => remove_from_index(&mut index, path)?,
            }
        }
        index.write()?;
        Ok(())
    }

    /// Stage the working tree state of `paths`: present files are added,
    /// missing ones removed from the index. Writes the index.
    pub fn stage_paths(&self, paths: &[String]) -> Result<(), GitError> {
        let work_dir = self.work_dir()?.to_path_buf();
        let mut index = self.repo.index()?;
        for path in paths {
            if work_dir.join(path).symlink_metadata().is_ok() {
                index
                    .add_path(Path::new(path))
                    .map_err(|e| GitError::from_git2(e, path))?;
            } else {
                remove_from_index(&mut index, path)?;
            }
        }
        index.write()?;
        Ok(())
    }

    // =========================================================================
    // Linked Worktrees
    // =========================================================================

    /// Names of every linked worktree registered in the common dir.
    pub fn worktree_names(&self) -> Result<Vec<String>, GitError> {
        let names = self.repo.worktrees()?;
        Ok(names.iter().flatten().map(str::to_string).collect())
    }

    /// Add a linked worktree named `name` at `path` with `branch` checked out.
    ///
    /// `path` must not exist; its parent must.
    pub fn add_worktree(&self, name: &str, path: &Path, branch: &BranchName) -> Result<(), GitError> {
        let refname = RefName::for_branch(branch);
        let reference = self
            .repo
            .find_reference(refname.as_str())
            .map_err(|e| GitError::from_git2(e, refname.as_str()))?;

        let mut opts = git2::WorktreeAddOptions::new();
        opts.reference(Some(&reference));
        self.repo
            .worktree(name, path, Some(&opts))
            .map_err(|e| GitError::from_git2(e, name))?;
        Ok(())
    }

    /// Remove the administrative entry of worktree `name`.
    ///
    /// The working directory itself is left alone. Returns `false` if no
    /// such worktree is registered.
    pub fn prune_worktree(&self, name: &str) -> Result<bool, GitError> {
        if !self.worktree_names()?.iter().any(|n| n == name) {
            return Ok(false);
        }
        let worktree = self.repo.find_worktree(name)?;
        let mut opts = git2::WorktreePruneOptions::new();
        opts.valid(true).locked(true).working_tree(false);
        worktree
            .prune(Some(&mut opts))
            .map_err(|e| GitError::from_git2(e, name))?;
        Ok(true)
    }

    /// Prune worktree `name` only if its working directory is gone.
    ///
    /// Returns `true` if a stale entry was removed.
    pub fn prune_stale_worktree(&self, name: &str) -> Result<bool, GitError> {
        if !self.worktree_names()?.iter().any(|n| n == name) {
            return Ok(false);
        }
        let worktree = self.repo.find_worktree(name)?;
        if worktree.validate().is_ok() {
            return Ok(false);
        }
        worktree
            .prune(None)
            .map_err(|e| GitError::from_git2(e, name))?;
        Ok(true)
    }
}

fn conflict_paths(index: &git2::Index) -> Result<Vec<String>, GitError> {
    let mut paths = BTreeSet::new();
    for conflict in index.conflicts()? {
        let conflict = conflict?;
        let entry = conflict
            .our
            .as_ref()
            .or(conflict.their.as_ref())
            .or(conflict.ancestor.as_ref());
        if let Some(entry) = entry {
            paths.insert(String::from_utf8_lossy(&entry.path).into_owned());
        }
    }
    Ok(paths.into_iter().collect())
}

fn remove_from_index(index: &mut git2::Index, path: &str) -> Result<(), GitError> {
    match index.remove_path(Path::new(path)) {
        Ok(()) => Ok(()),
        Err(e) if e.code() == git2::ErrorCode::NotFound => Ok(()),
        Err(e) => Err(GitError::from_git2(e, path)),
    }
}
