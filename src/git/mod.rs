//! git
//!
//! Single interface for all Git operations.
//!
//! # Architecture
//!
//! This module is the **only doorway** to the version-control engine. All
//! repository reads and writes flow through [`Git`]; no other module imports
//! `git2`. The fork subsystem composes these calls into policy (validation,
//! sequencing, conflict handling) without touching engine internals.
//!
//! # Responsibilities
//!
//! - Repository discovery, base/linked-worktree detection
//! - Ref operations (resolve, CAS update, branch create/delete)
//! - Graph queries (merge-base, is-ancestor, ahead counts)
//! - Status and in-progress state detection
//! - In-memory tree and file merges, commit creation
//! - Index snapshots for transactional updates
//! - Linked worktree add/prune
//!
//! # Invariants
//!
//! - Ref updates that advance a branch use CAS (compare-and-swap) semantics
//! - All operations return strong types (Oid, BranchName, RefName)
//!
//! # Example
//!
//! ```ignore
//! use forkline::git::Git;
//! use std::path::Path;
//!
//! let git = Git::open(Path::new("."))?;
//! let head = git.head_oid()?;
//! if git.is_merge_in_progress() {
//!     println!("finish or abort the merge first");
//! }
//! ```

mod interface;

pub use interface::{
    CommitInfo, DirtyPath, Git, GitError, GitState, IndexSnapshot, MergeOutcome, RepoInfo,
    TreeBlob, WorktreeChange, WorktreeStatus,
};
