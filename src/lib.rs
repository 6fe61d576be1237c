//! Forkline - a concise git front-end built around forks
//!
//! A fork is a secondary working tree of a repository with its own branch.
//! Forkline creates forks next to the base working tree, lists them, and
//! folds their work back into the base branch either as one squashed commit
//! (promote) or as a fast-forward or merge (pick).
//!
//! # Architecture
//!
//! - [`cli`] - Command-line interface layer (parses args, delegates to fork operations)
//! - [`fork`] - Fork lifecycle: create, list, promote, pick, delete
//! - [`core`] - Domain types, naming rules, paths and configuration
//! - [`git`] - Single interface for all Git operations
//! - [`ui`] - User-facing output
//! - [`logging`] - Diagnostic tracing setup
//!
//! # Correctness Invariants
//!
//! 1. A fork's working tree, worktree entry and branch share one name
//! 2. The base branch only moves by compare-and-swap
//! 3. A failed promote or pick leaves the base working tree as it was
//! 4. Forks are never removed implicitly

pub mod cli;
pub mod core;
pub mod fork;
pub mod git;
pub mod logging;
pub mod ui;
