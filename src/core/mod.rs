//! core
//!
//! Core domain types, naming rules, path routing, and configuration.
//!
//! # Modules
//!
//! - [`types`] - Strong types: BranchName, Oid, RefName
//! - [`naming`] - Fork naming rules and validation
//! - [`paths`] - Centralized path routing for fork storage
//! - [`config`] - Configuration schema and loading
//!
//! Nothing in `core` touches the repository; every type here can be built
//! and tested without git.

pub mod config;
pub mod naming;
pub mod paths;
pub mod types;
