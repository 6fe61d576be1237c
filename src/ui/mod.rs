//! ui
//!
//! User interaction utilities.
//!
//! # Modules
//!
//! - [`output`] - Output formatting and display
//!
//! Results go to stdout; warnings and errors go to stderr so scripted
//! callers can parse results without filtering diagnostics.

pub mod output;
