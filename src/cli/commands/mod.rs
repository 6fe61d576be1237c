//! cli::commands
//!
//! Command dispatch and handlers.
//!
//! # Architecture
//!
//! Each command handler:
//! 1. Opens the workspace from the context's directory
//! 2. Calls the fork operation
//! 3. Formats and displays output
//!
//! Handlers do NOT perform repository mutations directly.

mod fork;

pub use fork::fork;

use crate::cli::args::Command;
use crate::cli::Context;
use anyhow::Result;

/// Dispatch a command to its handler.
pub fn dispatch(command: Command, ctx: &Context) -> Result<()> {
    match command {
        Command::Fork(args) => fork::fork(ctx, args.action()),
    }
}
