//! cli::args
//!
//! Command-line argument definitions using clap derive.
//!
//! # Global Flags
//!
//! These flags are available on all commands:
//! - `--help` / `-h`: Show help
//! - `--version`: Show version
//! - `--cwd <path>`: Run as if in that directory
//! - `--debug`: Enable debug logging
//! - `--quiet` / `-q`: Errors only

use clap::{ArgGroup, Args, Parser, Subcommand};
use std::path::PathBuf;

/// Forkline - parallel working trees you can fold back into your branch
#[derive(Parser, Debug)]
#[command(name = "fl")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Run as if fl was started in this directory
    #[arg(long, global = true)]
    pub cwd: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,

    /// Print errors only
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Parser::parse()
    }
}

/// Available commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Create, list, promote, pick and delete forks
    #[command(
        name = "fork",
        long_about = "Create, list, promote, pick and delete forks.\n\n\
            A fork is a second working tree of this repository with its own branch, \
            created under the fork root (.forks by default) from the current commit. \
            Commit in it as usual, then fold the work back: --promote squashes the \
            fork's net change into one new commit on your branch, --pick merges the \
            fork's branch (fast-forward when possible). Forks are only removed by \
            --delete or --delete-all.",
        after_help = "\
WORKFLOW EXAMPLES:
    # Start a fork and work in it
    fl fork experiment
    cd .forks/experiment

    # See every fork and how far ahead it is
    fl fork

    # Merge the fork's history into the current branch
    fl fork --pick experiment

    # Or land its net change as a single commit
    fl fork --promote experiment

    # Clean up
    fl fork --delete experiment"
    )]
    Fork(ForkArgs),
}

/// Arguments of `fl fork`. At most one action may be given.
#[derive(Args, Debug, Default, PartialEq, Eq)]
#[command(group(
    ArgGroup::new("action")
        .args(["name", "promote", "pick", "delete", "delete_all"])
        .multiple(false)
))]
pub struct ForkArgs {
    /// Create a fork with this name
    #[arg(value_name = "NAME")]
    pub name: Option<String>,

    /// Squash the fork's commits into one new commit on the current branch
    #[arg(long, value_name = "NAME")]
    pub promote: Option<String>,

    /// Merge the fork's branch into the current branch
    #[arg(long, value_name = "NAME")]
    pub pick: Option<String>,

    /// Remove the fork's working tree and branch
    #[arg(long, value_name = "NAME")]
    pub delete: Option<String>,

    /// Remove every fork
    #[arg(long)]
    pub delete_all: bool,
}

/// The single action a `fork` invocation asks for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ForkAction {
    List,
    Create(String),
    Promote(String),
    Pick(String),
    Delete(String),
    DeleteAll,
}

impl ForkArgs {
    /// Resolve the flags to one action; no flags means list.
    pub fn action(&self) -> ForkAction {
        if let Some(name) = &self.promote {
            ForkAction::Promote(name.clone())
        } else if let Some(name) = &self.pick {
            ForkAction::Pick(name.clone())
        } else if let Some(name) = &self.delete {
            ForkAction::Delete(name.clone())
        } else if self.delete_all {
            ForkAction::DeleteAll
        } else if let Some(name) = &self.name {
            ForkAction::Create(name.clone())
        } else {
            ForkAction::List
        }
    }
}
