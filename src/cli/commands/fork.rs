//! fork command - Create, list, promote, pick and delete forks

use crate::cli::args::ForkAction;
use crate::cli::Context;
use crate::fork::{self, DeleteAllOutcome, ForkRegistry, PickMode, Workspace};
use crate::ui::output::{self, Verbosity};
use anyhow::{bail, Context as _, Result};

/// Run one `fl fork` action.
///
/// # Arguments
///
/// * `ctx` - Execution context
/// * `action` - What the flags asked for
pub fn fork(ctx: &Context, action: ForkAction) -> Result<()> {
    let cwd = ctx.cwd()?;
    let ws = Workspace::open(&cwd).context("Failed to open repository")?;
    let verbosity = Verbosity::from_flags(ctx.quiet || ws.config().quiet(), ctx.debug);
    output::debug(
        format!("base working tree: {}", ws.paths().work_dir.display()),
        verbosity,
    );
    for (scope, path) in [
        ("global", ws.config().global_config_loaded_from()),
        ("repo", ws.config().repo_config_loaded_from()),
    ] {
        if let Some(path) = path {
            output::debug(format!("{scope} config: {}", path.display()), verbosity);
        }
    }

    match action {
        ForkAction::List => list(&ws, verbosity),
        ForkAction::Create(name) => create(&ws, &name, verbosity),
        ForkAction::Promote(name) => promote(&ws, &name, verbosity),
        ForkAction::Pick(name) => pick(&ws, &name, verbosity),
        ForkAction::Delete(name) => delete(&ws, &name, verbosity),
        ForkAction::DeleteAll => delete_all(&ws, verbosity),
    }
}

fn list(ws: &Workspace, verbosity: Verbosity) -> Result<()> {
    let registry = ForkRegistry::load(ws)?;
    if registry.is_empty() {
        output::print("no forks", verbosity);
        return Ok(());
    }

    for fork in registry.list() {
        let mut line = format!("{}  +{} ahead", fork.name, fork.ahead_count);
        if fork.dirty_file_count > 0 {
            line.push_str(&format!(", {} uncommitted", fork.dirty_file_count));
        }
        output::print(line, verbosity);
    }
    Ok(())
}

fn create(ws: &Workspace, name: &str, verbosity: Verbosity) -> Result<()> {
    let created = fork::create(ws, name)?;
    if created.ignore_updated {
        output::debug(
            format!("added '{}' to .gitignore", ws.paths().ignore_pattern()),
            verbosity,
        );
    }
    output::print(format!("forked: {}", created.fork.name), verbosity);
    output::print(
        format!("  path: {}", created.fork.path.display()),
        verbosity,
    );
    Ok(())
}

fn promote(ws: &Workspace, name: &str, verbosity: Verbosity) -> Result<()> {
    let result = fork::promote(ws, name)?;
    match &result.commit {
        Some(commit) => output::print(
            format!(
                "promoted: {} ({} squashed into {})",
                result.name,
                output::count(result.commits_applied, "commit"),
                commit.short(7)
            ),
            verbosity,
        ),
        None => output::print(
            format!(
                "promoted: {} (0 commits transplanted, already up to date)",
                result.name
            ),
            verbosity,
        ),
    }
    Ok(())
}

fn pick(ws: &Workspace, name: &str, verbosity: Verbosity) -> Result<()> {
    if ws.config().warn_dirty_forks() {
        let registry = ForkRegistry::load(ws)?;
        let fork = registry.resolve(name)?;
        if fork.dirty_file_count > 0 {
            output::warn(
                format!(
                    "fork '{}' has {}; commit or discard them first",
                    fork.name,
                    output::count(fork.dirty_file_count, "uncommitted file")
                ),
                verbosity,
            );
        }
    }

    let result = fork::pick(ws, name)?;

    let short = result.commit.as_ref().map(|c| c.short(7)).unwrap_or("");
    match &result.mode {
        PickMode::AlreadyUpToDate => output::print(
            format!("picked: {} (already up to date)", result.name),
            verbosity,
        ),
        PickMode::FastForward => output::print(
            format!("picked: {} (fast-forward to {})", result.name, short),
            verbosity,
        ),
        PickMode::Merged => output::print(
            format!("picked: {} (merge commit {})", result.name, short),
            verbosity,
        ),
        PickMode::ConflictsPresent { paths } => {
            output::print(format!("picked: {} (conflicts)", result.name), verbosity);
            output::print(output::format_list(paths, "  conflict: "), verbosity);
            output::print(
                format!(
                    "resolve the conflicts, then 'git add' the files and 'git commit' \
                     to finish merging into {}, or run 'git merge --abort'",
                    result.base
                ),
                verbosity,
            );
        }
    }
    Ok(())
}

fn delete(ws: &Workspace, name: &str, verbosity: Verbosity) -> Result<()> {
    let deleted = fork::delete(ws, name)?;
    if deleted.discarded_files > 0 {
        output::warn(
            format!(
                "discarded {} from fork '{}'",
                output::count(deleted.discarded_files, "uncommitted file"),
                deleted.name
            ),
            verbosity,
        );
    }
    output::print(
        format!("deleted: {} (was {})", deleted.name, deleted.tip.short(7)),
        verbosity,
    );
    Ok(())
}

fn delete_all(ws: &Workspace, verbosity: Verbosity) -> Result<()> {
    let (deleted, failed) = match fork::delete_all(ws)? {
        DeleteAllOutcome::NoForks => {
            output::print("no forks to delete", verbosity);
            return Ok(());
        }
        DeleteAllOutcome::Processed { deleted, failed } => (deleted, failed),
    };

    let discarded: usize = deleted.iter().map(|d| d.discarded_files).sum();
    if discarded > 0 {
        output::warn(
            format!(
                "discarded {}",
                output::count(discarded, "uncommitted file")
            ),
            verbosity,
        );
    }
    if !deleted.is_empty() {
        let names: Vec<String> = deleted.iter().map(|d| d.name.to_string()).collect();
        output::print(format!("deleted: {}", names.join(", ")), verbosity);
    }

    if failed.is_empty() {
        return Ok(());
    }
    for (name, err) in &failed {
        output::error(format!("{name}: {err}"));
    }
    bail!(
        "{} could not be deleted",
        output::count(failed.len(), "fork")
    );
}
