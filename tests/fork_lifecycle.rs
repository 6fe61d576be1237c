//! Integration tests for the fork lifecycle against real repositories.
//!
//! Each test builds a throwaway repository with the git CLI, drives the
//! fork operations through the library, and checks the result with the git
//! CLI again so the assertions never depend on the code under test.
//!
//! Test matrix:
//! - create: listing, naming rules, ignore file, refusal inside a fork
//! - pick: up to date, fast-forward, merge, conflicts, dirty base and fork
//! - promote: empty fork, squash, unstaged base edits, conflicts
//! - delete / delete-all: removal of every part, refusals
//! - gating: merge in progress, detached HEAD

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use tempfile::TempDir;

use forkline::core::paths::ForkPaths;
use forkline::core::naming::NameError;
use forkline::fork::{self, DeleteAllOutcome, ForkError, ForkRegistry, PickMode, Workspace};
use forkline::git::GitState;

// =============================================================================
// Test Fixtures
// =============================================================================

/// Helper to run git commands in a directory.
fn run_git(dir: &Path, args: &[&str]) -> std::process::Output {
    Command::new("git")
        .args(args)
        .current_dir(dir)
        .output()
        .expect("git command failed to execute")
}

/// Helper to run git commands, assert success and return stdout as is.
fn git_stdout(dir: &Path, args: &[&str]) -> String {
    let output = run_git(dir, args);
    if !output.status.success() {
        panic!(
            "git {:?} failed: {}",
            args,
            String::from_utf8_lossy(&output.stderr)
        );
    }
    String::from_utf8_lossy(&output.stdout).into_owned()
}

/// Helper to run git commands, assert success and return trimmed stdout.
fn git_ok(dir: &Path, args: &[&str]) -> String {
    git_stdout(dir, args).trim().to_string()
}

/// A repository on branch `main` with one commit holding `README.md`.
struct TestRepo {
    dir: TempDir,
}

impl TestRepo {
    fn new() -> Self {
        let dir = TempDir::new().expect("failed to create temp dir");
        let path = dir.path();
        git_ok(path, &["init", "-q"]);
        git_ok(path, &["symbolic-ref", "HEAD", "refs/heads/main"]);
        git_ok(path, &["config", "user.email", "test@example.com"]);
        git_ok(path, &["config", "user.name", "Test User"]);
        git_ok(path, &["config", "commit.gpgsign", "false"]);

        let repo = Self { dir };
        repo.commit_file(repo.path(), "README.md", "# Test\n", "Initial commit");
        repo
    }

    fn path(&self) -> &Path {
        self.dir.path()
    }

    fn workspace(&self) -> Workspace {
        Workspace::open(self.path()).expect("failed to open workspace")
    }

    fn fork_path(&self, name: &str) -> PathBuf {
        self.path().join(".forks").join(name)
    }

    fn create(&self, name: &str) -> PathBuf {
        fork::create(&self.workspace(), name).expect("create failed");
        self.fork_path(name)
    }

    /// Write `file` in `dir`, stage it and commit.
    fn commit_file(&self, dir: &Path, file: &str, content: &str, message: &str) {
        fs::write(dir.join(file), content).unwrap();
        git_ok(dir, &["add", file]);
        git_ok(dir, &["commit", "-q", "-m", message]);
    }

    fn rev(&self, rev: &str) -> String {
        git_ok(self.path(), &["rev-parse", rev])
    }

    fn read(&self, file: &str) -> String {
        fs::read_to_string(self.path().join(file)).unwrap()
    }

    /// `git status --porcelain` of the base, ignoring the untracked ignore file.
    ///
    /// Lines keep their leading status column (` M file` is unstaged).
    fn status(&self) -> Vec<String> {
        git_stdout(self.path(), &["status", "--porcelain"])
            .trim_end()
            .lines()
            .filter(|line| !line.ends_with(".gitignore"))
            .map(str::to_string)
            .collect()
    }
}

/// Ten numbered lines, for edits far enough apart to merge cleanly.
fn numbered() -> String {
    (1..=10).map(|n| format!("line {n}\n")).collect()
}

fn replace_line(content: &str, n: usize, with: &str) -> String {
    content
        .lines()
        .enumerate()
        .map(|(i, line)| {
            if i + 1 == n {
                format!("{with}\n")
            } else {
                format!("{line}\n")
            }
        })
        .collect()
}

// =============================================================================
// Create and List
// =============================================================================

mod create_and_list {
    use super::*;

    #[test]
    fn create_then_list_shows_zero_ahead() {
        let repo = TestRepo::new();
        let ws = repo.workspace();
        let created = fork::create(&ws, "feature").unwrap();

        assert_eq!(created.fork.name.as_str(), "feature");
        assert!(created.fork.path.ends_with(".forks/feature"));
        assert!(created.ignore_updated);
        assert!(repo.fork_path("feature").join("README.md").exists());

        let registry = ForkRegistry::load(&repo.workspace()).unwrap();
        let listed: Vec<_> = registry.list().collect();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].name.as_str(), "feature");
        assert_eq!(listed[0].ahead_count, 0);
        assert_eq!(listed[0].dirty_file_count, 0);
        assert_eq!(listed[0].tip.as_str(), repo.rev("HEAD"));
    }

    #[test]
    fn fork_has_its_own_branch() {
        let repo = TestRepo::new();
        let fork_dir = repo.create("feature");

        assert_eq!(git_ok(&fork_dir, &["branch", "--show-current"]), "feature");
        assert_eq!(git_ok(repo.path(), &["branch", "--show-current"]), "main");
        assert_eq!(repo.rev("feature"), repo.rev("main"));
    }

    #[test]
    fn list_counts_commits_and_dirty_files() {
        let repo = TestRepo::new();
        let fork_dir = repo.create("feature");
        repo.commit_file(&fork_dir, "a.txt", "a\n", "add a");
        repo.commit_file(&fork_dir, "b.txt", "b\n", "add b");
        fs::write(fork_dir.join("scratch.txt"), "wip\n").unwrap();

        let registry = ForkRegistry::load(&repo.workspace()).unwrap();
        let fork = registry.resolve("feature").unwrap();
        assert_eq!(fork.ahead_count, 2);
        assert_eq!(fork.dirty_file_count, 1);
    }

    #[test]
    fn registry_keeps_fork_branch_when_another_is_checked_out() {
        let repo = TestRepo::new();
        let fork_dir = repo.create("feat");
        git_ok(&fork_dir, &["checkout", "-q", "-b", "dev"]);
        repo.commit_file(&fork_dir, "dev.txt", "dev\n", "dev work");

        let registry = ForkRegistry::load(&repo.workspace()).unwrap();
        let fork = registry.resolve("feat").unwrap();
        assert_eq!(fork.branch.as_str(), "feat");
        assert!(fork.branch_exists);
        assert_eq!(fork.checked_out.as_ref().map(|b| b.as_str()), Some("dev"));
        assert_eq!(fork.tip.as_str(), repo.rev("feat"));
        assert_eq!(fork.ahead_count, 0);
    }

    #[test]
    fn status_keeps_the_unstaged_column() {
        let repo = TestRepo::new();
        fs::write(repo.path().join("README.md"), "# Changed\n").unwrap();
        assert_eq!(repo.status(), vec![" M README.md".to_string()]);
    }

    #[test]
    fn list_is_sorted_and_empty_without_forks() {
        let repo = TestRepo::new();
        assert!(ForkRegistry::load(&repo.workspace()).unwrap().is_empty());

        repo.create("zeta");
        repo.create("alpha");
        let names: Vec<String> = ForkRegistry::load(&repo.workspace())
            .unwrap()
            .names()
            .iter()
            .map(ToString::to_string)
            .collect();
        assert_eq!(names, vec!["alpha", "zeta"]);
    }

    #[test]
    fn ignore_pattern_written_once() {
        let repo = TestRepo::new();
        repo.create("one");
        repo.create("two");

        let ignore = repo.read(".gitignore");
        assert_eq!(ignore.matches("/.forks/").count(), 1);
        assert!(repo.status().is_empty(), "{:?}", repo.status());
    }

    #[test]
    fn existing_ignore_entry_is_kept() {
        let repo = TestRepo::new();
        repo.commit_file(repo.path(), ".gitignore", "target\n.forks/\n", "ignore");

        let created = fork::create(&repo.workspace(), "feature").unwrap();
        assert!(!created.ignore_updated);
        assert_eq!(repo.read(".gitignore"), "target\n.forks/\n");
    }

    #[test]
    fn configured_fork_dir_is_used() {
        let repo = TestRepo::new();
        let config_path = ForkPaths::config_path_in(&repo.path().join(".git"));
        fs::create_dir_all(config_path.parent().unwrap()).unwrap();
        fs::write(&config_path, "fork_dir = \"wt\"\n").unwrap();

        let created = fork::create(&repo.workspace(), "feature").unwrap();
        assert!(created.fork.path.ends_with("wt/feature"));
        assert!(repo.read(".gitignore").contains("/wt/"));
        assert_eq!(ForkRegistry::load(&repo.workspace()).unwrap().len(), 1);
    }

    #[test]
    fn invalid_names_rejected() {
        let repo = TestRepo::new();
        let ws = repo.workspace();

        for name in ["", "a/b", ".hidden", "a..b", "has space"] {
            let err = fork::create(&ws, name).unwrap_err();
            assert!(matches!(err, ForkError::InvalidName(_)), "{name}: {err}");
        }
        assert!(!repo.path().join(".forks").exists());
    }

    #[test]
    fn collisions_rejected() {
        let repo = TestRepo::new();
        repo.create("feature");
        git_ok(repo.path(), &["branch", "taken"]);
        let ws = repo.workspace();

        assert!(matches!(
            fork::create(&ws, "feature"),
            Err(ForkError::InvalidName(NameError::ForkExists(_)))
        ));
        assert!(matches!(
            fork::create(&ws, "taken"),
            Err(ForkError::InvalidName(NameError::BranchExists(_)))
        ));
        assert!(matches!(
            fork::create(&ws, "main"),
            Err(ForkError::InvalidName(NameError::BranchExists(_)))
        ));
    }

    #[test]
    fn refused_inside_fork() {
        let repo = TestRepo::new();
        let fork_dir = repo.create("feature");

        let ws = Workspace::open(&fork_dir).unwrap();
        assert!(matches!(
            fork::create(&ws, "nested"),
            Err(ForkError::InsideFork { .. })
        ));
    }

    #[test]
    fn listing_works_from_inside_fork() {
        let repo = TestRepo::new();
        let fork_dir = repo.create("feature");
        repo.create("other");

        let ws = Workspace::open(&fork_dir).unwrap();
        assert_eq!(ForkRegistry::load(&ws).unwrap().len(), 2);
    }
}

// =============================================================================
// Pick
// =============================================================================

mod pick {
    use super::*;

    #[test]
    fn untouched_fork_is_up_to_date() {
        let repo = TestRepo::new();
        repo.create("feature");
        let before = repo.rev("HEAD");

        let result = fork::pick(&repo.workspace(), "feature").unwrap();
        assert_eq!(result.mode, PickMode::AlreadyUpToDate);
        assert_eq!(result.commit, None);
        assert_eq!(repo.rev("HEAD"), before);
    }

    #[test]
    fn fast_forward_brings_files_into_base() {
        let repo = TestRepo::new();
        let fork_dir = repo.create("feature");
        repo.commit_file(&fork_dir, "new.txt", "hello\n", "add new");

        let result = fork::pick(&repo.workspace(), "feature").unwrap();
        assert_eq!(result.mode, PickMode::FastForward);
        assert_eq!(result.base.as_str(), "main");
        assert_eq!(repo.rev("main"), repo.rev("feature"));
        assert_eq!(result.commit.unwrap().as_str(), repo.rev("main"));
        assert_eq!(repo.read("new.txt"), "hello\n");
        assert!(repo.status().is_empty(), "{:?}", repo.status());
    }

    #[test]
    fn fast_forward_keeps_base_edits() {
        let repo = TestRepo::new();
        let fork_dir = repo.create("feature");
        repo.commit_file(&fork_dir, "new.txt", "hello\n", "add new");

        fs::write(repo.path().join("README.md"), "# Edited\n").unwrap();
        fs::write(repo.path().join("notes.txt"), "mine\n").unwrap();
        fs::write(repo.path().join("staged.txt"), "staged\n").unwrap();
        git_ok(repo.path(), &["add", "staged.txt"]);

        fork::pick(&repo.workspace(), "feature").unwrap();

        assert_eq!(repo.read("README.md"), "# Edited\n");
        assert_eq!(repo.read("notes.txt"), "mine\n");
        assert_eq!(repo.read("new.txt"), "hello\n");
        let status = repo.status();
        assert!(status.contains(&" M README.md".to_string()), "{status:?}");
        assert!(status.contains(&"A  staged.txt".to_string()), "{status:?}");
        assert!(status.contains(&"?? notes.txt".to_string()), "{status:?}");
    }

    #[test]
    fn diverged_histories_get_a_merge_commit() {
        let repo = TestRepo::new();
        let fork_dir = repo.create("feature");
        repo.commit_file(&fork_dir, "a.txt", "a\n", "fork side");
        repo.commit_file(repo.path(), "b.txt", "b\n", "base side");
        let base_before = repo.rev("main");

        let result = fork::pick(&repo.workspace(), "feature").unwrap();
        assert_eq!(result.mode, PickMode::Merged);

        let parents = git_ok(repo.path(), &["rev-list", "--parents", "-n", "1", "HEAD"]);
        let parents: Vec<&str> = parents.split_whitespace().skip(1).collect();
        assert_eq!(parents, vec![base_before.as_str(), repo.rev("feature").as_str()]);
        assert_eq!(
            git_ok(repo.path(), &["log", "-1", "--format=%s"]),
            "Merge fork 'feature' into main"
        );
        assert_eq!(repo.read("a.txt"), "a\n");
        assert_eq!(repo.read("b.txt"), "b\n");
        assert!(repo.status().is_empty(), "{:?}", repo.status());
    }

    #[test]
    fn conflicts_leave_an_open_merge() {
        let repo = TestRepo::new();
        let fork_dir = repo.create("feature");
        repo.commit_file(&fork_dir, "x.txt", "fork\n", "fork x");
        repo.commit_file(repo.path(), "x.txt", "base\n", "base x");
        let base_before = repo.rev("main");

        let result = fork::pick(&repo.workspace(), "feature").unwrap();
        assert_eq!(
            result.mode,
            PickMode::ConflictsPresent {
                paths: vec!["x.txt".to_string()]
            }
        );
        assert_eq!(repo.rev("main"), base_before);
        assert!(repo.read("x.txt").contains("<<<<<<<"));
        assert!(repo.path().join(".git/MERGE_HEAD").exists());
        assert_eq!(repo.workspace().git().state(), GitState::Merge);

        git_ok(repo.path(), &["merge", "--abort"]);
        assert_eq!(repo.read("x.txt"), "base\n");
    }

    #[test]
    fn dirty_fork_is_reported_but_picked() {
        let repo = TestRepo::new();
        let fork_dir = repo.create("test");
        repo.commit_file(&fork_dir, "done.txt", "done\n", "done");
        fs::write(fork_dir.join("wip.txt"), "wip\n").unwrap();

        let registry = ForkRegistry::load(&repo.workspace()).unwrap();
        assert_eq!(registry.resolve("test").unwrap().dirty_file_count, 1);

        let result = fork::pick(&repo.workspace(), "test").unwrap();
        assert_eq!(result.mode, PickMode::FastForward);
        assert!(!repo.path().join("wip.txt").exists());
        assert_eq!(fs::read_to_string(fork_dir.join("wip.txt")).unwrap(), "wip\n");
    }

    #[test]
    fn picks_fork_branch_not_the_checked_out_one() {
        let repo = TestRepo::new();
        let fork_dir = repo.create("feat");
        repo.commit_file(&fork_dir, "feat.txt", "feat\n", "feat work");
        git_ok(&fork_dir, &["checkout", "-q", "-b", "dev"]);
        repo.commit_file(&fork_dir, "dev.txt", "dev\n", "dev work");

        let result = fork::pick(&repo.workspace(), "feat").unwrap();
        assert_eq!(result.mode, PickMode::FastForward);
        assert_eq!(repo.rev("main"), repo.rev("feat"));
        assert_eq!(repo.read("feat.txt"), "feat\n");
        assert!(!repo.path().join("dev.txt").exists());
    }

    #[test]
    fn missing_fork_branch_refused() {
        let repo = TestRepo::new();
        let fork_dir = repo.create("feat");
        repo.commit_file(&fork_dir, "feat.txt", "feat\n", "feat work");
        git_ok(&fork_dir, &["checkout", "-q", "--detach"]);
        git_ok(repo.path(), &["branch", "-q", "-D", "feat"]);
        let before = repo.rev("main");

        let err = fork::pick(&repo.workspace(), "feat").unwrap_err();
        assert!(matches!(err, ForkError::BranchMissing { .. }), "{err}");
        assert_eq!(repo.rev("main"), before);
        assert!(!repo.path().join("feat.txt").exists());

        let err = fork::promote(&repo.workspace(), "feat").unwrap_err();
        assert!(matches!(err, ForkError::BranchMissing { .. }), "{err}");
        assert_eq!(repo.rev("main"), before);
    }

    #[test]
    fn dirty_base_path_blocks_fast_forward() {
        let repo = TestRepo::new();
        let fork_dir = repo.create("feature");
        repo.commit_file(&fork_dir, "README.md", "# Fork\n", "fork readme");
        fs::write(repo.path().join("README.md"), "# Local\n").unwrap();
        let before = repo.rev("main");

        let err = fork::pick(&repo.workspace(), "feature").unwrap_err();
        assert!(matches!(err, ForkError::BaseWorktreeConflict { .. }), "{err}");
        assert_eq!(repo.rev("main"), before);
        assert_eq!(repo.read("README.md"), "# Local\n");
    }

    #[test]
    fn unknown_fork_not_found() {
        let repo = TestRepo::new();
        assert!(matches!(
            fork::pick(&repo.workspace(), "ghost"),
            Err(ForkError::NotFound { .. })
        ));
    }
}

// =============================================================================
// Promote
// =============================================================================

mod promote {
    use super::*;

    #[test]
    fn empty_fork_transplants_nothing() {
        let repo = TestRepo::new();
        repo.create("empty-fork");
        fs::write(repo.path().join("README.md"), "# Local edit\n").unwrap();
        let before = repo.rev("HEAD");

        let result = fork::promote(&repo.workspace(), "empty-fork").unwrap();
        assert_eq!(result.commits_applied, 0);
        assert_eq!(result.commit, None);
        assert_eq!(repo.rev("HEAD"), before);
        assert_eq!(repo.read("README.md"), "# Local edit\n");
        assert_eq!(repo.status(), vec![" M README.md".to_string()]);
    }

    #[test]
    fn commits_are_squashed_into_one() {
        let repo = TestRepo::new();
        let fork_dir = repo.create("feature");
        repo.commit_file(&fork_dir, "a.txt", "a\n", "add a");
        repo.commit_file(&fork_dir, "b.txt", "b\n", "add b");
        let base_before = repo.rev("main");
        let fork_before = repo.rev("feature");

        let result = fork::promote(&repo.workspace(), "feature").unwrap();
        assert_eq!(result.commits_applied, 2);
        assert_eq!(result.commit.unwrap().as_str(), repo.rev("main"));

        assert_eq!(repo.rev("main~1"), base_before);
        let message = git_ok(repo.path(), &["log", "-1", "--format=%B"]);
        assert!(message.starts_with("promote feature: squash 2 commit(s)"), "{message}");
        assert!(message.contains("add a") && message.contains("add b"), "{message}");

        assert_eq!(repo.read("a.txt"), "a\n");
        assert_eq!(repo.read("b.txt"), "b\n");
        assert_eq!(repo.rev("feature"), fork_before);
        assert!(repo.status().is_empty(), "{:?}", repo.status());
    }

    #[test]
    fn promote_onto_advanced_base() {
        let repo = TestRepo::new();
        let fork_dir = repo.create("feature");
        repo.commit_file(&fork_dir, "a.txt", "a\n", "fork side");
        repo.commit_file(repo.path(), "b.txt", "b\n", "base side");
        let base_before = repo.rev("main");

        let result = fork::promote(&repo.workspace(), "feature").unwrap();
        assert_eq!(result.commits_applied, 1);
        assert_eq!(repo.rev("main~1"), base_before);
        let parents = git_ok(repo.path(), &["rev-list", "--parents", "-n", "1", "HEAD"]);
        assert_eq!(parents.split_whitespace().count(), 2, "squash has a single parent");
        assert_eq!(repo.read("a.txt"), "a\n");
    }

    #[test]
    fn unstaged_edits_survive_non_overlapping_change() {
        let repo = TestRepo::new();
        repo.commit_file(repo.path(), "file.txt", &numbered(), "numbers");
        let fork_dir = repo.create("feature");

        let fork_side = replace_line(&numbered(), 10, "line 10 from fork");
        repo.commit_file(&fork_dir, "file.txt", &fork_side, "edit line 10");

        let local = replace_line(&numbered(), 1, "line 1 local");
        fs::write(repo.path().join("file.txt"), &local).unwrap();

        fork::promote(&repo.workspace(), "feature").unwrap();

        let both = replace_line(&fork_side, 1, "line 1 local");
        assert_eq!(repo.read("file.txt"), both);
        assert_eq!(git_ok(repo.path(), &["show", "HEAD:file.txt"]) + "\n", fork_side);
        assert_eq!(repo.status(), vec![" M file.txt".to_string()]);
    }

    #[test]
    fn overlapping_unstaged_edit_aborts() {
        let repo = TestRepo::new();
        repo.commit_file(repo.path(), "file.txt", &numbered(), "numbers");
        let fork_dir = repo.create("feature");
        repo.commit_file(
            &fork_dir,
            "file.txt",
            &replace_line(&numbered(), 5, "fork five"),
            "edit five",
        );

        let local = replace_line(&numbered(), 5, "local five");
        fs::write(repo.path().join("file.txt"), &local).unwrap();
        let before = repo.rev("main");

        let err = fork::promote(&repo.workspace(), "feature").unwrap_err();
        match err {
            ForkError::PromoteConflict { paths, .. } => assert_eq!(paths, vec!["file.txt"]),
            other => panic!("expected PromoteConflict, got {other}"),
        }
        assert_eq!(repo.rev("main"), before);
        assert_eq!(repo.read("file.txt"), local);
        assert_eq!(repo.status(), vec![" M file.txt".to_string()]);
    }

    #[test]
    fn committed_conflict_aborts_and_changes_nothing() {
        let repo = TestRepo::new();
        let fork_dir = repo.create("feature");
        repo.commit_file(&fork_dir, "x.txt", "fork\n", "fork x");
        repo.commit_file(repo.path(), "x.txt", "base\n", "base x");
        fs::write(repo.path().join("README.md"), "# Local\n").unwrap();
        let base_before = repo.rev("main");
        let fork_before = repo.rev("feature");

        let err = fork::promote(&repo.workspace(), "feature").unwrap_err();
        assert!(matches!(err, ForkError::PromoteConflict { .. }), "{err}");
        assert!(err.to_string().contains("x.txt"));

        assert_eq!(repo.rev("main"), base_before);
        assert_eq!(repo.rev("feature"), fork_before);
        assert_eq!(repo.read("x.txt"), "base\n");
        assert_eq!(repo.read("README.md"), "# Local\n");
        assert_eq!(repo.status(), vec![" M README.md".to_string()]);
    }
}

// =============================================================================
// Delete
// =============================================================================

mod delete {
    use super::*;

    #[test]
    fn removes_directory_worktree_and_branch() {
        let repo = TestRepo::new();
        let fork_dir = repo.create("feature");
        repo.commit_file(&fork_dir, "a.txt", "a\n", "fork work");
        let tip = repo.rev("feature");

        let deleted = fork::delete(&repo.workspace(), "feature").unwrap();
        assert_eq!(deleted.name.as_str(), "feature");
        assert_eq!(deleted.tip.as_str(), tip);

        assert!(!fork_dir.exists());
        assert!(!run_git(repo.path(), &["rev-parse", "--verify", "refs/heads/feature"])
            .status
            .success());
        let worktrees = git_ok(repo.path(), &["worktree", "list", "--porcelain"]);
        assert!(!worktrees.contains(".forks/feature"), "{worktrees}");
        assert!(ForkRegistry::load(&repo.workspace()).unwrap().is_empty());
    }

    #[test]
    fn deletes_fork_branch_not_the_checked_out_one() {
        let repo = TestRepo::new();
        let fork_dir = repo.create("feat");
        let feat = repo.rev("feat");
        git_ok(&fork_dir, &["checkout", "-q", "-b", "dev"]);
        repo.commit_file(&fork_dir, "dev.txt", "dev\n", "dev work");
        let dev = repo.rev("dev");

        let deleted = fork::delete(&repo.workspace(), "feat").unwrap();
        assert_eq!(deleted.tip.as_str(), feat);
        assert!(!fork_dir.exists());
        assert!(!run_git(repo.path(), &["rev-parse", "--verify", "refs/heads/feat"])
            .status
            .success());
        assert_eq!(repo.rev("dev"), dev);
    }

    #[test]
    fn fork_with_missing_branch_is_deleted() {
        let repo = TestRepo::new();
        let fork_dir = repo.create("feat");
        git_ok(&fork_dir, &["checkout", "-q", "--detach"]);
        git_ok(repo.path(), &["branch", "-q", "-D", "feat"]);

        fork::delete(&repo.workspace(), "feat").unwrap();
        assert!(!fork_dir.exists());
        assert!(ForkRegistry::load(&repo.workspace()).unwrap().is_empty());
    }

    #[test]
    fn reports_discarded_files() {
        let repo = TestRepo::new();
        let fork_dir = repo.create("feature");
        fs::write(fork_dir.join("one.txt"), "1\n").unwrap();
        fs::write(fork_dir.join("two.txt"), "2\n").unwrap();

        let deleted = fork::delete(&repo.workspace(), "feature").unwrap();
        assert_eq!(deleted.discarded_files, 2);
    }

    #[test]
    fn name_can_be_reused_after_delete() {
        let repo = TestRepo::new();
        repo.create("feature");
        fork::delete(&repo.workspace(), "feature").unwrap();
        repo.create("feature");
        assert_eq!(ForkRegistry::load(&repo.workspace()).unwrap().len(), 1);
    }

    #[test]
    fn unknown_fork_not_found() {
        let repo = TestRepo::new();
        let err = fork::delete(&repo.workspace(), "ghost").unwrap_err();
        assert!(matches!(err, ForkError::NotFound { ref name } if name == "ghost"));
    }

    #[test]
    fn refuses_fork_in_use() {
        let repo = TestRepo::new();
        let fork_dir = repo.create("feature");

        let ws = Workspace::open(&fork_dir).unwrap();
        assert!(matches!(
            fork::delete(&ws, "feature"),
            Err(ForkError::CurrentFork { .. })
        ));
        assert!(fork_dir.exists());
    }

    #[test]
    fn delete_all_without_forks() {
        let repo = TestRepo::new();
        assert!(matches!(
            fork::delete_all(&repo.workspace()).unwrap(),
            DeleteAllOutcome::NoForks
        ));
    }

    #[test]
    fn delete_all_removes_every_fork() {
        let repo = TestRepo::new();
        repo.create("one");
        repo.create("two");

        match fork::delete_all(&repo.workspace()).unwrap() {
            DeleteAllOutcome::Processed { deleted, failed } => {
                let names: Vec<&str> = deleted.iter().map(|d| d.name.as_str()).collect();
                assert_eq!(names, vec!["one", "two"]);
                assert!(failed.is_empty());
            }
            DeleteAllOutcome::NoForks => panic!("expected forks to be deleted"),
        }
        assert!(ForkRegistry::load(&repo.workspace()).unwrap().is_empty());
        assert!(matches!(
            fork::delete_all(&repo.workspace()).unwrap(),
            DeleteAllOutcome::NoForks
        ));
    }
}

// =============================================================================
// Gating
// =============================================================================

mod gating {
    use super::*;

    fn open_conflicted_merge(repo: &TestRepo) {
        let fork_dir = repo.create("clash");
        repo.commit_file(&fork_dir, "x.txt", "fork\n", "fork x");
        repo.commit_file(repo.path(), "x.txt", "base\n", "base x");
        let result = fork::pick(&repo.workspace(), "clash").unwrap();
        assert!(matches!(result.mode, PickMode::ConflictsPresent { .. }));
    }

    #[test]
    fn second_pick_refused_while_merging() {
        let repo = TestRepo::new();
        open_conflicted_merge(&repo);
        // create refuses mid-merge, so add the second fork by hand.
        let other = repo.fork_path("other");
        git_ok(
            repo.path(),
            &["worktree", "add", "-q", "-b", "other", other.to_str().unwrap(), "main"],
        );
        repo.commit_file(&other, "o.txt", "o\n", "other work");

        let err = fork::pick(&repo.workspace(), "other").unwrap_err();
        assert!(
            matches!(err, ForkError::OperationInProgress { state: GitState::Merge }),
            "{err}"
        );
        assert!(err.to_string().contains("git merge --abort"), "{err}");
    }

    #[test]
    fn promote_refused_while_merging() {
        let repo = TestRepo::new();
        open_conflicted_merge(&repo);

        assert!(matches!(
            fork::promote(&repo.workspace(), "clash"),
            Err(ForkError::OperationInProgress { .. })
        ));
    }

    #[test]
    fn create_refused_while_merging() {
        let repo = TestRepo::new();
        open_conflicted_merge(&repo);

        assert!(matches!(
            fork::create(&repo.workspace(), "later"),
            Err(ForkError::OperationInProgress { .. })
        ));
    }

    #[test]
    fn detached_head_refused() {
        let repo = TestRepo::new();
        let fork_dir = repo.create("feature");
        repo.commit_file(&fork_dir, "a.txt", "a\n", "fork work");
        git_ok(repo.path(), &["checkout", "-q", "--detach"]);

        assert!(matches!(
            fork::promote(&repo.workspace(), "feature"),
            Err(ForkError::DetachedHead)
        ));
        assert!(matches!(
            fork::pick(&repo.workspace(), "feature"),
            Err(ForkError::DetachedHead)
        ));
    }
}
