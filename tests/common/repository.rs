//! Git repository management and setup utilities
//!
//! Thin wrappers around the `git` binary used to build test repositories.
//! They go through `std::process` on purpose so that setup never depends on
//! the code under test.

#![allow(dead_code)]

use anyhow::{bail, Result};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

/// Test repository setup result. The TempDir must be kept alive for the
/// duration of the test to prevent cleanup.
pub struct TestRepo {
    pub temp_dir: TempDir,
    pub path: PathBuf,
}

impl TestRepo {
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Run git in `repo_path` and return its stdout; fails on non-zero exit.
pub fn git(repo_path: &Path, args: &[&str]) -> Result<String> {
    let output = Command::new("git")
        .args(args)
        .current_dir(repo_path)
        .output()?;
    if !output.status.success() {
        bail!(
            "git {} failed: {}",
            args.join(" "),
            String::from_utf8_lossy(&output.stderr)
        );
    }
    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

/// Identity and merge settings so commits, stashes and pulls never prompt.
pub fn configure(repo_path: &Path) -> Result<()> {
    git(repo_path, &["config", "user.name", "Test User"])?;
    git(repo_path, &["config", "user.email", "test@example.com"])?;
    git(repo_path, &["config", "pull.rebase", "false"])?;
    git(repo_path, &["config", "commit.gpgsign", "false"])?;
    Ok(())
}

/// Initialise `path` as a repository whose unborn branch is `master`,
/// whatever the local default branch name is.
pub fn init_at(path: &Path) -> Result<()> {
    fs::create_dir_all(path)?;
    git(path, &["init"])?;
    git(path, &["symbolic-ref", "HEAD", "refs/heads/master"])?;
    configure(path)
}

pub fn setup_test_repo() -> Result<TestRepo> {
    let temp_dir = TempDir::new()?;
    let path = temp_dir.path().join("repo");
    init_at(&path)?;
    Ok(TestRepo { temp_dir, path })
}

/// A repository on `master` with one commit containing `initial.txt`.
pub fn setup_test_repo_with_initial_commit() -> Result<TestRepo> {
    let repo = setup_test_repo()?;
    commit_file(&repo.path, "initial.txt", "initial content\n", "Initial commit")?;
    Ok(repo)
}

/// Clone `source` into `target` and configure it like every test repository.
pub fn clone_into(source: &Path, target: &Path) -> Result<()> {
    let parent = target.parent().unwrap_or(Path::new("."));
    fs::create_dir_all(parent)?;
    let source = source.to_string_lossy();
    let target_name = target.to_string_lossy();
    git(parent, &["clone", source.as_ref(), target_name.as_ref()])?;
    configure(target)
}

pub fn create_file(repo_path: &Path, filename: &str, content: &str) -> Result<()> {
    let path = repo_path.join(filename);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, content)?;
    Ok(())
}

pub fn read_file(repo_path: &Path, filename: &str) -> Result<String> {
    Ok(fs::read_to_string(repo_path.join(filename))?)
}

pub fn git_add(repo_path: &Path, filename: &str) -> Result<()> {
    git(repo_path, &["add", filename])?;
    Ok(())
}

pub fn git_commit(repo_path: &Path, message: &str) -> Result<()> {
    git(repo_path, &["commit", "-m", message])?;
    Ok(())
}

/// Write, add and commit a single file.
pub fn commit_file(repo_path: &Path, filename: &str, content: &str, message: &str) -> Result<()> {
    create_file(repo_path, filename, content)?;
    git_add(repo_path, filename)?;
    git_commit(repo_path, message)
}

pub fn head_hash(repo_path: &Path) -> Result<String> {
    Ok(git(repo_path, &["rev-parse", "HEAD"])?.trim().to_string())
}

pub fn current_branch(repo_path: &Path) -> Result<String> {
    Ok(git(repo_path, &["rev-parse", "--abbrev-ref", "HEAD"])?
        .trim()
        .to_string())
}
