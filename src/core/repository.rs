//! Repository handle and plain git command wrappers.
//!
//! A [`Repository`] identifies one working copy: its directory, whether it runs
//! in dry-run mode, the [`LogSink`] that records every command, and the
//! [`CommandRunner`] used to execute git. Commands run strictly one at a time;
//! each method awaits its command before issuing the next.
//!
//! The higher level operations live next to the code they belong to:
//! status parsing in [`crate::core::git_status`], references in
//! [`crate::core::refs`], bulk staging in [`crate::core::dispatch`], the safe
//! update in [`crate::core::update`] and the pull rescue in
//! [`crate::core::rescue`].

use crate::core::{
    config::SyncConfig,
    error::{Result, SyncError},
    runner::{CommandLine, CommandResult, CommandRunner, LogSink, ProcessRunner},
};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Refuse a branch, remote or URL that git would read as an option.
pub fn ensure_not_option(kind: &str, value: &str) -> Result<()> {
    if value.is_empty() || value.starts_with('-') {
        return Err(SyncError::config_error(format!(
            "'{value}' is not a valid {kind}"
        )));
    }
    Ok(())
}

pub struct Repository {
    directory: PathBuf,
    dry_run: bool,
    log: LogSink,
    runner: Arc<dyn CommandRunner>,
    git_program: String,
    rescue_dir: String,
}

impl Repository {
    /// Handle for `directory` running the system `git` with default settings.
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self::from_config(directory, &SyncConfig::default())
    }

    pub fn from_config(directory: impl Into<PathBuf>, config: &SyncConfig) -> Self {
        Self {
            directory: directory.into(),
            dry_run: config.dry_run,
            log: LogSink::new(),
            runner: Arc::new(ProcessRunner::new()),
            git_program: config.git_program.clone(),
            rescue_dir: config.rescue_dir.clone(),
        }
    }

    /// Resolve the top level of the working copy containing `path`.
    pub async fn discover(path: &Path, config: &SyncConfig) -> Result<Self> {
        let probe = Self::from_config(path, config);
        let result = probe
            .cmd(probe.git(["rev-parse", "--show-toplevel"]))
            .await
            .map_err(|_| SyncError::NotInGitRepo)?;
        match result {
            CommandResult::Success { output } if !output.trim().is_empty() => {
                let mut repo = probe;
                repo.directory = PathBuf::from(output.trim());
                Ok(repo)
            }
            _ => Err(SyncError::NotInGitRepo),
        }
    }

    pub fn with_runner(mut self, runner: Arc<dyn CommandRunner>) -> Self {
        self.runner = runner;
        self
    }

    /// Share `log` with other handles instead of using a private sink.
    pub fn with_log(mut self, log: LogSink) -> Self {
        self.log = log;
        self
    }

    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn with_rescue_dir(mut self, rescue_dir: impl Into<String>) -> Self {
        self.rescue_dir = rescue_dir.into();
        self
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    pub fn log_sink(&self) -> &LogSink {
        &self.log
    }

    /// Everything logged so far, in order.
    pub fn log(&self) -> String {
        self.log.contents()
    }

    pub(crate) fn git_program(&self) -> &str {
        &self.git_program
    }

    pub(crate) fn rescue_dir(&self) -> &str {
        &self.rescue_dir
    }

    /// A git invocation using the configured program.
    pub fn git<I, S>(&self, args: I) -> CommandLine
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        CommandLine::new(self.git_program.as_str(), args)
    }

    /// Run `command` in the working copy.
    pub async fn cmd(&self, command: CommandLine) -> Result<CommandResult> {
        self.cmd_in(command, &self.directory).await
    }

    /// Run `command` in `working_dir`, which need not be the working copy
    /// (clone and init run before it exists).
    pub async fn cmd_in(&self, command: CommandLine, working_dir: &Path) -> Result<CommandResult> {
        if self.dry_run && command.mutates {
            log::debug!("[dry-run] skipping: {command}");
            self.log.append(format!("[dry-run] $ {command}\n"));
            return Ok(CommandResult::success(""));
        }

        log::debug!("Running in {}: {command}", working_dir.display());
        self.log.append(format!("$ {command}\n"));

        let result = self.runner.run(&command, working_dir).await?;

        let output = result.output();
        if !output.is_empty() {
            if output.ends_with('\n') {
                self.log.append(output.to_string());
            } else {
                self.log.append(format!("{output}\n"));
            }
        }
        if !result.is_success() {
            log::debug!("'{command}' exited with code {}", result.code());
        }

        Ok(result)
    }

    // -- working copy state --

    /// Whether tracked files have uncommitted changes. Untracked files are ignored.
    pub async fn has_local_changes(&self) -> Result<bool> {
        let result = self.cmd(self.git(["status", "--short", "-uno"])).await?;
        Ok(!result.output().trim().is_empty())
    }

    pub async fn diff(&self, opts: &[&str]) -> Result<String> {
        let result = self.cmd(self.git(["diff"]).args(opts.iter().copied())).await?;
        Ok(result.output().trim().to_string())
    }

    pub async fn add<S: AsRef<str>>(&self, paths: &[S]) -> Result<CommandResult> {
        let command = self
            .git(["add", "--"])
            .args(paths.iter().map(|p| p.as_ref().to_string()))
            .mutating();
        self.cmd(command).await
    }

    pub async fn commit(&self, message: &str, all: bool) -> Result<CommandResult> {
        if message.trim().is_empty() {
            return Err(SyncError::EmptyCommitMessage);
        }
        let mut command = self.git(["commit"]);
        if all {
            command = command.arg("-a");
        }
        self.cmd(command.args(["-m", message]).mutating()).await
    }

    pub async fn checkout(&self, branch_or_hash: &str) -> Result<()> {
        ensure_not_option("branch", branch_or_hash)?;
        let result = self
            .cmd(self.git(["checkout", branch_or_hash]).mutating())
            .await?;
        match result {
            CommandResult::Success { .. } => Ok(()),
            CommandResult::Failure { output, .. } => {
                Err(SyncError::checkout_failed(branch_or_hash, output))
            }
        }
    }

    pub async fn stash(&self) -> Result<CommandResult> {
        self.cmd(self.git(["stash"]).mutating()).await
    }

    pub async fn stash_pop(&self) -> Result<CommandResult> {
        self.cmd(self.git(["stash", "pop"]).mutating()).await
    }

    // -- remote transport --

    pub async fn fetch(&self, remote: &str) -> Result<CommandResult> {
        ensure_not_option("remote", remote)?;
        self.cmd(self.git(["fetch", "--end-of-options", remote]).mutating())
            .await
    }

    pub async fn pull(&self, branch: &str, remote: &str) -> Result<CommandResult> {
        ensure_not_option("remote", remote)?;
        ensure_not_option("branch", branch)?;
        self.cmd(
            self.git(["pull", "--end-of-options", remote, branch])
                .mutating(),
        )
        .await
    }

    /// Push the current branch to its tracking remote.
    pub async fn push(&self) -> Result<CommandResult> {
        let info = self.local_branch_info().await?;
        let remote = info.remote.ok_or_else(|| SyncError::NoRemote {
            directory: self.directory.clone(),
        })?;
        let branch = info.branch.ok_or_else(|| SyncError::NoBranch {
            directory: self.directory.clone(),
        })?;
        ensure_not_option("remote", &remote)?;
        ensure_not_option("branch", &branch)?;
        self.cmd(
            self.git(["push", "--end-of-options", remote.as_str(), branch.as_str()])
                .mutating(),
        )
            .await
    }

    // -- creation --

    /// Clone `repo_url` into this handle's directory, which must not exist yet.
    pub async fn clone(&self, repo_url: &str, branch: &str) -> Result<String> {
        ensure_not_option("repository URL", repo_url)?;
        ensure_not_option("branch", branch)?;
        if tokio::fs::try_exists(&self.directory).await? {
            return Err(SyncError::AlreadyExists {
                path: self.directory.clone(),
            });
        }

        let parent = self.parent_dir();
        let name = self
            .directory
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| SyncError::config_error("Clone target has no directory name"))?;

        if !self.dry_run {
            tokio::fs::create_dir_all(&parent).await?;
        }

        let command = self
            .git(["clone", "-b", branch, "--end-of-options", repo_url, name.as_str()])
            .mutating();
        self.cmd_in(command, &parent).await?.into_result("clone")
    }

    /// Create the directory if needed, `git init` it and optionally add `origin`.
    pub async fn init(&self, repo_url: Option<&str>) -> Result<String> {
        if let Some(url) = repo_url {
            ensure_not_option("repository URL", url)?;
        }
        if !self.dry_run {
            tokio::fs::create_dir_all(&self.directory).await?;
        }

        let output = self
            .cmd(self.git(["init"]).mutating())
            .await?
            .into_result("init")?;

        if let Some(url) = repo_url {
            self.cmd(self.git(["remote", "add", "origin", url]).mutating())
                .await?
                .into_result("remote add")?;
        }

        Ok(output)
    }

    fn parent_dir(&self) -> PathBuf {
        match self.directory.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        }
    }
}
