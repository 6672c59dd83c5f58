//! Safe update of a working copy from its remote.
//!
//! The update is a small state machine:
//!
//! ```text
//! CheckDivergence -> [Stash] -> Fetch -> [CheckoutTarget] -> Pull
//!                 -> [CheckoutBack] -> [StashPop] -> Done
//! ```
//!
//! Bracketed steps only run when needed. Which of them are owed is decided by
//! [`UpdateContext`]: once a stash has been taken or the branch switched, the
//! transitions after the pull always lead through `CheckoutBack` and
//! `StashPop`, in that order, so stashed edits are only replayed on the branch
//! the working copy started on. A failing step aborts the update; steps that
//! already ran are not undone.

use crate::core::{
    error::{Result, SyncError},
    refs::BranchInfo,
    repository::{ensure_not_option, Repository},
    runner::CommandResult,
};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateStep {
    CheckDivergence,
    Stash,
    Fetch,
    CheckoutTarget,
    Pull,
    CheckoutBack,
    StashPop,
    Done,
}

impl fmt::Display for UpdateStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            UpdateStep::CheckDivergence => "check divergence",
            UpdateStep::Stash => "stash",
            UpdateStep::Fetch => "fetch",
            UpdateStep::CheckoutTarget => "checkout target",
            UpdateStep::Pull => "pull",
            UpdateStep::CheckoutBack => "checkout back",
            UpdateStep::StashPop => "stash pop",
            UpdateStep::Done => "done",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// Local and remote heads already matched; nothing was changed.
    UpToDate,
    /// The pull ran; `output` is what it printed.
    Updated { output: String },
}

impl UpdateOutcome {
    pub fn is_up_to_date(&self) -> bool {
        matches!(self, UpdateOutcome::UpToDate)
    }
}

/// Bookkeeping for one update run.
#[derive(Debug, Clone)]
pub struct UpdateContext {
    pub branch: String,
    pub remote: String,
    /// Branch and commit before anything was touched.
    pub starting_point: BranchInfo,
    pub stashed: bool,
    pub switched: bool,
    pub pull_output: Option<String>,
}

impl UpdateContext {
    fn new(branch: &str, remote: String, starting_point: BranchInfo) -> Self {
        Self {
            branch: branch.to_string(),
            remote,
            starting_point,
            stashed: false,
            switched: false,
            pull_output: None,
        }
    }

    fn needs_switch(&self) -> bool {
        self.starting_point.branch.as_deref() != Some(self.branch.as_str())
    }

    /// Where to return after pulling: the starting branch, or the commit when
    /// the working copy was detached.
    pub fn return_target(&self) -> &str {
        self.starting_point
            .branch
            .as_deref()
            .unwrap_or(&self.starting_point.head_hash)
    }

    /// Transition out of every step whose successor follows from the context
    /// alone.
    fn next_after(&self, step: UpdateStep) -> UpdateStep {
        match step {
            UpdateStep::Stash => UpdateStep::Fetch,
            UpdateStep::Fetch if self.needs_switch() => UpdateStep::CheckoutTarget,
            UpdateStep::Fetch => UpdateStep::Pull,
            UpdateStep::CheckoutTarget => UpdateStep::Pull,
            UpdateStep::Pull if self.switched => UpdateStep::CheckoutBack,
            UpdateStep::Pull | UpdateStep::CheckoutBack if self.stashed => UpdateStep::StashPop,
            UpdateStep::Pull | UpdateStep::CheckoutBack | UpdateStep::StashPop => UpdateStep::Done,
            UpdateStep::CheckDivergence | UpdateStep::Done => UpdateStep::Done,
        }
    }
}

impl Repository {
    /// Bring `branch` up to date from its remote without losing local edits
    /// and without leaving the branch the working copy is on.
    ///
    /// `remote` is used only when `branch` has no configured tracking remote.
    pub async fn interactively_update(&self, branch: &str, remote: &str) -> Result<UpdateOutcome> {
        ensure_not_option("branch", branch)?;
        ensure_not_option("remote", remote)?;
        let starting_point = self.local_branch_info().await?;
        let remote = self
            .remote_of_branch(branch)
            .await?
            .unwrap_or_else(|| remote.to_string());
        let mut ctx = UpdateContext::new(branch, remote, starting_point);

        let mut step = UpdateStep::CheckDivergence;
        loop {
            log::debug!("Update of {}: {step}", self.directory().display());
            step = match step {
                UpdateStep::CheckDivergence => {
                    if !self.has_remote_changes(&ctx.branch, &ctx.remote).await? {
                        log::debug!("No remote changes, {} is up to date", self.directory().display());
                        return Ok(UpdateOutcome::UpToDate);
                    }
                    log::info!(
                        "Updating {} from {}/{}",
                        self.directory().display(),
                        ctx.remote,
                        ctx.branch
                    );
                    if self.has_local_changes().await? {
                        UpdateStep::Stash
                    } else {
                        UpdateStep::Fetch
                    }
                }
                UpdateStep::Stash => {
                    log::info!("Stashing local changes...");
                    self.stash().await?.into_result("stash")?;
                    ctx.stashed = true;
                    ctx.next_after(step)
                }
                UpdateStep::Fetch => {
                    // a branch that is not local yet must be fetched before checkout
                    self.fetch(&ctx.remote).await?.into_result("fetch")?;
                    ctx.next_after(step)
                }
                UpdateStep::CheckoutTarget => {
                    self.checkout(&ctx.branch).await?;
                    ctx.switched = true;
                    ctx.next_after(step)
                }
                UpdateStep::Pull => {
                    let output = match self.pull_rescuing(&ctx.branch, &ctx.remote).await? {
                        CommandResult::Success { output } => output,
                        CommandResult::Failure { code, output } => {
                            return Err(SyncError::command_failed("pull", code, output));
                        }
                    };
                    ctx.pull_output = Some(output);
                    ctx.next_after(step)
                }
                UpdateStep::CheckoutBack => {
                    let target = ctx.return_target().to_string();
                    self.checkout(&target).await?;
                    ctx.next_after(step)
                }
                UpdateStep::StashPop => {
                    // conflicts here need manual resolution; surface git's output as is
                    self.stash_pop().await?.into_result("stash pop")?;
                    log::info!("Local changes from stash restored...");
                    ctx.next_after(step)
                }
                UpdateStep::Done => {
                    return Ok(UpdateOutcome::Updated {
                        output: ctx.pull_output.take().unwrap_or_default(),
                    });
                }
            };
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::runner::scripted::ScriptedRunner;
    use std::sync::Arc;
    use tempfile::TempDir;

    const DIVERGED: &str = "{\"remote\": \"bbb\trefs/heads/master\", \"local\": \"aaa\"}\n";
    const SAME: &str = "{\"remote\": \"aaa\trefs/heads/master\", \"local\": \"aaa\"}\n";

    fn on_branch(runner: ScriptedRunner, branch: &str) -> ScriptedRunner {
        runner
            .on(
                "git symbolic-ref HEAD",
                CommandResult::success(format!("refs/heads/{branch}\n")),
            )
            .on("git rev-parse HEAD", CommandResult::success("aaa\n"))
            .on("git config", CommandResult::failure(1, ""))
    }

    fn repo(dir: &TempDir, runner: ScriptedRunner) -> (Arc<ScriptedRunner>, Repository) {
        let runner = Arc::new(runner);
        let repo = Repository::new(dir.path()).with_runner(runner.clone());
        (runner, repo)
    }

    fn mutating(calls: &[String]) -> Vec<String> {
        calls
            .iter()
            .filter(|c| {
                ["git stash", "git fetch", "git checkout", "git pull"]
                    .iter()
                    .any(|prefix| c.starts_with(prefix))
            })
            .cloned()
            .collect()
    }

    #[tokio::test]
    async fn test_up_to_date_runs_no_mutating_command() -> anyhow::Result<()> {
        let dir = TempDir::new()?;
        let (runner, repo) = repo(
            &dir,
            on_branch(ScriptedRunner::new(), "master").on("sh -c", CommandResult::success(SAME)),
        );

        let outcome = repo.interactively_update("master", "origin").await?;

        assert_eq!(outcome, UpdateOutcome::UpToDate);
        assert!(mutating(&runner.calls()).is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_plain_update_on_same_branch() -> anyhow::Result<()> {
        let dir = TempDir::new()?;
        let (runner, repo) = repo(
            &dir,
            on_branch(ScriptedRunner::new(), "master")
                .on("sh -c", CommandResult::success(DIVERGED))
                .on("git pull", CommandResult::success("Fast-forward\n a.txt | 1 +\n")),
        );

        let outcome = repo.interactively_update("master", "origin").await?;

        assert_eq!(
            outcome,
            UpdateOutcome::Updated {
                output: "Fast-forward\n a.txt | 1 +\n".into()
            }
        );
        assert_eq!(
            mutating(&runner.calls()),
            vec!["git fetch --end-of-options origin", "git pull --end-of-options origin master"]
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_stash_and_branch_switch_are_undone_in_order() -> anyhow::Result<()> {
        let dir = TempDir::new()?;
        let (runner, repo) = repo(
            &dir,
            on_branch(ScriptedRunner::new(), "master")
                .on("sh -c", CommandResult::success(DIVERGED))
                .on("git status --short", CommandResult::success(" M local.txt\n")),
        );

        repo.interactively_update("feature", "origin").await?;

        assert_eq!(
            mutating(&runner.calls()),
            vec![
                "git stash",
                "git fetch --end-of-options origin",
                "git checkout feature",
                "git pull --end-of-options origin feature",
                "git checkout master",
                "git stash pop",
            ]
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_tracking_remote_wins_over_argument() -> anyhow::Result<()> {
        let dir = TempDir::new()?;
        let (runner, repo) = repo(
            &dir,
            on_branch(ScriptedRunner::new(), "master")
                .on("git config branch.master.remote", CommandResult::success("upstream\n"))
                .on("sh -c", CommandResult::success(DIVERGED)),
        );

        repo.interactively_update("master", "origin").await?;

        assert_eq!(
            mutating(&runner.calls()),
            vec!["git fetch --end-of-options upstream", "git pull --end-of-options upstream master"]
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_detached_head_returns_to_commit() -> anyhow::Result<()> {
        let dir = TempDir::new()?;
        let (runner, repo) = repo(
            &dir,
            ScriptedRunner::new()
                .on("git symbolic-ref HEAD", CommandResult::failure(128, "fatal: not a symbolic ref"))
                .on("git rev-parse HEAD", CommandResult::success("aaa\n"))
                .on("git config", CommandResult::failure(1, ""))
                .on("sh -c", CommandResult::success(DIVERGED)),
        );

        repo.interactively_update("master", "origin").await?;

        let calls = mutating(&runner.calls());
        assert_eq!(calls.last().map(String::as_str), Some("git checkout aaa"));
        Ok(())
    }

    #[tokio::test]
    async fn test_stash_failure_aborts_before_fetch() -> anyhow::Result<()> {
        let dir = TempDir::new()?;
        let (runner, repo) = repo(
            &dir,
            on_branch(ScriptedRunner::new(), "master")
                .on("sh -c", CommandResult::success(DIVERGED))
                .on("git status --short", CommandResult::success(" M local.txt\n"))
                .on("git stash", CommandResult::failure(1, "cannot stash")),
        );

        let err = repo.interactively_update("master", "origin").await.unwrap_err();

        assert_eq!(err.to_string(), "Error in stash: cannot stash");
        assert_eq!(mutating(&runner.calls()), vec!["git stash"]);
        Ok(())
    }

    #[tokio::test]
    async fn test_checkout_failure_names_branch() -> anyhow::Result<()> {
        let dir = TempDir::new()?;
        let (_runner, repo) = repo(
            &dir,
            on_branch(ScriptedRunner::new(), "master")
                .on("sh -c", CommandResult::success(DIVERGED))
                .on("git checkout", CommandResult::failure(1, "error: pathspec 'nope' did not match")),
        );

        let err = repo.interactively_update("nope", "origin").await.unwrap_err();
        assert!(matches!(err, SyncError::CheckoutFailed { ref target, .. } if target == "nope"));
        Ok(())
    }

    #[tokio::test]
    async fn test_pull_failure_is_fatal() -> anyhow::Result<()> {
        let dir = TempDir::new()?;
        let (runner, repo) = repo(
            &dir,
            on_branch(ScriptedRunner::new(), "master")
                .on("sh -c", CommandResult::success(DIVERGED))
                .on("git status --short", CommandResult::success(" M local.txt\n"))
                .on("git pull", CommandResult::failure(1, "CONFLICT (content): Merge conflict in a.txt")),
        );

        let err = repo.interactively_update("master", "origin").await.unwrap_err();

        assert_eq!(
            err.to_string(),
            "Error in pull: CONFLICT (content): Merge conflict in a.txt"
        );
        // no stash pop after a failed pull
        assert_eq!(
            mutating(&runner.calls()),
            vec!["git stash", "git fetch --end-of-options origin", "git pull --end-of-options origin master"]
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_stash_pop_conflict_surfaces_raw_output() -> anyhow::Result<()> {
        let dir = TempDir::new()?;
        let conflict = "Auto-merging a.txt\nCONFLICT (content): Merge conflict in a.txt\n";
        let (_runner, repo) = repo(
            &dir,
            on_branch(ScriptedRunner::new(), "master")
                .on("sh -c", CommandResult::success(DIVERGED))
                .on("git status --short", CommandResult::success(" M a.txt\n"))
                .on("git stash pop", CommandResult::failure(1, conflict)),
        );

        let err = repo.interactively_update("master", "origin").await.unwrap_err();
        assert_eq!(err.command_output(), Some(conflict));
        Ok(())
    }

    #[tokio::test]
    async fn test_option_like_branch_is_refused_before_any_command() -> anyhow::Result<()> {
        let dir = TempDir::new()?;
        let (runner, repo) = repo(&dir, on_branch(ScriptedRunner::new(), "master"));

        let err = repo
            .interactively_update("--upload-pack=touch pwned; git-upload-pack", "origin")
            .await
            .unwrap_err();

        assert!(matches!(err, SyncError::Config { .. }));
        assert!(runner.calls().is_empty());
        Ok(())
    }

    #[test]
    fn test_transitions_always_restore_before_pop() {
        let mut ctx = UpdateContext::new(
            "feature",
            "origin".into(),
            BranchInfo {
                branch: Some("master".into()),
                remote: None,
                head_hash: "aaa".into(),
            },
        );
        ctx.stashed = true;
        assert_eq!(ctx.next_after(UpdateStep::Stash), UpdateStep::Fetch);
        assert_eq!(ctx.next_after(UpdateStep::Fetch), UpdateStep::CheckoutTarget);
        ctx.switched = true;
        assert_eq!(ctx.next_after(UpdateStep::Pull), UpdateStep::CheckoutBack);
        assert_eq!(ctx.next_after(UpdateStep::CheckoutBack), UpdateStep::StashPop);
        assert_eq!(ctx.next_after(UpdateStep::StashPop), UpdateStep::Done);
        assert_eq!(ctx.return_target(), "master");
    }
}
