//! Branch, remote and head reference queries.
//!
//! Everything here is derived fresh from git on every call. A detached HEAD,
//! a branch without upstream and a remote that does not exist yet are normal
//! answers, not errors.

use crate::core::{
    error::{Result, SyncError},
    repository::{ensure_not_option, Repository},
    runner::{CommandLine, CommandResult},
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BranchInfo {
    /// `None` on a detached HEAD.
    pub branch: Option<String>,
    /// `None` when the branch has no configured upstream.
    pub remote: Option<String>,
    /// Empty when HEAD cannot be resolved (no commits yet).
    pub head_hash: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Remote {
    pub name: String,
    pub url: String,
}

/// Local and remote head of a branch. Either side may hold an explanation
/// instead of a hash; the two are only ever compared for equality.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HeadComparison {
    pub local: String,
    pub remote: String,
}

impl HeadComparison {
    pub fn differs(&self) -> bool {
        self.local != self.remote
    }
}

#[derive(Deserialize)]
struct HeadPayload {
    #[serde(default)]
    remote: Option<String>,
    #[serde(default)]
    local: Option<String>,
}

/// Prints `{"remote": ..., "local": ...}`. Positional parameters: git program,
/// remote, branch.
const HEAD_REF_SCRIPT: &str = r#"remote=$("$1" ls-remote --end-of-options "$2" "$3"); local=$("$1" show-ref --hash --end-of-options "$3" | head -n 1); printf '{"remote": "%s", "local": "%s"}\n' "$remote" "$local""#;

const MISSING_MARKERS: [&str; 2] = ["does not exist", "does not appear to be a git repository"];

/// Branch name from `git branch` output, `None` when no proper branch is marked.
pub fn parse_current_branch(output: &str) -> Option<String> {
    let marked = output
        .lines()
        .find_map(|line| line.trim_start().strip_prefix('*'))?
        .trim();
    // "(HEAD detached at 1a2b3c4)", "(no branch, rebasing main)"
    if marked.is_empty() || marked.starts_with('(') {
        None
    } else {
        Some(marked.to_string())
    }
}

/// One descriptor per remote from `git remote -v`; `(fetch)` lines are dropped.
pub fn parse_remotes(output: &str) -> Vec<Remote> {
    let mut remotes: Vec<Remote> = Vec::new();
    for line in output.lines().map(str::trim) {
        if line.is_empty() || line.ends_with("(fetch)") {
            continue;
        }
        let mut parts = line.split_whitespace();
        let (Some(name), Some(url)) = (parts.next(), parts.next()) else {
            continue;
        };
        if remotes.iter().any(|r| r.name == name) {
            continue;
        }
        remotes.push(Remote {
            name: name.to_string(),
            url: url.to_string(),
        });
    }
    remotes
}

fn first_token(value: Option<String>) -> String {
    value
        .as_deref()
        .unwrap_or("")
        .split_whitespace()
        .next()
        .unwrap_or("")
        .to_string()
}

/// Parse the head comparison payload. Whitespace, including the tabs and
/// newlines `ls-remote` emits, is flattened to single spaces first.
pub fn parse_head_payload(output: &str) -> Result<HeadComparison> {
    let normalized: String = output
        .chars()
        .map(|c| if c.is_whitespace() { ' ' } else { c })
        .collect();
    let payload: HeadPayload = serde_json::from_str(&normalized)
        .map_err(|_| SyncError::malformed_head_payload(output))?;
    Ok(HeadComparison {
        remote: first_token(payload.remote),
        local: first_token(payload.local),
    })
}

impl Repository {
    /// Current branch as marked in `git branch`.
    pub async fn current_branch(&self) -> Result<Option<String>> {
        let result = self.cmd(self.git(["branch", "--list"])).await?;
        Ok(parse_current_branch(result.output()))
    }

    pub async fn local_branch_info(&self) -> Result<BranchInfo> {
        let branch = match self.cmd(self.git(["symbolic-ref", "HEAD"])).await? {
            CommandResult::Success { output } => {
                let reference = output.trim();
                let name = reference.strip_prefix("refs/heads/").unwrap_or(reference);
                (!name.is_empty()).then(|| name.to_string())
            }
            // detached HEAD
            CommandResult::Failure { .. } => None,
        };

        let remote = match &branch {
            Some(branch) => self.remote_of_branch(branch).await?,
            None => None,
        };

        let head_hash = match self.cmd(self.git(["rev-parse", "HEAD"])).await? {
            CommandResult::Success { output } => output.trim().to_string(),
            CommandResult::Failure { .. } => String::new(),
        };

        Ok(BranchInfo {
            branch,
            remote,
            head_hash,
        })
    }

    /// Tracking remote configured for `branch`.
    pub async fn remote_of_branch(&self, branch: &str) -> Result<Option<String>> {
        let key = format!("branch.{branch}.remote");
        let result = self.cmd(self.git(["config", key.as_str()])).await?;
        let remote = result.output().trim();
        Ok((result.is_success() && !remote.is_empty()).then(|| remote.to_string()))
    }

    pub async fn get_list_of_remotes(&self) -> Result<Vec<Remote>> {
        let result = self.cmd(self.git(["remote", "-v"])).await?;
        Ok(parse_remotes(result.output()))
    }

    /// Remote head (via `ls-remote`) and local head (via `show-ref`) of `branch`,
    /// queried in one command.
    ///
    /// A missing working copy or remote yields an empty remote side and an
    /// explanation on the local side instead of an error.
    pub async fn get_remote_and_local_head_ref(
        &self,
        branch: &str,
        remote: &str,
    ) -> Result<HeadComparison> {
        ensure_not_option("branch", branch)?;
        ensure_not_option("remote", remote)?;
        let missing = HeadComparison {
            remote: String::new(),
            local: format!("{} does not exist", self.directory().display()),
        };

        if !tokio::fs::try_exists(self.directory()).await? {
            return Ok(missing);
        }

        let command = CommandLine::new(
            "sh",
            ["-c", HEAD_REF_SCRIPT, "sh", self.git_program(), remote, branch],
        );
        let result = self.cmd(command).await?;
        let output = result.output();

        if MISSING_MARKERS.iter().any(|marker| output.contains(marker)) {
            log::debug!("Remote '{remote}' not reachable from {}", self.directory().display());
            return Ok(missing);
        }

        parse_head_payload(output)
    }

    /// True exactly when the local and remote heads differ. Ahead, behind and
    /// diverged are not told apart.
    pub async fn has_remote_changes(&self, branch: &str, remote: &str) -> Result<bool> {
        let heads = self.get_remote_and_local_head_ref(branch, remote).await?;
        log::debug!(
            "Heads for {remote}/{branch}: local '{}', remote '{}'",
            heads.local,
            heads.remote
        );
        Ok(heads.differs())
    }
}
