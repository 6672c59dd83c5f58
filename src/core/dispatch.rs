//! Bulk stage, unstage and discard.
//!
//! [`CommandGroups::plan`] sorts the affected paths into at most five git
//! sub-commands; [`Repository::apply_action`] runs them in the fixed order
//! `rm`, `rm --cached`, `add`, `reset`, `checkout` and stops at the first one
//! that fails. Sub-commands that already ran are not undone.

use crate::core::{
    error::{Result, SyncError},
    git_status::{Change, FileStatus, StatusRecord},
    repository::Repository,
    runner::CommandLine,
};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChangeAction {
    Stage,
    Unstage,
    Discard,
}

impl ChangeAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeAction::Stage => "stage",
            ChangeAction::Unstage => "unstage",
            ChangeAction::Discard => "discard",
        }
    }

    /// Whether a record takes part in this action.
    pub fn applies_to(&self, record: &StatusRecord) -> bool {
        match self {
            ChangeAction::Stage => record.status == FileStatus::Unstaged,
            ChangeAction::Unstage => record.status == FileStatus::Staged,
            ChangeAction::Discard => true,
        }
    }
}

impl fmt::Display for ChangeAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChangeAction {
    type Err = SyncError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "stage" => Ok(ChangeAction::Stage),
            "unstage" => Ok(ChangeAction::Unstage),
            "discard" => Ok(ChangeAction::Discard),
            other => Err(SyncError::config_error(format!(
                "'{other}' is not one of stage, unstage, discard"
            ))),
        }
    }
}

/// Paths per git sub-command for one action.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandGroups {
    pub rm: Vec<String>,
    pub rm_cached: Vec<String>,
    pub add: Vec<String>,
    pub reset: Vec<String>,
    pub checkout: Vec<String>,
}

fn push_unique(group: &mut Vec<String>, path: &str) {
    if !group.iter().any(|p| p == path) {
        group.push(path.to_string());
    }
}

impl CommandGroups {
    pub fn plan(action: ChangeAction, records: &[StatusRecord]) -> Self {
        let mut groups = CommandGroups::default();

        for record in records.iter().filter(|r| action.applies_to(r)) {
            let path = record.file_name.as_str();
            let unindexes = matches!(action, ChangeAction::Unstage | ChangeAction::Discard);

            if unindexes {
                push_unique(&mut groups.reset, path);
            }
            if action == ChangeAction::Discard {
                push_unique(&mut groups.checkout, path);
            }
            // a plain reset would leave a newly added file dangling in the index
            if unindexes
                && record.status == FileStatus::Staged
                && record.change == Some(Change::Added)
            {
                push_unique(&mut groups.rm_cached, path);
            }
            if action == ChangeAction::Stage {
                if record.status == FileStatus::Unstaged && record.change == Some(Change::Deleted) {
                    push_unique(&mut groups.rm, path);
                } else {
                    push_unique(&mut groups.add, path);
                }
            }
        }

        groups
    }

    pub fn is_empty(&self) -> bool {
        self.rm.is_empty()
            && self.rm_cached.is_empty()
            && self.add.is_empty()
            && self.reset.is_empty()
            && self.checkout.is_empty()
    }

    /// Non-empty groups as `(operation, git arguments)` in execution order.
    pub fn sequence(&self) -> Vec<(&'static str, Vec<String>)> {
        let steps: [(&'static str, &[&str], &Vec<String>); 5] = [
            ("rm", &["rm", "--"], &self.rm),
            ("rm --cached", &["rm", "--cached", "--"], &self.rm_cached),
            ("add", &["add", "--"], &self.add),
            ("reset", &["reset", "--"], &self.reset),
            ("checkout", &["checkout", "--"], &self.checkout),
        ];

        steps
            .into_iter()
            .filter(|(_, _, paths)| !paths.is_empty())
            .map(|(name, prefix, paths)| {
                let args = prefix
                    .iter()
                    .map(|s| s.to_string())
                    .chain(paths.iter().cloned())
                    .collect();
                (name, args)
            })
            .collect()
    }
}

impl Repository {
    /// Stage, unstage or discard the given records.
    pub async fn apply_action(&self, action: ChangeAction, records: &[StatusRecord]) -> Result<()> {
        let groups = CommandGroups::plan(action, records);
        if groups.is_empty() {
            log::debug!("Nothing to {action} in {} record(s)", records.len());
            return Ok(());
        }

        for (name, args) in groups.sequence() {
            let command: CommandLine = self.git(args).mutating();
            let result = self.cmd(command).await?;
            if !result.is_success() {
                return Err(SyncError::command_failed(
                    format!("git {name}"),
                    result.code(),
                    result.into_output(),
                ));
            }
        }

        Ok(())
    }
}
