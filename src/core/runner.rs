//! External command execution.
//!
//! Every interaction with git goes through a [`CommandRunner`]. Commands are
//! described as a [`CommandLine`], a program plus an argument vector, so file
//! names, branch names and commit messages are never spliced into shell text.
//! A run produces a [`CommandResult`] which is either a success carrying the
//! combined output or a failure carrying the exit code as well. A non-zero
//! exit is not an `Err`; callers inspect the result explicitly.
//!
//! [`LogSink`] is the append-only transcript shared by repository handles.

use crate::core::error::{Result, SyncError};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::ffi::OsStr;
use std::fmt;
use std::path::Path;
use std::process::Stdio;
use std::sync::{Arc, Mutex, PoisonError};

/// A program invocation with a structured argument list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandLine {
    pub program: String,
    pub args: Vec<String>,
    /// Changes the index, work tree, refs or remote. Skipped in dry-run mode.
    pub mutates: bool,
}

impl CommandLine {
    pub fn new<I, S>(program: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
            mutates: false,
        }
    }

    pub fn mutating(mut self) -> Self {
        self.mutates = true;
        self
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }
}

fn needs_quoting(arg: &str) -> bool {
    arg.is_empty()
        || arg
            .chars()
            .any(|c| c.is_whitespace() || "'\"\\$`;&|<>()*?![]{}#~".contains(c))
}

impl fmt::Display for CommandLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            if needs_quoting(arg) {
                write!(f, " '{}'", arg.replace('\'', r"'\''"))?;
            } else {
                write!(f, " {arg}")?;
            }
        }
        Ok(())
    }
}

/// Outcome of a finished command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandResult {
    Success { output: String },
    Failure { code: i32, output: String },
}

impl CommandResult {
    pub fn success(output: impl Into<String>) -> Self {
        Self::Success {
            output: output.into(),
        }
    }

    pub fn failure(code: i32, output: impl Into<String>) -> Self {
        Self::Failure {
            code,
            output: output.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    pub fn output(&self) -> &str {
        match self {
            Self::Success { output } | Self::Failure { output, .. } => output,
        }
    }

    pub fn code(&self) -> i32 {
        match self {
            Self::Success { .. } => 0,
            Self::Failure { code, .. } => *code,
        }
    }

    pub fn into_output(self) -> String {
        match self {
            Self::Success { output } | Self::Failure { output, .. } => output,
        }
    }

    /// Turn a failure into [`SyncError::CommandFailed`] for `operation`.
    pub fn into_result(self, operation: &str) -> Result<String> {
        match self {
            Self::Success { output } => Ok(output),
            Self::Failure { code, output } => Err(SyncError::command_failed(operation, code, output)),
        }
    }
}

/// Executes commands in a given working directory.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    async fn run(&self, command: &CommandLine, working_dir: &Path) -> Result<CommandResult>;
}

/// Runs commands as child processes through tokio.
///
/// Output is stdout followed by stderr; the two streams are not interleaved.
#[derive(Debug, Clone, Default)]
pub struct ProcessRunner;

impl ProcessRunner {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl CommandRunner for ProcessRunner {
    async fn run(&self, command: &CommandLine, working_dir: &Path) -> Result<CommandResult> {
        let output = tokio::process::Command::new(&command.program)
            .args(command.args.iter().map(OsStr::new))
            .current_dir(working_dir)
            .env("GIT_TERMINAL_PROMPT", "0")
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|source| SyncError::Spawn {
                program: command.program.clone(),
                source,
            })?;

        let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
        text.push_str(&String::from_utf8_lossy(&output.stderr));

        Ok(match output.status.code() {
            Some(0) => CommandResult::success(text),
            // killed by a signal
            code => CommandResult::failure(code.unwrap_or(-1), text),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LogEntry {
    pub at: DateTime<Utc>,
    pub text: String,
}

/// Append-only command transcript.
///
/// Clones share the same buffer, so several repository handles may write to
/// one sink. Each append is a single locked push; entries are never edited.
#[derive(Debug, Clone, Default)]
pub struct LogSink {
    entries: Arc<Mutex<Vec<LogEntry>>>,
}

impl LogSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&self, text: impl Into<String>) {
        let entry = LogEntry {
            at: Utc::now(),
            text: text.into(),
        };
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(entry);
    }

    pub fn entries(&self) -> Vec<LogEntry> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// All entries concatenated in append order.
    pub fn contents(&self) -> String {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|entry| entry.text.as_str())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Canned runner for unit tests: records every command line and replays
/// results registered per command prefix.
#[cfg(test)]
pub(crate) mod scripted {
    use super::*;
    use std::collections::VecDeque;

    #[derive(Default)]
    pub(crate) struct ScriptedRunner {
        rules: Mutex<Vec<(String, VecDeque<CommandResult>)>>,
        calls: Mutex<Vec<String>>,
    }

    impl ScriptedRunner {
        pub(crate) fn new() -> Self {
            Self::default()
        }

        /// Queue `result` for commands starting with `prefix`. The longest
        /// matching prefix wins; the last queued result of a rule repeats.
        pub(crate) fn on(self, prefix: &str, result: CommandResult) -> Self {
            {
                let mut rules = self.rules.lock().unwrap();
                match rules.iter_mut().find(|(p, _)| p == prefix) {
                    Some((_, queue)) => queue.push_back(result),
                    None => rules.push((prefix.to_string(), VecDeque::from([result]))),
                }
            }
            self
        }

        pub(crate) fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl CommandRunner for ScriptedRunner {
        async fn run(&self, command: &CommandLine, _working_dir: &Path) -> Result<CommandResult> {
            let rendered = command.to_string();
            self.calls.lock().unwrap().push(rendered.clone());

            let mut rules = self.rules.lock().unwrap();
            let rule = rules
                .iter_mut()
                .filter(|(prefix, _)| rendered.starts_with(prefix.as_str()))
                .max_by_key(|(prefix, _)| prefix.len());

            Ok(match rule {
                Some((_, queue)) if queue.len() > 1 => queue.pop_front().unwrap(),
                Some((_, queue)) => queue.front().cloned().unwrap(),
                None => CommandResult::success(""),
            })
        }
    }
}
