//! Domain-specific error types for git-sync.
//!
//! [`SyncError`] covers every failure that escapes a repository operation. Expected
//! states such as a detached HEAD, a branch without upstream or an already
//! up-to-date working copy are never errors; they come back as ordinary values.
//!
//! # Error Categories
//! - **Command failures**: a git sub-command exited non-zero, output kept verbatim
//! - **Contract violations**: git printed something the parsers cannot read
//! - **Preconditions**: missing branch/remote for push, existing clone target
//! - **I/O and configuration**: file moves during rescue, config persistence

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SyncError {
    #[error("Not in a git repository")]
    NotInGitRepo,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Failed to start '{program}': {source}")]
    Spawn {
        program: String,
        source: std::io::Error,
    },

    /// A git sub-command exited non-zero. `output` is the raw combined output.
    #[error("Error in {operation}: {output}")]
    CommandFailed {
        operation: String,
        code: i32,
        output: String,
    },

    #[error("Failed to checkout {target}: {output}")]
    CheckoutFailed { target: String, output: String },

    /// The head comparison query printed something that is not the expected payload.
    #[error("Unexpected head comparison output: {output}")]
    MalformedHeadPayload { output: String },

    #[error("No remote for pushing {}", directory.display())]
    NoRemote { directory: PathBuf },

    #[error("No branch for pushing {}", directory.display())]
    NoBranch { directory: PathBuf },

    #[error("No commit message")]
    EmptyCommitMessage,

    #[error("Cannot clone into {}: exists already", path.display())]
    AlreadyExists { path: PathBuf },

    #[error("No changed files match the given paths")]
    NoMatchingFiles,

    #[error("Configuration error: {message}")]
    Config { message: String },
}

/// Convenience type alias for Results using SyncError
pub type Result<T> = std::result::Result<T, SyncError>;

impl SyncError {
    pub fn command_failed(operation: impl Into<String>, code: i32, output: impl Into<String>) -> Self {
        Self::CommandFailed {
            operation: operation.into(),
            code,
            output: output.into(),
        }
    }

    pub fn checkout_failed(target: impl Into<String>, output: impl Into<String>) -> Self {
        Self::CheckoutFailed {
            target: target.into(),
            output: output.into(),
        }
    }

    pub fn malformed_head_payload(output: impl Into<String>) -> Self {
        Self::MalformedHeadPayload {
            output: output.into(),
        }
    }

    pub fn config_error(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Raw git output carried by the error, if any.
    pub fn command_output(&self) -> Option<&str> {
        match self {
            Self::CommandFailed { output, .. }
            | Self::CheckoutFailed { output, .. }
            | Self::MalformedHeadPayload { output } => Some(output),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = SyncError::NotInGitRepo;
        assert_eq!(err.to_string(), "Not in a git repository");
    }

    #[test]
    fn test_command_failed_keeps_raw_output() {
        let err = SyncError::command_failed("stash pop", 1, "CONFLICT (content): Merge conflict in a.txt");
        assert_eq!(
            err.to_string(),
            "Error in stash pop: CONFLICT (content): Merge conflict in a.txt"
        );
        assert_eq!(
            err.command_output(),
            Some("CONFLICT (content): Merge conflict in a.txt")
        );
    }

    #[test]
    fn test_checkout_failed_names_target() {
        let err = SyncError::checkout_failed("feature", "error: pathspec 'feature' did not match");
        assert!(err.to_string().contains("Failed to checkout feature"));
        assert!(err.to_string().contains("did not match"));
    }

    #[test]
    fn test_push_precondition_errors() {
        let err = SyncError::NoRemote {
            directory: PathBuf::from("/work/repo"),
        };
        assert_eq!(err.to_string(), "No remote for pushing /work/repo");

        let err = SyncError::NoBranch {
            directory: PathBuf::from("/work/repo"),
        };
        assert_eq!(err.to_string(), "No branch for pushing /work/repo");
    }

    #[test]
    fn test_io_error_has_no_command_output() {
        let err = SyncError::from(std::io::Error::new(std::io::ErrorKind::NotFound, "gone"));
        assert!(err.command_output().is_none());
        assert!(err.to_string().contains("gone"));
    }
}
