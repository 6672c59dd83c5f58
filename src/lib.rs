//! git-sync - keep git working copies up to date without losing local work.
//!
//! The library reads `git status` into typed records, stages, unstages or
//! discards them in bulk, and updates a branch from its remote while stashing
//! local edits, switching branches as needed and moving aside untracked files
//! that would block the pull.
//!
//! # Public API
//! The main public interface is re-exported from the [`core`] module:
//! - [`Repository`], the handle every operation runs on
//! - status records and the change action dispatcher
//! - the safe update and its outcome
//! - packages described by `package.json`
//! - error handling and result types

pub mod commands;
pub mod core;

pub use crate::core::{
    BranchInfo,
    ChangeAction,
    CommandLine,
    CommandResult,
    CommandRunner,
    FileStatus,
    LogSink,
    Package,
    PackageManifest,
    Repository,
    Result,
    StatusRecord,
    SyncConfig,
    SyncError,
    UpdateOutcome,
};
