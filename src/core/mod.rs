//! Core functionality for the git-sync tool.
//!
//! This module provides the building blocks for keeping working copies in
//! sync: running git, reading its status and references, bulk staging, the
//! safe update and package handling.

pub mod config;
pub mod dirs;
pub mod dispatch;
pub mod error;
pub mod git_status;
pub mod output;
pub mod package;
pub mod refs;
pub mod repository;
pub mod rescue;
pub mod runner;
pub mod update;

// === Error handling ===
pub use error::{Result, SyncError};

// === Command execution ===
// Structured command lines, their results and the per-repository command log
pub use runner::{CommandLine, CommandResult, CommandRunner, LogEntry, LogSink, ProcessRunner};

// === Repository ===
pub use repository::Repository;

// === Status and references ===
pub use git_status::{parse_porcelain, Change, Conflict, FileStatus, StatusRecord};
pub use refs::{BranchInfo, HeadComparison, Remote};

// === Operations ===
pub use dispatch::{ChangeAction, CommandGroups};
pub use rescue::overwritten_untracked_files;
pub use update::{UpdateOutcome, UpdateStep};

// === Packages ===
pub use package::{Package, PackageManifest};

// === Configuration ===
pub use config::SyncConfig;

// === Output formatting ===
pub use output::{print_error, print_info, print_section_header, print_status_records, print_success};
