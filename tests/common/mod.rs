//! Shared test utilities for git-sync integration tests.
//!
//! Everything here drives the real `git` binary inside temporary
//! directories.

pub mod assertions;
pub mod fixtures;
pub mod repository;
