//! Predefined repository scenarios
//!
//! Most update tests need an upstream repository and a clone of it, so the
//! pair is built here once.

#![allow(dead_code)]

use super::repository::*;
use anyhow::Result;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// An upstream repository on `master` and a working clone whose `origin`
/// points at it.
pub struct UpstreamAndClone {
    pub temp_dir: TempDir,
    pub upstream: PathBuf,
    pub work: PathBuf,
}

impl UpstreamAndClone {
    pub fn upstream(&self) -> &Path {
        &self.upstream
    }

    pub fn work(&self) -> &Path {
        &self.work
    }

    /// Commit a file in the upstream so the working clone falls behind.
    pub fn advance_upstream(&self, filename: &str, content: &str) -> Result<String> {
        commit_file(&self.upstream, filename, content, &format!("Upstream {filename}"))?;
        head_hash(&self.upstream)
    }
}

pub fn create_upstream_and_clone() -> Result<UpstreamAndClone> {
    let temp_dir = TempDir::new()?;
    let upstream = temp_dir.path().join("upstream");
    let work = temp_dir.path().join("work");

    init_at(&upstream)?;
    commit_file(&upstream, "readme.txt", "hello\n", "Initial commit")?;
    commit_file(&upstream, "shared.txt", "line 1\nline 2\n", "Add shared file")?;
    clone_into(&upstream, &work)?;

    Ok(UpstreamAndClone {
        temp_dir,
        upstream,
        work,
    })
}
