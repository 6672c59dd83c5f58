//! Pull rescue for untracked files.
//!
//! When git refuses to pull because untracked files would be overwritten,
//! those files are moved into a quarantine directory inside the working copy,
//! the pull is retried once and the files are moved back afterwards. Moving
//! back happens whether or not the retry succeeded.

use crate::core::{
    error::{Result, SyncError},
    repository::Repository,
    runner::CommandResult,
};
use std::future::Future;
use std::path::{Component, Path, PathBuf};

pub const UNTRACKED_OVERWRITE_SIGNATURE: &str = "untracked working tree files would be overwritten";

/// Paths listed under the untracked-overwrite message, i.e. the indented
/// lines directly following it.
pub fn overwritten_untracked_files(output: &str) -> Vec<String> {
    let mut lines = output.trim().lines();
    if !lines.any(|line| line.contains(UNTRACKED_OVERWRITE_SIGNATURE)) {
        return Vec::new();
    }
    lines
        .take_while(|line| line.starts_with(char::is_whitespace))
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

/// Relative and free of `.`, `..` and root components.
pub(crate) fn is_plain_relative(path: &Path) -> bool {
    path.components().next().is_some()
        && path
            .components()
            .all(|c| matches!(c, Component::Normal(_)))
}

struct Relocation {
    original: PathBuf,
    quarantined: PathBuf,
}

impl Repository {
    /// Pull, and if untracked files block it, move them aside and retry once.
    ///
    /// The returned result is the initial pull's when no rescue was attempted,
    /// otherwise the retry's.
    pub async fn pull_rescuing(&self, branch: &str, remote: &str) -> Result<CommandResult> {
        let initial = self.pull(branch, remote).await?;
        if initial.is_success() || !initial.output().contains(UNTRACKED_OVERWRITE_SIGNATURE) {
            return Ok(initial);
        }

        let files = overwritten_untracked_files(initial.output());
        if files.is_empty() {
            return Ok(initial);
        }

        log::info!(
            "Pull of {remote}/{branch} blocked by {} untracked file(s), moving them aside",
            files.len()
        );
        self.move_files_elsewhere_while(&files, || self.pull(branch, remote))
            .await
    }

    /// Move `files` (relative to the working copy) into the rescue directory,
    /// run `operation`, then move every one of them back.
    pub async fn move_files_elsewhere_while<F, Fut, T>(&self, files: &[String], operation: F) -> Result<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let rescue_root = self.directory().join(self.rescue_dir());
        let mut moved: Vec<Relocation> = Vec::with_capacity(files.len());

        for file in files {
            let relative = Path::new(file);
            if !is_plain_relative(relative) {
                log::warn!("Not relocating suspicious path '{file}'");
                continue;
            }
            let relocation = Relocation {
                original: self.directory().join(relative),
                quarantined: rescue_root.join(relative),
            };
            if let Err(e) = self.relocate(&relocation.original, &relocation.quarantined).await {
                self.restore_all(&moved, &rescue_root).await?;
                return Err(e);
            }
            moved.push(relocation);
        }

        let outcome = operation().await;
        self.restore_all(&moved, &rescue_root).await?;
        outcome
    }

    async fn relocate(&self, from: &Path, to: &Path) -> Result<()> {
        if let Some(parent) = to.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        self.log_sink()
            .append(format!("mv {} {}\n", from.display(), to.display()));
        tokio::fs::rename(from, to).await?;
        Ok(())
    }

    /// Move everything back, attempting every file even if some fail.
    async fn restore_all(&self, moved: &[Relocation], rescue_root: &Path) -> Result<()> {
        let mut first_error: Option<SyncError> = None;

        for relocation in moved {
            if let Err(e) = self
                .relocate(&relocation.quarantined, &relocation.original)
                .await
            {
                log::error!(
                    "Could not restore {} from {}: {e}",
                    relocation.original.display(),
                    relocation.quarantined.display()
                );
                first_error.get_or_insert(e);
            }
        }

        if first_error.is_none() {
            remove_empty_dirs(rescue_root).await;
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

/// Remove `root` and its subdirectories if they hold no files.
async fn remove_empty_dirs(root: &Path) {
    let mut stack = vec![root.to_path_buf()];
    let mut dirs = Vec::new();
    while let Some(dir) = stack.pop() {
        let Ok(mut entries) = tokio::fs::read_dir(&dir).await else {
            continue;
        };
        while let Ok(Some(entry)) = entries.next_entry().await {
            if entry.file_type().await.is_ok_and(|t| t.is_dir()) {
                stack.push(entry.path());
            }
        }
        dirs.push(dir);
    }
    // deepest first; non-empty directories simply stay
    for dir in dirs.into_iter().rev() {
        let _ = tokio::fs::remove_dir(&dir).await;
    }
}
