//! Packages: working copies described by a `package.json`.
//!
//! A [`Package`] knows where its repository comes from (`repoURL`, `branch`)
//! so it can be cloned when missing and safely updated when present. Its
//! declared dependencies can be matched against other packages and linked
//! into them.

use crate::core::{
    config::{SyncConfig, DEFAULT_BRANCH},
    error::{Result, SyncError},
    repository::Repository,
    rescue::is_plain_relative,
    runner::{CommandRunner, LogSink},
    update::UpdateOutcome,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub const MANIFEST_FILE: &str = "package.json";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PackageManifest {
    pub name: String,
    pub version: Option<String>,
    #[serde(rename = "repoURL")]
    pub repo_url: String,
    pub branch: String,
    pub dependencies: BTreeMap<String, String>,
    pub dev_dependencies: BTreeMap<String, String>,
}

impl Default for PackageManifest {
    fn default() -> Self {
        Self {
            name: String::new(),
            version: None,
            repo_url: String::new(),
            branch: DEFAULT_BRANCH.to_string(),
            dependencies: BTreeMap::new(),
            dev_dependencies: BTreeMap::new(),
        }
    }
}

impl PackageManifest {
    /// Overlay the top-level keys of `content` onto this manifest. Keys the
    /// file does not mention keep their current value.
    pub fn merge_json(&self, content: &str) -> Result<Self> {
        let mut merged = serde_json::to_value(self)?;
        let overlay: Value = serde_json::from_str(content)?;
        match (&mut merged, overlay) {
            (Value::Object(base), Value::Object(fields)) => base.extend(fields),
            _ => return Err(SyncError::config_error("package manifest is not a JSON object")),
        }
        Ok(serde_json::from_value(merged)?)
    }
}

pub struct Package {
    directory: PathBuf,
    manifest: PackageManifest,
    config: SyncConfig,
    runner: Option<Arc<dyn CommandRunner>>,
}

impl Package {
    pub fn new(directory: impl Into<PathBuf>, manifest: PackageManifest) -> Self {
        Self {
            directory: directory.into(),
            manifest,
            config: SyncConfig::default(),
            runner: None,
        }
    }

    pub fn with_config(mut self, config: SyncConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_runner(mut self, runner: Arc<dyn CommandRunner>) -> Self {
        self.runner = Some(runner);
        self
    }

    /// Merge `package.json` from the package directory into the manifest.
    /// A missing or broken file is reported and otherwise ignored.
    pub async fn read_config(mut self) -> Self {
        let path = self.directory.join(MANIFEST_FILE);
        let merged = match tokio::fs::read_to_string(&path).await {
            Ok(content) if content.trim().is_empty() => return self,
            Ok(content) => self.manifest.merge_json(&content),
            Err(e) => Err(e.into()),
        };
        match merged {
            Ok(manifest) => self.manifest = manifest,
            Err(e) => log::warn!(
                "Error when reading package config for {}: {e}",
                self.directory.display()
            ),
        }
        self
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    pub fn manifest(&self) -> &PackageManifest {
        &self.manifest
    }

    pub fn name(&self) -> &str {
        &self.manifest.name
    }

    pub fn version(&self) -> Option<&str> {
        self.manifest.version.as_deref()
    }

    /// Runtime and development dependencies; development entries win on
    /// duplicate names.
    pub fn dependencies(&self) -> BTreeMap<String, String> {
        let mut all = self.manifest.dependencies.clone();
        all.extend(self.manifest.dev_dependencies.clone());
        all
    }

    pub async fn exists(&self) -> Result<bool> {
        Ok(tokio::fs::try_exists(&self.directory).await?)
    }

    /// Repository handle for the package directory.
    pub fn repo(&self) -> Repository {
        let repo = Repository::from_config(&self.directory, &self.config);
        match &self.runner {
            Some(runner) => repo.with_runner(Arc::clone(runner)),
            None => repo,
        }
    }

    /// Clone the package when its directory does not exist yet.
    pub async fn ensure(&self, log: &LogSink) -> Result<&Self> {
        if !self.exists().await? {
            log::info!(
                "Cloning {} into {}",
                self.manifest.repo_url,
                self.directory.display()
            );
            self.repo()
                .with_log(log.clone())
                .clone(&self.manifest.repo_url, &self.manifest.branch)
                .await?;
        }
        Ok(self)
    }

    /// Safely update the configured branch when the package is present.
    pub async fn update(&self, log: &LogSink) -> Result<Option<UpdateOutcome>> {
        if !self.exists().await? {
            return Ok(None);
        }
        let outcome = self
            .repo()
            .with_log(log.clone())
            .interactively_update(&self.manifest.branch, &self.config.default_remote)
            .await?;
        Ok(Some(outcome))
    }

    /// The packages among `packages` this one depends on.
    pub fn find_dependencies_in<'a>(&self, packages: &'a [Package]) -> Vec<&'a Package> {
        let deps = self.dependencies();
        packages
            .iter()
            .filter(|p| deps.contains_key(p.name()))
            .collect()
    }

    /// Link this package into `to_package` as `<to_package>/<local_dir>/<name>`,
    /// replacing whatever is there.
    pub async fn symlink_to(&self, local_dir: &str, to_package: &Package) -> Result<PathBuf> {
        // scoped names such as `@scope/x` are fine, anything leaving the directory is not
        if !is_plain_relative(Path::new(self.name())) {
            return Err(SyncError::config_error(format!(
                "package at {} cannot be linked as '{}'",
                self.directory.display(),
                self.name()
            )));
        }
        if !is_plain_relative(Path::new(local_dir)) {
            return Err(SyncError::config_error(format!(
                "'{local_dir}' is not a directory inside {}",
                to_package.directory().display()
            )));
        }

        let link = to_package.directory().join(local_dir).join(self.name());
        if let Some(parent) = link.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        if let Ok(meta) = tokio::fs::symlink_metadata(&link).await {
            if meta.is_dir() {
                tokio::fs::remove_dir_all(&link).await?;
            } else {
                remove_link(&link).await?;
            }
        }

        let target = std::path::absolute(&self.directory)?;
        log::debug!("Linking {} -> {}", link.display(), target.display());
        create_dir_link(&target, &link).await?;
        Ok(link)
    }
}

#[cfg(unix)]
async fn create_dir_link(target: &Path, link: &Path) -> Result<()> {
    Ok(tokio::fs::symlink(target, link).await?)
}

#[cfg(windows)]
async fn create_dir_link(target: &Path, link: &Path) -> Result<()> {
    Ok(tokio::fs::symlink_dir(target, link).await?)
}

#[cfg(unix)]
async fn remove_link(link: &Path) -> Result<()> {
    Ok(tokio::fs::remove_file(link).await?)
}

// directory symlinks on windows are removed like directories
#[cfg(windows)]
async fn remove_link(link: &Path) -> Result<()> {
    match tokio::fs::remove_dir(link).await {
        Ok(()) => Ok(()),
        Err(_) => Ok(tokio::fs::remove_file(link).await?),
    }
}
