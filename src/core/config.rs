use crate::core::dirs::get_config_file;
use crate::core::error::{Result, SyncError};
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const DEFAULT_BRANCH: &str = "master";
pub const DEFAULT_REMOTE: &str = "origin";
pub const DEFAULT_RESCUE_DIR: &str = ".git-sync-rescue";

/// Persisted defaults. Fields missing from the file keep their default value.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct SyncConfig {
    pub default_branch: String,
    pub default_remote: String,
    /// Quarantine directory for the pull rescue, relative to the working copy.
    pub rescue_dir: String,
    pub git_program: String,
    pub dry_run: bool,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            default_branch: DEFAULT_BRANCH.to_string(),
            default_remote: DEFAULT_REMOTE.to_string(),
            rescue_dir: DEFAULT_RESCUE_DIR.to_string(),
            git_program: "git".to_string(),
            dry_run: false,
        }
    }
}

impl SyncConfig {
    pub fn load_or_create() -> Result<Self> {
        let config_file = get_config_file()?;

        if config_file.exists() {
            Self::load_from(&config_file)
        } else {
            let config = Self::default();
            config.save_to(&config_file)?;
            Ok(config)
        }
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        if self.git_program.trim().is_empty() {
            return Err(SyncError::config_error("git_program must not be empty"));
        }
        let rescue = Path::new(&self.rescue_dir);
        if self.rescue_dir.is_empty() || rescue.is_absolute() || self.rescue_dir.contains("..") {
            return Err(SyncError::config_error(format!(
                "rescue_dir '{}' must be a relative path inside the working copy",
                self.rescue_dir
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_save_and_load() -> anyhow::Result<()> {
        let dir = TempDir::new()?;
        let path = dir.path().join("nested/config.json");
        let config = SyncConfig {
            default_branch: "main".into(),
            dry_run: true,
            ..SyncConfig::default()
        };

        config.save_to(&path)?;
        assert_eq!(SyncConfig::load_from(&path)?, config);
        Ok(())
    }

    #[test]
    fn test_partial_file_uses_defaults() -> anyhow::Result<()> {
        let dir = TempDir::new()?;
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"default_remote": "upstream"}"#)?;

        let config = SyncConfig::load_from(&path)?;
        assert_eq!(config.default_remote, "upstream");
        assert_eq!(config.default_branch, "master");
        assert_eq!(config.rescue_dir, ".git-sync-rescue");
        Ok(())
    }

    #[test]
    fn test_rescue_dir_must_stay_inside() -> anyhow::Result<()> {
        let dir = TempDir::new()?;
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"rescue_dir": "../outside"}"#)?;

        let err = SyncConfig::load_from(&path).unwrap_err();
        assert!(matches!(err, SyncError::Config { .. }));
        Ok(())
    }

    #[test]
    fn test_malformed_file_is_json_error() -> anyhow::Result<()> {
        let dir = TempDir::new()?;
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{ not json")?;

        assert!(matches!(SyncConfig::load_from(&path), Err(SyncError::Json(_))));
        Ok(())
    }
}
