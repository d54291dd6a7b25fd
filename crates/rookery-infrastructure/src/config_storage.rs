//! Application configuration file storage.

use std::fs;
use std::path::PathBuf;

use rookery_core::config::AppConfig;
use rookery_core::error::{Result, RookeryError};

use crate::paths::RookeryPaths;

/// Loads `config.toml`, falling back to defaults when the file is absent.
pub struct ConfigStorage {
    path: PathBuf,
}

impl ConfigStorage {
    /// Creates a storage with the default path (`~/.config/rookery/config.toml`).
    pub fn new() -> Result<Self> {
        Ok(Self {
            path: RookeryPaths::config_file()?,
        })
    }

    /// Creates a storage with a custom path (for testing).
    pub fn with_path(path: PathBuf) -> Self {
        Self { path }
    }

    /// Loads and validates the configuration.
    ///
    /// # Returns
    ///
    /// - `Ok(AppConfig)`: parsed (or default, when the file is missing) and
    ///   validated
    /// - `Err`: unreadable file, TOML parse error, or failed validation
    pub fn load(&self) -> Result<AppConfig> {
        let config = if self.path.exists() {
            let content = fs::read_to_string(&self.path)
                .map_err(|e| RookeryError::config(format!("read {}: {e}", self.path.display())))?;
            toml::from_str(&content)?
        } else {
            tracing::info!(path = %self.path.display(), "no config file, using defaults");
            AppConfig::default()
        };

        config.validate()?;
        Ok(config)
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rookery_core::config::ApprovalPolicy;
    use tempfile::TempDir;

    #[test]
    fn missing_file_yields_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let storage = ConfigStorage::with_path(temp_dir.path().join("config.toml"));
        let config = storage.load().unwrap();
        assert_eq!(config, AppConfig::default());
    }

    #[test]
    fn file_overrides_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        fs::write(
            &path,
            r#"
            [approval]
            policy = "optional_if_available"

            [schedule.direct_post]
            min_secs = 60
            max_secs = 120
            "#,
        )
        .unwrap();

        let config = ConfigStorage::with_path(path).load().unwrap();
        assert_eq!(config.approval.policy, ApprovalPolicy::OptionalIfAvailable);
        assert_eq!(config.schedule.direct_post.min_secs, 60);
        assert_eq!(config.schedule.direct_post.max_secs, 120);
    }

    #[test]
    fn invalid_ranges_fail_validation() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        fs::write(
            &path,
            r#"
            [schedule.approval_gated]
            min_secs = 500
            max_secs = 100
            "#,
        )
        .unwrap();

        assert!(ConfigStorage::with_path(path).load().is_err());
    }
}
