//! Secret configuration file storage.
//!
//! Provides read-only loading of API credentials from
//! `~/.config/rookery/secret.json`, with environment variables as the
//! fallback for each service.

use std::env;
use std::fs;
use std::path::PathBuf;

use rookery_core::config::{FalConfig, SecretConfig, TelegramConfig, XPlatformConfig, XaiConfig};
use rookery_core::error::{Result, RookeryError};

use crate::paths::RookeryPaths;

/// Storage for the secret configuration file (secret.json).
///
/// Responsibilities:
/// - Load secret.json and parse it into [`SecretConfig`]
/// - Overlay environment variables for services the file omits
///
/// Does NOT write or modify secret files, validate credentials against the
/// services, or handle encryption (plaintext JSON; keep file permissions
/// tight, e.g. 600).
pub struct SecretStorage {
    path: PathBuf,
}

impl SecretStorage {
    /// Creates a storage with the default path (`~/.config/rookery/secret.json`).
    pub fn new() -> Result<Self> {
        Ok(Self {
            path: RookeryPaths::secret_file()?,
        })
    }

    /// Creates a storage with a custom path (for testing).
    pub fn with_path(path: PathBuf) -> Self {
        Self { path }
    }

    /// Loads secrets from the file, then fills any missing service section
    /// from environment variables (`XAI_API_KEY`, `FAL_KEY`,
    /// `X_ACCESS_TOKEN`, `TELEGRAM_BOT_TOKEN` + `TELEGRAM_CHAT_ID`).
    ///
    /// A missing file is not an error; it behaves as an empty one.
    pub fn load(&self) -> Result<SecretConfig> {
        let mut config = self.load_file()?;

        if config.xai.is_none() {
            if let Ok(api_key) = env::var("XAI_API_KEY") {
                config.xai = Some(XaiConfig { api_key });
            }
        }
        if config.fal.is_none() {
            if let Ok(api_key) = env::var("FAL_KEY") {
                config.fal = Some(FalConfig { api_key });
            }
        }
        if config.x.is_none() {
            if let Ok(access_token) = env::var("X_ACCESS_TOKEN") {
                config.x = Some(XPlatformConfig { access_token });
            }
        }
        if config.telegram.is_none() {
            if let (Ok(bot_token), Ok(chat_id)) =
                (env::var("TELEGRAM_BOT_TOKEN"), env::var("TELEGRAM_CHAT_ID"))
            {
                let chat_id = chat_id.trim().parse::<i64>().map_err(|_| {
                    RookeryError::config("TELEGRAM_CHAT_ID must be a numeric chat id")
                })?;
                config.telegram = Some(TelegramConfig { bot_token, chat_id });
            }
        }

        Ok(config)
    }

    /// Returns the path secrets are read from.
    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    fn load_file(&self) -> Result<SecretConfig> {
        if !self.path.exists() {
            return Ok(SecretConfig::default());
        }
        let content = fs::read_to_string(&self.path)
            .map_err(|e| RookeryError::config(format!("read {}: {e}", self.path.display())))?;
        let config = serde_json::from_str(&content)?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn parses_a_full_secret_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("secret.json");
        fs::write(
            &path,
            r#"{
                "xai": { "api_key": "xai-key" },
                "fal": { "api_key": "fal-key" },
                "x": { "access_token": "x-token" },
                "telegram": { "bot_token": "bot-token", "chat_id": 12345 }
            }"#,
        )
        .unwrap();

        let config = SecretStorage::with_path(path).load().unwrap();
        assert_eq!(config.xai.unwrap().api_key, "xai-key");
        assert_eq!(config.fal.unwrap().api_key, "fal-key");
        assert_eq!(config.x.unwrap().access_token, "x-token");
        let telegram = config.telegram.unwrap();
        assert_eq!(telegram.bot_token, "bot-token");
        assert_eq!(telegram.chat_id, 12345);
    }

    #[test]
    fn partial_file_leaves_other_sections_empty() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("secret.json");
        fs::write(&path, r#"{ "xai": { "api_key": "only-xai" } }"#).unwrap();

        let config = SecretStorage::with_path(path).load().unwrap();
        assert!(config.xai.is_some());
        assert!(config.fal.is_none());
        assert!(config.x.is_none());
    }

    #[test]
    fn invalid_json_is_a_serialization_error() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("secret.json");
        fs::write(&path, "{ not json").unwrap();

        let err = SecretStorage::with_path(path).load().unwrap_err();
        assert!(matches!(err, RookeryError::Serialization { .. }));
    }
}
