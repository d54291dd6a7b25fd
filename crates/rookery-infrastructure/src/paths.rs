//! Unified path management for rookery state and configuration files.
//!
//! # Directory Structure
//!
//! ```text
//! ~/.config/rookery/           # Config directory
//! ├── config.toml              # Application configuration
//! └── secret.json              # API keys and credentials
//!
//! ~/.local/share/rookery/      # Data directory
//! ├── pending_drafts.json      # Drafts awaiting a reviewer decision
//! ├── history.json             # Published post texts, in order
//! └── previews/                # Temporary preview images, one per cycle
//! ```

use std::path::PathBuf;

use rookery_core::error::{Result, RookeryError};

const APP_DIR: &str = "rookery";

/// Path resolution for every file rookery reads or writes.
pub struct RookeryPaths;

impl RookeryPaths {
    /// Returns the configuration directory (e.g. `~/.config/rookery/`).
    pub fn config_dir() -> Result<PathBuf> {
        dirs::config_dir()
            .map(|dir| dir.join(APP_DIR))
            .ok_or_else(|| RookeryError::config("cannot determine the config directory"))
    }

    /// Returns the data directory (e.g. `~/.local/share/rookery/`).
    pub fn data_dir() -> Result<PathBuf> {
        dirs::data_dir()
            .map(|dir| dir.join(APP_DIR))
            .ok_or_else(|| RookeryError::config("cannot determine the data directory"))
    }

    /// Path to `config.toml`.
    pub fn config_file() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join("config.toml"))
    }

    /// Path to `secret.json`.
    pub fn secret_file() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join("secret.json"))
    }

    /// Path to the pending-draft store.
    pub fn pending_drafts_file() -> Result<PathBuf> {
        Ok(Self::data_dir()?.join("pending_drafts.json"))
    }

    /// Path to the publication history.
    pub fn history_file() -> Result<PathBuf> {
        Ok(Self::data_dir()?.join("history.json"))
    }

    /// Directory preview images are materialized into.
    pub fn previews_dir() -> Result<PathBuf> {
        Ok(Self::data_dir()?.join("previews"))
    }
}
