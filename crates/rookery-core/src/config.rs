//! Application and secret configuration models.
//!
//! `AppConfig` is the tunable configuration loaded from
//! `~/.config/rookery/config.toml`; `SecretConfig` holds API credentials
//! loaded from `~/.config/rookery/secret.json` (or environment variables).

use serde::{Deserialize, Serialize};

use crate::error::{Result, RookeryError};

/// How the posting pipeline routes drafts through human review.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalPolicy {
    /// Every draft requires an explicit reviewer decision before publishing.
    Mandatory,
    /// Review is used when the channel is configured; an unreachable channel
    /// falls back to publishing directly.
    OptionalIfAvailable,
    /// Drafts are published without review.
    Disabled,
}

impl Default for ApprovalPolicy {
    fn default() -> Self {
        ApprovalPolicy::Mandatory
    }
}

/// Persona used to steer content generation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PersonaConfig {
    pub name: String,
    /// Free-form character brief injected ahead of every generation prompt.
    pub lore: String,
    /// How many previously published posts are fed back as context.
    pub history_window: usize,
}

impl Default for PersonaConfig {
    fn default() -> Self {
        Self {
            name: "Rookery".to_string(),
            lore: "You are an upbeat mascot account that shares short, friendly \
                   posts about technology and nature. Keep posts positive and engaging."
                .to_string(),
            history_window: 3,
        }
    }
}

/// Inclusive range the inter-cycle sleep is drawn from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SleepRange {
    pub min_secs: u64,
    pub max_secs: u64,
}

impl Default for SleepRange {
    fn default() -> Self {
        // 1 to 3 hours
        Self {
            min_secs: 3_600,
            max_secs: 10_800,
        }
    }
}

/// Cycle timing configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScheduleConfig {
    /// Sleep range between cycles when drafts go through review.
    pub approval_gated: SleepRange,
    /// Sleep range between cycles when posting directly.
    pub direct_post: SleepRange,
    /// Fixed backoff after a failed cycle, shorter than the normal sleep.
    pub error_backoff_secs: u64,
    /// How long a draft may wait for a reviewer decision.
    pub approval_timeout_secs: u64,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            approval_gated: SleepRange::default(),
            direct_post: SleepRange::default(),
            error_backoff_secs: 300,
            approval_timeout_secs: 86_400,
        }
    }
}

/// Content-generation settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    /// Chat-completions model name.
    pub model: String,
    pub max_tokens: u32,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            model: "grok-4".to_string(),
            max_tokens: 300,
        }
    }
}

/// Approval routing section.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApprovalConfig {
    pub policy: ApprovalPolicy,
}

/// Root application configuration (config.toml).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub persona: PersonaConfig,
    pub schedule: ScheduleConfig,
    pub approval: ApprovalConfig,
    pub generation: GenerationConfig,
}

impl AppConfig {
    /// Validates cross-field constraints that serde cannot express.
    ///
    /// # Errors
    ///
    /// Returns `RookeryError::Config` when a sleep range is inverted or the
    /// approval timeout is zero.
    pub fn validate(&self) -> Result<()> {
        for (label, range) in [
            ("schedule.approval_gated", self.schedule.approval_gated),
            ("schedule.direct_post", self.schedule.direct_post),
        ] {
            if range.min_secs > range.max_secs {
                return Err(RookeryError::config(format!(
                    "{label}: min_secs ({}) exceeds max_secs ({})",
                    range.min_secs, range.max_secs
                )));
            }
        }
        if self.schedule.approval_timeout_secs == 0 {
            return Err(RookeryError::config(
                "schedule.approval_timeout_secs must be non-zero",
            ));
        }
        Ok(())
    }
}

// ============================================================================
// Secrets
// ============================================================================

/// xAI (content generation) credentials.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct XaiConfig {
    pub api_key: String,
}

/// fal.ai (image synthesis) credentials.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FalConfig {
    pub api_key: String,
}

/// X platform (publishing) credentials.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct XPlatformConfig {
    /// OAuth2 user-context access token.
    pub access_token: String,
}

/// Telegram (review channel) credentials.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelegramConfig {
    pub bot_token: String,
    /// Chat authorized to review drafts.
    pub chat_id: i64,
}

/// Secret configuration (secret.json).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SecretConfig {
    /// xAI API configuration
    #[serde(default)]
    pub xai: Option<XaiConfig>,
    /// fal.ai API configuration
    #[serde(default)]
    pub fal: Option<FalConfig>,
    /// X platform API configuration
    #[serde(default)]
    pub x: Option<XPlatformConfig>,
    /// Telegram bot configuration
    #[serde(default)]
    pub telegram: Option<TelegramConfig>,
}

impl SecretConfig {
    /// Whether the review channel has everything it needs to run.
    pub fn telegram_configured(&self) -> bool {
        self.telegram.is_some()
    }
}
