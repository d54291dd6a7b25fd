//! Error types for the rookery application.

use thiserror::Error;

/// A shared error type for the entire rookery workspace.
///
/// The first six variants are the failure taxonomy of the posting pipeline;
/// the rest cover ambient concerns (configuration, serialization, shutdown).
#[derive(Error, Debug)]
pub enum RookeryError {
    /// The content-generation service returned a malformed or missing reply.
    #[error("content generation failed: {0}")]
    GenerationFailed(String),

    /// The image-synthesis service failed to produce or deliver an image.
    #[error("image synthesis failed: {0}")]
    ImageFailed(String),

    /// The review channel could not be reached to render or update a draft.
    #[error("review channel unavailable: {0}")]
    ChannelUnavailable(String),

    /// The social platform rejected or failed the publish call.
    #[error("publish failed: {0}")]
    PublishFailed(String),

    /// The approval window elapsed without a reviewer decision.
    #[error("approval window elapsed")]
    Timeout,

    /// The backing store failed a read or write.
    #[error("store I/O error: {0}")]
    StoreIo(String),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Serialization/deserialization error
    #[error("serialization error: {format} - {message}")]
    Serialization { format: String, message: String },

    /// Shutdown was requested while waiting; the caller should unwind.
    #[error("shutdown requested")]
    Shutdown,

    /// Internal error (should not happen in normal operation)
    #[error("internal error: {0}")]
    Internal(String),
}

impl RookeryError {
    // ============================================================================
    // Constructor helpers
    // ============================================================================

    /// Creates a GenerationFailed error
    pub fn generation(message: impl Into<String>) -> Self {
        Self::GenerationFailed(message.into())
    }

    /// Creates an ImageFailed error
    pub fn image(message: impl Into<String>) -> Self {
        Self::ImageFailed(message.into())
    }

    /// Creates a ChannelUnavailable error
    pub fn channel(message: impl Into<String>) -> Self {
        Self::ChannelUnavailable(message.into())
    }

    /// Creates a PublishFailed error
    pub fn publish(message: impl Into<String>) -> Self {
        Self::PublishFailed(message.into())
    }

    /// Creates a StoreIo error
    pub fn store(message: impl Into<String>) -> Self {
        Self::StoreIo(message.into())
    }

    /// Creates a Config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Creates an Internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    // ============================================================================
    // Type checking methods
    // ============================================================================

    /// Check if this is a ChannelUnavailable error
    pub fn is_channel_unavailable(&self) -> bool {
        matches!(self, Self::ChannelUnavailable(_))
    }

    /// Check if this is a Shutdown error
    pub fn is_shutdown(&self) -> bool {
        matches!(self, Self::Shutdown)
    }

    /// Check if this is a StoreIo error
    pub fn is_store_io(&self) -> bool {
        matches!(self, Self::StoreIo(_))
    }
}

// ============================================================================
// From implementations for automatic conversion
// ============================================================================

impl From<std::io::Error> for RookeryError {
    fn from(err: std::io::Error) -> Self {
        Self::StoreIo(format!("{} (kind: {:?})", err, err.kind()))
    }
}

impl From<serde_json::Error> for RookeryError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization {
            format: "JSON".to_string(),
            message: err.to_string(),
        }
    }
}

impl From<toml::de::Error> for RookeryError {
    fn from(err: toml::de::Error) -> Self {
        Self::Serialization {
            format: "TOML".to_string(),
            message: err.to_string(),
        }
    }
}

impl From<toml::ser::Error> for RookeryError {
    fn from(err: toml::ser::Error) -> Self {
        Self::Serialization {
            format: "TOML".to_string(),
            message: err.to_string(),
        }
    }
}

/// Conversion from anyhow::Error (binary boundary only)
impl From<anyhow::Error> for RookeryError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

/// A type alias for `Result<T, RookeryError>`.
pub type Result<T> = std::result::Result<T, RookeryError>;
