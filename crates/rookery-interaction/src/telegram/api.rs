//! Minimal Telegram Bot API client.
//!
//! Covers exactly the calls the review flow needs: long-poll updates,
//! message/photo sending, caption edits, and callback acknowledgements.
//! Every failure maps to `ChannelUnavailable`; the workflow decides whether
//! that is retryable.

use std::path::Path;
use std::time::Duration;

use reqwest::Client;
use reqwest::multipart::{Form, Part};
use serde::{Deserialize, Serialize, de::DeserializeOwned};

use rookery_core::error::{Result, RookeryError};

const API_BASE: &str = "https://api.telegram.org";
/// Bot API caps captions well below message length; keep a shared margin.
const MAX_TEXT_LEN: usize = 3_800;

/// Thin client over the Bot API for one bot token.
#[derive(Clone)]
pub struct TelegramApi {
    client: Client,
    bot_token: String,
}

impl TelegramApi {
    pub fn new(bot_token: impl Into<String>) -> Self {
        Self {
            // Leave headroom above the long-poll window.
            client: Client::builder()
                .timeout(Duration::from_secs(40))
                .build()
                .unwrap_or_else(|_| Client::new()),
            bot_token: bot_token.into(),
        }
    }

    /// Long-polls for updates after `offset`, waiting up to `timeout_secs`.
    pub async fn get_updates(&self, offset: i64, timeout_secs: u64) -> Result<Vec<Update>> {
        let response = self
            .client
            .get(self.url("getUpdates"))
            .query(&[
                ("timeout", timeout_secs.to_string()),
                ("offset", (offset + 1).to_string()),
            ])
            .send()
            .await
            .map_err(|err| RookeryError::channel(format!("getUpdates failed: {err}")))?;

        Self::unwrap_envelope(response).await
    }

    /// Sends a plain text message.
    pub async fn send_message(&self, chat_id: i64, text: &str) -> Result<()> {
        let response = self
            .client
            .post(self.url("sendMessage"))
            .json(&serde_json::json!({
                "chat_id": chat_id,
                "text": truncate_text(text),
            }))
            .send()
            .await
            .map_err(|err| RookeryError::channel(format!("sendMessage failed: {err}")))?;

        Self::unwrap_envelope::<Message>(response).await?;
        Ok(())
    }

    /// Sends a photo from a local file with a caption and inline keyboard.
    pub async fn send_photo(
        &self,
        chat_id: i64,
        image_path: &Path,
        caption: &str,
        keyboard: &InlineKeyboardMarkup,
    ) -> Result<()> {
        let bytes = tokio::fs::read(image_path).await.map_err(|err| {
            RookeryError::channel(format!("read {}: {err}", image_path.display()))
        })?;
        let file_name = image_path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "preview.png".to_string());

        let markup = serde_json::to_string(keyboard)?;
        let form = Form::new()
            .text("chat_id", chat_id.to_string())
            .text("caption", truncate_text(caption))
            .text("reply_markup", markup)
            .part(
                "photo",
                Part::bytes(bytes)
                    .file_name(file_name)
                    .mime_str("image/png")
                    .map_err(|err| RookeryError::channel(format!("photo part: {err}")))?,
            );

        let response = self
            .client
            .post(self.url("sendPhoto"))
            .multipart(form)
            .send()
            .await
            .map_err(|err| RookeryError::channel(format!("sendPhoto failed: {err}")))?;

        Self::unwrap_envelope::<Message>(response).await?;
        Ok(())
    }

    /// Rewrites the caption of a previously sent photo message, dropping its
    /// inline keyboard.
    pub async fn edit_message_caption(
        &self,
        chat_id: i64,
        message_id: i64,
        caption: &str,
    ) -> Result<()> {
        let response = self
            .client
            .post(self.url("editMessageCaption"))
            .json(&serde_json::json!({
                "chat_id": chat_id,
                "message_id": message_id,
                "caption": truncate_text(caption),
            }))
            .send()
            .await
            .map_err(|err| RookeryError::channel(format!("editMessageCaption failed: {err}")))?;

        Self::unwrap_envelope::<Message>(response).await?;
        Ok(())
    }

    /// Acknowledges a callback query so the client stops its spinner.
    pub async fn answer_callback_query(&self, callback_query_id: &str) -> Result<()> {
        let response = self
            .client
            .post(self.url("answerCallbackQuery"))
            .json(&serde_json::json!({ "callback_query_id": callback_query_id }))
            .send()
            .await
            .map_err(|err| RookeryError::channel(format!("answerCallbackQuery failed: {err}")))?;

        Self::unwrap_envelope::<bool>(response).await?;
        Ok(())
    }

    fn url(&self, method: &str) -> String {
        format!("{API_BASE}/bot{}/{method}", self.bot_token)
    }

    async fn unwrap_envelope<T: DeserializeOwned>(response: reqwest::Response) -> Result<T> {
        let body = response
            .text()
            .await
            .map_err(|err| RookeryError::channel(format!("reading reply failed: {err}")))?;
        let envelope: ApiEnvelope<T> = serde_json::from_str(&body)
            .map_err(|err| RookeryError::channel(format!("parsing reply failed: {err}")))?;

        if !envelope.ok {
            return Err(RookeryError::channel(
                envelope
                    .description
                    .unwrap_or_else(|| "Telegram API reported failure".to_string()),
            ));
        }
        envelope
            .result
            .ok_or_else(|| RookeryError::channel("Telegram reply missing 'result'"))
    }
}

/// Standard Bot API response wrapper.
#[derive(Debug, Deserialize)]
struct ApiEnvelope<T> {
    ok: bool,
    result: Option<T>,
    description: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Update {
    pub update_id: i64,
    #[serde(default)]
    pub message: Option<Message>,
    #[serde(default)]
    pub callback_query: Option<CallbackQuery>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Message {
    pub message_id: i64,
    pub chat: Chat,
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Chat {
    pub id: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CallbackQuery {
    pub id: String,
    #[serde(default)]
    pub data: Option<String>,
    /// The rendered draft message the pressed button belongs to.
    #[serde(default)]
    pub message: Option<Message>,
}

#[derive(Debug, Clone, Serialize)]
pub struct InlineKeyboardMarkup {
    pub inline_keyboard: Vec<Vec<InlineKeyboardButton>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct InlineKeyboardButton {
    pub text: String,
    pub callback_data: String,
}

fn truncate_text(text: &str) -> String {
    if text.chars().count() <= MAX_TEXT_LEN {
        return text.to_string();
    }
    let truncated: String = text.chars().take(MAX_TEXT_LEN).collect();
    format!("{truncated}\n...[truncated]")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn update_with_callback_query_parses() {
        let update: Update = serde_json::from_str(
            r#"{
                "update_id": 42,
                "callback_query": {
                    "id": "cb-1",
                    "data": "approve:20250101_120000_0001",
                    "message": { "message_id": 7, "chat": { "id": 12345 } }
                }
            }"#,
        )
        .unwrap();
        let callback = update.callback_query.unwrap();
        assert_eq!(callback.data.as_deref(), Some("approve:20250101_120000_0001"));
        assert_eq!(callback.message.unwrap().chat.id, 12345);
    }

    #[test]
    fn update_with_plain_message_parses() {
        let update: Update = serde_json::from_str(
            r#"{
                "update_id": 43,
                "message": { "message_id": 8, "chat": { "id": 12345 }, "text": "new text" }
            }"#,
        )
        .unwrap();
        assert_eq!(update.message.unwrap().text.as_deref(), Some("new text"));
    }

    #[test]
    fn failure_envelope_surfaces_description() {
        let envelope: ApiEnvelope<Vec<Update>> = serde_json::from_str(
            r#"{ "ok": false, "description": "Unauthorized" }"#,
        )
        .unwrap();
        assert!(!envelope.ok);
        assert_eq!(envelope.description.as_deref(), Some("Unauthorized"));
    }

    #[test]
    fn long_text_is_truncated_with_a_marker() {
        let long_text = "a".repeat(5_000);
        let truncated = truncate_text(&long_text);
        assert!(truncated.chars().count() <= MAX_TEXT_LEN + 20);
        assert!(truncated.ends_with("...[truncated]"));
    }
}
