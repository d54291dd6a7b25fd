//! Telegram adapter for the review workflow.
//!
//! Renders drafts as photo messages with Approve / Edit / Deny buttons and
//! feeds reviewer actions into the review desk. All workflow decisions live
//! in the desk; this adapter only translates the Bot API in both directions.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use rookery_core::channel::ReviewChannel;
use rookery_core::draft::desk::{ReviewDesk, ReviewReply};
use rookery_core::draft::model::Draft;
use rookery_core::error::Result;

use super::api::{
    CallbackQuery, InlineKeyboardButton, InlineKeyboardMarkup, Message, TelegramApi, Update,
};

const POLL_TIMEOUT_SECS: u64 = 25;
const POLL_RETRY_DELAY_SECS: u64 = 2;

/// Button actions carried in callback data as `<action>:<draft_id>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ReviewAction {
    Approve,
    Edit,
    Deny,
}

impl ReviewAction {
    fn tag(self) -> &'static str {
        match self {
            ReviewAction::Approve => "approve",
            ReviewAction::Edit => "edit",
            ReviewAction::Deny => "deny",
        }
    }
}

fn parse_callback(data: &str) -> Option<(ReviewAction, &str)> {
    let (action, draft_id) = data.split_once(':')?;
    let action = match action {
        "approve" => ReviewAction::Approve,
        "edit" => ReviewAction::Edit,
        "deny" => ReviewAction::Deny,
        _ => return None,
    };
    (!draft_id.is_empty()).then_some((action, draft_id))
}

/// The reviewer-facing channel over one authorized Telegram chat.
pub struct TelegramReviewChannel {
    api: TelegramApi,
    chat_id: i64,
    desk: Arc<ReviewDesk>,
}

impl TelegramReviewChannel {
    pub fn new(api: TelegramApi, chat_id: i64, desk: Arc<ReviewDesk>) -> Self {
        Self { api, chat_id, desk }
    }

    /// Spawns the long-poll loop that feeds reviewer actions to the desk.
    /// The task drains updates until `cancel` fires; transient API errors
    /// are logged and retried after a short delay.
    pub fn spawn_update_loop(self: &Arc<Self>, cancel: CancellationToken) -> JoinHandle<()> {
        let channel = Arc::clone(self);
        tokio::spawn(async move {
            tracing::info!("telegram update loop started");
            let mut offset = 0i64;
            loop {
                let updates = tokio::select! {
                    _ = cancel.cancelled() => break,
                    result = channel.api.get_updates(offset, POLL_TIMEOUT_SECS) => result,
                };

                let updates = match updates {
                    Ok(updates) => updates,
                    Err(err) => {
                        tracing::warn!(error = %err, "getUpdates failed, retrying");
                        tokio::select! {
                            _ = cancel.cancelled() => break,
                            _ = tokio::time::sleep(std::time::Duration::from_secs(
                                POLL_RETRY_DELAY_SECS,
                            )) => {}
                        }
                        continue;
                    }
                };

                for update in updates {
                    offset = offset.max(update.update_id);
                    channel.handle_update(update).await;
                }
            }
            tracing::info!("telegram update loop stopped");
        })
    }

    async fn handle_update(&self, update: Update) {
        if let Some(callback) = update.callback_query {
            self.handle_callback(callback).await;
        } else if let Some(message) = update.message {
            self.handle_message(message).await;
        }
    }

    async fn handle_callback(&self, callback: CallbackQuery) {
        // Best effort; a failed ack only leaves the client spinner running.
        if let Err(err) = self.api.answer_callback_query(&callback.id).await {
            tracing::debug!(error = %err, "answerCallbackQuery failed");
        }

        let Some(message) = callback.message else {
            return;
        };
        if message.chat.id != self.chat_id {
            tracing::warn!(chat_id = message.chat.id, "callback from unauthorized chat");
            return;
        }
        let Some((action, draft_id)) = callback.data.as_deref().and_then(parse_callback) else {
            tracing::debug!(data = ?callback.data, "unrecognized callback data");
            return;
        };

        let reply = match action {
            ReviewAction::Approve => self.desk.approve(draft_id).await,
            ReviewAction::Edit => self.desk.begin_edit(self.chat_id, draft_id).await,
            ReviewAction::Deny => self.desk.deny(draft_id).await,
        };

        let caption = match reply {
            Ok(reply) => render_terminal_caption(&reply),
            Err(err) => {
                tracing::error!(draft_id, error = %err, "review action failed");
                Some("⚠️ Something went wrong; this draft may be lost.".to_string())
            }
        };

        if let Some(caption) = caption {
            if let Err(err) = self
                .api
                .edit_message_caption(self.chat_id, message.message_id, &caption)
                .await
            {
                tracing::warn!(error = %err, "failed to update draft message");
            }
        }
    }

    async fn handle_message(&self, message: Message) {
        let Some(text) = message.text else {
            return;
        };
        if message.chat.id != self.chat_id {
            tracing::warn!(chat_id = message.chat.id, "message from unauthorized chat");
            let _ = self
                .api
                .send_message(message.chat.id, "❌ This chat is not authorized.")
                .await;
            return;
        }

        let reply_text = if let Some(command) = text.trim().strip_prefix('/') {
            self.handle_command(command)
        } else {
            match self.desk.apply_free_text(self.chat_id, &text).await {
                Ok(reply) => render_free_text_reply(&reply),
                Err(err) => {
                    tracing::error!(error = %err, "applying edit failed");
                    Some("⚠️ Something went wrong; the edit was not applied.".to_string())
                }
            }
        };

        if let Some(reply_text) = reply_text {
            if let Err(err) = self.api.send_message(self.chat_id, &reply_text).await {
                tracing::warn!(error = %err, "failed to reply to reviewer");
            }
        }
    }

    fn handle_command(&self, command: &str) -> Option<String> {
        // Commands may arrive as /cmd@botname in group chats.
        let name = command
            .split_whitespace()
            .next()
            .unwrap_or_default()
            .split('@')
            .next()
            .unwrap_or_default();
        match name {
            "generate" => match self.desk.manual_trigger() {
                ReviewReply::TriggerQueued => {
                    Some("🪄 On it! Generating a draft now.".to_string())
                }
                ReviewReply::TriggerBusy => {
                    Some("⏳ A cycle is already in progress, please wait.".to_string())
                }
                _ => None,
            },
            "start" | "help" => Some(help_text()),
            _ => Some(help_text()),
        }
    }
}

#[async_trait]
impl ReviewChannel for TelegramReviewChannel {
    async fn present(&self, draft: &Draft) -> Result<()> {
        let caption = format!(
            "🐧 New post for approval:\n\n{}\n\nApprove to post as-is, Edit to change the text, or Deny to skip.",
            draft.text
        );
        let keyboard = InlineKeyboardMarkup {
            inline_keyboard: vec![vec![
                button("✅ Approve", ReviewAction::Approve, &draft.id),
                button("✏️ Edit", ReviewAction::Edit, &draft.id),
                button("❌ Deny", ReviewAction::Deny, &draft.id),
            ]],
        };
        self.api
            .send_photo(self.chat_id, &draft.image_path, &caption, &keyboard)
            .await
    }

    async fn notify(&self, text: &str) -> Result<()> {
        self.api.send_message(self.chat_id, text).await
    }
}

fn button(label: &str, action: ReviewAction, draft_id: &str) -> InlineKeyboardButton {
    InlineKeyboardButton {
        text: label.to_string(),
        callback_data: format!("{}:{draft_id}", action.tag()),
    }
}

/// Terminal caption for the rendered draft message after a button press.
fn render_terminal_caption(reply: &ReviewReply) -> Option<String> {
    match reply {
        ReviewReply::Approved { text } => {
            Some(format!("✅ APPROVED\n\n{text}\n\nPublishing..."))
        }
        ReviewReply::Denied { text } => {
            Some(format!("❌ DENIED\n\n{text}\n\nGenerating a new post..."))
        }
        ReviewReply::EditPrompt { current_text } => Some(format!(
            "✏️ EDITING\n\nCurrent text:\n{current_text}\n\nSend the new post text (under 280 characters):"
        )),
        ReviewReply::AlreadyProcessed => {
            Some("❌ Draft not found. It may have already been processed.".to_string())
        }
        _ => None,
    }
}

/// Reply to a free-text message, when one is warranted.
fn render_free_text_reply(reply: &ReviewReply) -> Option<String> {
    match reply {
        ReviewReply::EditApplied { text } => Some(format!(
            "✅ Post updated and approved!\n\nNew text: {text}\n\nPublishing..."
        )),
        ReviewReply::EditTooLong { limit } => Some(format!(
            "✋ That text is over the {limit}-character limit. Send a shorter version."
        )),
        // Not every message is a command; stale edits drop silently.
        ReviewReply::Ignored | ReviewReply::StaleEditDropped => None,
        _ => None,
    }
}

fn help_text() -> String {
    [
        "🐧 Rookery approval bot",
        "Drafts arrive here with Approve / Edit / Deny buttons.",
        "/generate - generate a draft now",
        "/help - show this message",
    ]
    .join("\n")
}
