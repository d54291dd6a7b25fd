//! Telegram review channel: a minimal Bot API client plus the adapter that
//! renders drafts and routes reviewer actions to the review desk.

pub mod api;
pub mod channel;

pub use api::TelegramApi;
pub use channel::TelegramReviewChannel;
