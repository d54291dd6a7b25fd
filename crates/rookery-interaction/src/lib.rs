pub mod flux_api_agent;
pub mod grok_api_agent;
pub mod telegram;
pub mod x_publisher;

pub use flux_api_agent::FluxApiAgent;
pub use grok_api_agent::GrokApiAgent;
pub use telegram::{TelegramApi, TelegramReviewChannel};
pub use x_publisher::XApiPublisher;
