//! GrokApiAgent - Direct REST API implementation for xAI chat completions.
//!
//! Generates the post text and image prompt in a single call. The reply
//! format is line-oriented (`Post:` / `Image prompt:` / optional overlay
//! lines) and parsed strictly; anything malformed surfaces as
//! `GenerationFailed` so the scheduler can back off and retry.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};

use rookery_core::config::{GenerationConfig, PersonaConfig, SecretConfig};
use rookery_core::content::generator::ContentGenerator;
use rookery_core::content::model::GeneratedPost;
use rookery_core::draft::model::PLATFORM_CHAR_LIMIT;
use rookery_core::error::{Result, RookeryError};

const DEFAULT_XAI_MODEL: &str = "grok-4";
const BASE_URL: &str = "https://api.x.ai/v1/chat/completions";

/// Agent implementation that talks to the xAI chat-completions API.
#[derive(Clone)]
pub struct GrokApiAgent {
    client: Client,
    api_key: String,
    model: String,
    lore: String,
    max_tokens: u32,
}

impl GrokApiAgent {
    /// Creates a new agent with the provided API key.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            model: DEFAULT_XAI_MODEL.to_string(),
            lore: PersonaConfig::default().lore,
            max_tokens: 300,
        }
    }

    /// Builds an agent from loaded secrets and configuration.
    ///
    /// # Errors
    ///
    /// `RookeryError::Config` when no xAI credentials are present.
    pub fn from_secrets(
        secrets: &SecretConfig,
        generation: &GenerationConfig,
        persona: &PersonaConfig,
    ) -> Result<Self> {
        let xai = secrets
            .xai
            .as_ref()
            .ok_or_else(|| RookeryError::config("xAI API key not configured (XAI_API_KEY)"))?;
        Ok(Self::new(xai.api_key.clone())
            .with_model(generation.model.clone())
            .with_max_tokens(generation.max_tokens)
            .with_lore(persona.lore.clone()))
    }

    /// Overrides the model after construction.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Sets the persona brief injected ahead of every prompt.
    pub fn with_lore(mut self, lore: impl Into<String>) -> Self {
        self.lore = lore.into();
        self
    }

    /// Sets the maximum number of tokens to generate.
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    fn build_prompt(&self, history: &[String]) -> String {
        let prev_posts = if history.is_empty() {
            "No previous posts.".to_string()
        } else {
            history.join("\n")
        };
        format!(
            "{}\nPrevious posts:\n{}\n\
             Generate a new post (under {PLATFORM_CHAR_LIMIT} characters) and an image \
             prompt for a matching image. Reply in exactly this format:\n\
             Post: [text]\n\
             Image prompt: [prompt]\n\
             Overlay top: [short caption to letter across the top of the image, or omit this line]\n\
             Overlay bottom: [short caption for the bottom of the image, or omit this line]",
            self.lore, prev_posts
        )
    }

    async fn send_request(&self, body: &ChatCompletionRequest) -> Result<String> {
        let response = self
            .client
            .post(BASE_URL)
            .bearer_auth(&self.api_key)
            .header("content-type", "application/json")
            .json(body)
            .send()
            .await
            .map_err(|err| RookeryError::generation(format!("xAI request failed: {err}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body_text = response
                .text()
                .await
                .unwrap_or_else(|_| "failed to read xAI error body".to_string());
            return Err(map_http_error(status, body_text));
        }

        let parsed: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|err| RookeryError::generation(format!("failed to parse xAI reply: {err}")))?;

        parsed
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or_else(|| RookeryError::generation("xAI reply missing 'choices'"))
    }
}

#[async_trait]
impl ContentGenerator for GrokApiAgent {
    async fn generate(&self, history: &[String]) -> Result<GeneratedPost> {
        let request = ChatCompletionRequest {
            model: self.model.clone(),
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: self.build_prompt(history),
            }],
            max_tokens: self.max_tokens,
        };

        let content = self.send_request(&request).await?;
        parse_reply(&content)
    }
}

#[derive(Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<ChatMessage>,
    max_tokens: u32,
}

#[derive(Serialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: String,
}

#[derive(Deserialize)]
struct ErrorResponse {
    error: String,
}

fn map_http_error(status: StatusCode, body: String) -> RookeryError {
    let message = serde_json::from_str::<ErrorResponse>(&body)
        .map(|wrapper| wrapper.error)
        .unwrap_or(body);
    RookeryError::generation(format!("xAI returned {status}: {message}"))
}

/// Parses the line-oriented model reply into a [`GeneratedPost`].
fn parse_reply(content: &str) -> Result<GeneratedPost> {
    let mut text = None;
    let mut image_prompt = None;
    let mut overlay_top = None;
    let mut overlay_bottom = None;

    for line in content.lines() {
        let line = line.trim();
        if let Some(rest) = line.strip_prefix("Post:") {
            text = non_empty(rest);
        } else if let Some(rest) = line.strip_prefix("Image prompt:") {
            image_prompt = non_empty(rest);
        } else if let Some(rest) = line.strip_prefix("Overlay top:") {
            overlay_top = non_empty(rest);
        } else if let Some(rest) = line.strip_prefix("Overlay bottom:") {
            overlay_bottom = non_empty(rest);
        }
    }

    let text = text.ok_or_else(|| RookeryError::generation("reply missing 'Post:' line"))?;
    let image_prompt =
        image_prompt.ok_or_else(|| RookeryError::generation("reply missing 'Image prompt:' line"))?;

    if text.chars().count() > PLATFORM_CHAR_LIMIT {
        return Err(RookeryError::generation(format!(
            "generated post exceeds {PLATFORM_CHAR_LIMIT} characters ({})",
            text.chars().count()
        )));
    }

    Ok(GeneratedPost {
        text,
        image_prompt,
        overlay_top,
        overlay_bottom,
    })
}

fn non_empty(s: &str) -> Option<String> {
    let trimmed = s.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_a_complete_reply() {
        let post = parse_reply(
            "Post: Penguins waddle but they never stumble.\n\
             Image prompt: a cheerful robot penguin on an ice floe\n\
             Overlay top: STAY COOL\n\
             Overlay bottom: waddle on",
        )
        .unwrap();
        assert_eq!(post.text, "Penguins waddle but they never stumble.");
        assert_eq!(post.image_prompt, "a cheerful robot penguin on an ice floe");
        assert_eq!(post.overlay_top.as_deref(), Some("STAY COOL"));
        assert_eq!(post.overlay_bottom.as_deref(), Some("waddle on"));
    }

    #[test]
    fn overlay_lines_are_optional() {
        let post = parse_reply(
            "Post: Short and sweet.\n\
             Image prompt: minimalist sunrise",
        )
        .unwrap();
        assert!(post.overlay_top.is_none());
        assert!(post.overlay_bottom.is_none());
    }

    #[test]
    fn missing_post_line_fails() {
        let err = parse_reply("Image prompt: something").unwrap_err();
        assert!(matches!(err, RookeryError::GenerationFailed(_)));
    }

    #[test]
    fn missing_image_prompt_fails() {
        let err = parse_reply("Post: hello").unwrap_err();
        assert!(matches!(err, RookeryError::GenerationFailed(_)));
    }

    #[test]
    fn over_limit_post_fails() {
        let long = "x".repeat(PLATFORM_CHAR_LIMIT + 1);
        let err = parse_reply(&format!("Post: {long}\nImage prompt: p")).unwrap_err();
        assert!(matches!(err, RookeryError::GenerationFailed(_)));
    }

    #[test]
    fn prompt_includes_history_and_lore() {
        let agent = GrokApiAgent::new("key").with_lore("You are a test persona.");
        let prompt = agent.build_prompt(&["older".to_string(), "newer".to_string()]);
        assert!(prompt.starts_with("You are a test persona."));
        assert!(prompt.contains("older\nnewer"));
    }

    #[test]
    fn prompt_handles_empty_history() {
        let agent = GrokApiAgent::new("key");
        let prompt = agent.build_prompt(&[]);
        assert!(prompt.contains("No previous posts."));
    }
}
