//! FluxApiAgent - image synthesis through the fal.ai FLUX endpoint.
//!
//! Runs the model synchronously, downloads the first returned image, and
//! materializes it under the previews directory. Overlay captions are folded
//! into the image prompt rather than composited locally.

use std::path::PathBuf;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use rookery_core::config::SecretConfig;
use rookery_core::content::image::ImageSynthesizer;
use rookery_core::content::model::GeneratedPost;
use rookery_core::error::{Result, RookeryError};

const RUN_URL: &str = "https://fal.run/fal-ai/flux-pro";

/// Agent implementation that renders preview images via fal.ai.
#[derive(Clone)]
pub struct FluxApiAgent {
    client: Client,
    api_key: String,
    previews_dir: PathBuf,
}

impl FluxApiAgent {
    /// Creates a new agent writing images into `previews_dir`.
    pub fn new(api_key: impl Into<String>, previews_dir: impl Into<PathBuf>) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            previews_dir: previews_dir.into(),
        }
    }

    /// Builds an agent from loaded secrets.
    ///
    /// # Errors
    ///
    /// `RookeryError::Config` when no fal.ai credentials are present.
    pub fn from_secrets(secrets: &SecretConfig, previews_dir: impl Into<PathBuf>) -> Result<Self> {
        let fal = secrets
            .fal
            .as_ref()
            .ok_or_else(|| RookeryError::config("fal.ai API key not configured (FAL_KEY)"))?;
        Ok(Self::new(fal.api_key.clone(), previews_dir))
    }

    async fn run_model(&self, prompt: &str) -> Result<String> {
        let response = self
            .client
            .post(RUN_URL)
            .header("Authorization", format!("Key {}", self.api_key))
            .json(&RunRequest {
                prompt: prompt.to_string(),
            })
            .send()
            .await
            .map_err(|err| RookeryError::image(format!("fal.ai request failed: {err}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "failed to read fal.ai error body".to_string());
            return Err(RookeryError::image(format!("fal.ai returned {status}: {body}")));
        }

        let parsed: RunResponse = response
            .json()
            .await
            .map_err(|err| RookeryError::image(format!("failed to parse fal.ai reply: {err}")))?;

        first_image_url(parsed)
    }

    async fn download(&self, url: &str) -> Result<PathBuf> {
        let bytes = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|err| RookeryError::image(format!("image fetch failed: {err}")))?
            .error_for_status()
            .map_err(|err| RookeryError::image(format!("image fetch failed: {err}")))?
            .bytes()
            .await
            .map_err(|err| RookeryError::image(format!("image download failed: {err}")))?;

        tokio::fs::create_dir_all(&self.previews_dir)
            .await
            .map_err(|err| {
                RookeryError::image(format!(
                    "mkdir {}: {err}",
                    self.previews_dir.display()
                ))
            })?;

        let path = self.previews_dir.join(format!("{}.png", Uuid::new_v4()));
        tokio::fs::write(&path, &bytes)
            .await
            .map_err(|err| RookeryError::image(format!("write {}: {err}", path.display())))?;

        Ok(path)
    }
}

#[async_trait]
impl ImageSynthesizer for FluxApiAgent {
    async fn render(&self, post: &GeneratedPost) -> Result<PathBuf> {
        let prompt = build_image_prompt(post);
        let url = self.run_model(&prompt).await?;
        self.download(&url).await
    }
}

#[derive(Serialize)]
struct RunRequest {
    prompt: String,
}

#[derive(Deserialize)]
struct RunResponse {
    images: Vec<GeneratedImage>,
}

#[derive(Deserialize)]
struct GeneratedImage {
    url: String,
}

fn first_image_url(response: RunResponse) -> Result<String> {
    response
        .images
        .into_iter()
        .next()
        .map(|image| image.url)
        .ok_or_else(|| RookeryError::image("fal.ai reply contained no images"))
}

/// Folds the optional overlay captions into the prompt so the rendered
/// image already carries them.
fn build_image_prompt(post: &GeneratedPost) -> String {
    let mut prompt = post.image_prompt.clone();
    if let Some(top) = &post.overlay_top {
        prompt.push_str(&format!(", with the caption \"{top}\" lettered across the top"));
    }
    if let Some(bottom) = &post.overlay_bottom {
        prompt.push_str(&format!(
            ", with the caption \"{bottom}\" lettered across the bottom"
        ));
    }
    prompt
}
