//! XApiPublisher - publishes approved posts to the X platform.
//!
//! Two-step flow: upload the image through the v1.1 media endpoint, then
//! create the post through the v2 tweets endpoint, both with an OAuth2
//! user-context token.

use std::path::Path;

use async_trait::async_trait;
use reqwest::Client;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use serde_json::json;

use rookery_core::config::SecretConfig;
use rookery_core::content::model::PostId;
use rookery_core::content::publisher::Publisher;
use rookery_core::error::{Result, RookeryError};

const MEDIA_UPLOAD_URL: &str = "https://upload.twitter.com/1.1/media/upload.json";
const CREATE_POST_URL: &str = "https://api.x.com/2/tweets";

/// Publisher implementation for the X API.
#[derive(Clone)]
pub struct XApiPublisher {
    client: Client,
    access_token: String,
}

impl XApiPublisher {
    pub fn new(access_token: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            access_token: access_token.into(),
        }
    }

    /// Builds a publisher from loaded secrets.
    ///
    /// # Errors
    ///
    /// `RookeryError::Config` when no X credentials are present.
    pub fn from_secrets(secrets: &SecretConfig) -> Result<Self> {
        let x = secrets
            .x
            .as_ref()
            .ok_or_else(|| RookeryError::config("X access token not configured (X_ACCESS_TOKEN)"))?;
        Ok(Self::new(x.access_token.clone()))
    }

    async fn upload_media(&self, image_path: &Path) -> Result<String> {
        let bytes = tokio::fs::read(image_path)
            .await
            .map_err(|err| RookeryError::publish(format!("read {}: {err}", image_path.display())))?;

        let file_name = image_path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "preview.png".to_string());
        let form = Form::new().part(
            "media",
            Part::bytes(bytes)
                .file_name(file_name)
                .mime_str("image/png")
                .map_err(|err| RookeryError::publish(format!("media part: {err}")))?,
        );

        let response = self
            .client
            .post(MEDIA_UPLOAD_URL)
            .bearer_auth(&self.access_token)
            .multipart(form)
            .send()
            .await
            .map_err(|err| RookeryError::publish(format!("media upload failed: {err}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "failed to read upload error body".to_string());
            return Err(RookeryError::publish(format!(
                "media upload returned {status}: {body}"
            )));
        }

        let parsed: MediaUploadResponse = response
            .json()
            .await
            .map_err(|err| RookeryError::publish(format!("failed to parse upload reply: {err}")))?;

        Ok(parsed.media_id_string)
    }

    async fn create_post(&self, text: &str, media_id: &str) -> Result<PostId> {
        let response = self
            .client
            .post(CREATE_POST_URL)
            .bearer_auth(&self.access_token)
            .json(&json!({
                "text": text,
                "media": { "media_ids": [media_id] },
            }))
            .send()
            .await
            .map_err(|err| RookeryError::publish(format!("post creation failed: {err}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "failed to read post error body".to_string());
            return Err(RookeryError::publish(format!(
                "post creation returned {status}: {body}"
            )));
        }

        let parsed: CreatePostResponse = response
            .json()
            .await
            .map_err(|err| RookeryError::publish(format!("failed to parse post reply: {err}")))?;

        Ok(PostId(parsed.data.id))
    }
}

#[async_trait]
impl Publisher for XApiPublisher {
    async fn publish(&self, text: &str, image_path: &Path) -> Result<PostId> {
        let media_id = self.upload_media(image_path).await?;
        tracing::debug!(media_id, "media uploaded");
        self.create_post(text, &media_id).await
    }
}

#[derive(Deserialize)]
struct MediaUploadResponse {
    media_id_string: String,
}

#[derive(Deserialize)]
struct CreatePostResponse {
    data: CreatedPost,
}

#[derive(Deserialize)]
struct CreatedPost {
    id: String,
}
