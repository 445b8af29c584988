//! Vision model client
//!
//! The pipeline only sees the [`TagExtractor`] trait. [`VisionClient`] is the
//! shipped implementation, speaking the OpenAI-compatible chat completions
//! protocol with the image inlined as a base64 data URL.

use async_trait::async_trait;
use base64::{engine::general_purpose, Engine};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

use crate::models::{DetailLevel, ImageItem};
use tagscan_common::config::VisionConfig;

const USER_AGENT: &str = concat!("tagscan/", env!("CARGO_PKG_VERSION"));

/// Instruction sent with every image
pub const TAG_INSTRUCTION: &str = "This photo shows an asset tag label. \
Reply with ONLY the numeric asset tag printed on it: a sequence of digits of any length, \
keeping any leading zeros. Do not add words, punctuation or quotes. \
If no asset tag is visible, reply with an empty string.";

/// Vision client errors
#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("API error {0}: {1}")]
    Api(u16, String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Extraction timed out after {0:?}")]
    Timeout(Duration),
}

impl ExtractionError {
    /// Stable code recorded on the per-image outcome
    pub fn code(&self) -> &'static str {
        match self {
            ExtractionError::Network(_) => "NETWORK_ERROR",
            ExtractionError::Api(429, _) => "QUOTA_EXCEEDED",
            ExtractionError::Api(..) => "API_ERROR",
            ExtractionError::Parse(_) => "MALFORMED_RESPONSE",
            ExtractionError::Timeout(_) => "TIMEOUT",
        }
    }
}

/// Opaque extraction capability: one image in, raw model text out
#[async_trait]
pub trait TagExtractor: Send + Sync {
    async fn extract(
        &self,
        image: &ImageItem,
        instruction: &str,
        detail: DetailLevel,
    ) -> Result<String, ExtractionError>;
}

// ============================================================================
// Chat completions wire types
// ============================================================================

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: Vec<ContentPart<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentPart<'a> {
    Text { text: &'a str },
    ImageUrl { image_url: ImageUrl },
}

#[derive(Debug, Serialize)]
struct ImageUrl {
    url: String,
    detail: &'static str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

// ============================================================================
// Client
// ============================================================================

/// OpenAI-compatible vision client
pub struct VisionClient {
    http_client: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
    model: String,
    max_tokens: u32,
}

impl VisionClient {
    pub fn new(config: &VisionConfig) -> Result<Self, ExtractionError> {
        // Per-image deadline is enforced by the worker; this only bounds a stuck socket
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| ExtractionError::Network(e.to_string()))?;

        Ok(Self {
            http_client,
            endpoint: format!("{}/chat/completions", config.api_base.trim_end_matches('/')),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            max_tokens: config.max_tokens,
        })
    }

    fn data_url(image: &ImageItem) -> String {
        format!(
            "data:{};base64,{}",
            image.mime_type,
            general_purpose::STANDARD.encode(&image.bytes)
        )
    }
}

#[async_trait]
impl TagExtractor for VisionClient {
    async fn extract(
        &self,
        image: &ImageItem,
        instruction: &str,
        detail: DetailLevel,
    ) -> Result<String, ExtractionError> {
        let request = ChatRequest {
            model: &self.model,
            max_tokens: self.max_tokens,
            messages: vec![ChatMessage {
                role: "user",
                content: vec![
                    ContentPart::Text { text: instruction },
                    ContentPart::ImageUrl {
                        image_url: ImageUrl {
                            url: Self::data_url(image),
                            detail: detail.as_str(),
                        },
                    },
                ],
            }],
        };

        tracing::debug!(
            model = %self.model,
            bytes = image.bytes.len(),
            detail = detail.as_str(),
            "Querying vision model"
        );

        let mut builder = self.http_client.post(&self.endpoint).json(&request);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| ExtractionError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(ExtractionError::Api(status.as_u16(), error_text));
        }

        let chat: ChatResponse = response
            .json()
            .await
            .map_err(|e| ExtractionError::Parse(e.to_string()))?;

        let choice = chat
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| ExtractionError::Parse("response has no choices".to_string()))?;

        Ok(choice.message.content.unwrap_or_default())
    }
}
