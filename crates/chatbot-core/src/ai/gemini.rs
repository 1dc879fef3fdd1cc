//! Gemini `generateContent` client
//!
//! One request per call: an ordered list of parts (text first, then the
//! image as inline base64 data) sent under a fixed generation config.

use reqwest::Client;
use serde::{Deserialize, Serialize};
use anyhow::{Result, anyhow};
use async_trait::async_trait;

use super::Responder;
use crate::image::Image;

pub const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// Returned instead of calling the API when there is nothing to send
pub const EMPTY_INPUT_REPLY: &str = "Please provide a text or an image to start the conversation.";

#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    pub temperature: f32,
    pub top_p: f32,
    pub top_k: u32,
    pub max_output_tokens: u32,
    pub response_mime_type: String,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            temperature: 0.7,
            top_p: 0.95,
            top_k: 40,
            max_output_tokens: 8192,
            response_mime_type: "text/plain".to_string(),
        }
    }
}

#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(untagged)]
pub enum Part {
    Text { text: String },
    InlineData { inline_data: InlineData },
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct InlineData {
    pub mime_type: String,
    pub data: String,
}

#[derive(Serialize)]
struct GeminiContent {
    role: &'static str,
    parts: Vec<Part>,
}

#[derive(Serialize)]
struct GeminiRequest<'a> {
    contents: Vec<GeminiContent>,
    #[serde(rename = "generationConfig")]
    generation_config: &'a GenerationConfig,
}

#[derive(Deserialize)]
struct GeminiResponse {
    candidates: Option<Vec<GeminiCandidate>>,
    #[serde(rename = "promptFeedback")]
    prompt_feedback: Option<GeminiPromptFeedback>,
}

#[derive(Deserialize)]
struct GeminiCandidate {
    content: Option<GeminiCandidateContent>,
    #[serde(rename = "finishReason")]
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct GeminiCandidateContent {
    #[serde(default)]
    parts: Vec<GeminiPartResponse>,
}

#[derive(Deserialize)]
struct GeminiPartResponse {
    text: Option<String>,
}

#[derive(Deserialize)]
struct GeminiPromptFeedback {
    #[serde(rename = "blockReason")]
    block_reason: Option<String>,
}

/// Build the ordered part list: text (if non-empty), then image (if valid).
pub fn build_parts(text: Option<&str>, image: Option<&Image>) -> Vec<Part> {
    let mut parts = Vec::new();

    if let Some(text) = text.filter(|t| !t.is_empty()) {
        parts.push(Part::Text { text: text.to_string() });
    }

    if let Some(image) = image {
        if image.is_valid() {
            parts.push(Part::InlineData {
                inline_data: InlineData {
                    mime_type: image.mime_type.clone(),
                    data: image.to_base64(),
                },
            });
        } else {
            tracing::warn!(name = %image.name, "skipping image without a PNG/JPEG signature");
        }
    }

    parts
}

#[derive(Clone)]
pub struct GeminiClient {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
    generation: GenerationConfig,
}

impl GeminiClient {
    pub fn new(api_key: &str, model: &str) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.to_string(),
            model: model.to_string(),
            base_url: GEMINI_BASE_URL.to_string(),
            generation: GenerationConfig::default(),
        }
    }

    pub fn with_generation(mut self, generation: GenerationConfig) -> Self {
        self.generation = generation;
        self
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    pub fn with_http_client(mut self, client: Client) -> Self {
        self.client = client;
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub async fn query(&self, parts: Vec<Part>) -> Result<String> {
        let url = format!("{}/v1beta/models/{}:generateContent", self.base_url, self.model);

        let request = GeminiRequest {
            contents: vec![GeminiContent { role: "user", parts }],
            generation_config: &self.generation,
        };

        tracing::debug!(model = %self.model, "sending generateContent request");

        let response = self.client
            .post(&url)
            .query(&[("key", self.api_key.as_str())])
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(anyhow!("Gemini API error {}: {}", status, text));
        }

        let gemini_response: GeminiResponse = response.json().await?;
        extract_text(gemini_response)
    }
}

fn extract_text(response: GeminiResponse) -> Result<String> {
    let candidate = response
        .candidates
        .and_then(|c| c.into_iter().next());

    let Some(candidate) = candidate else {
        let reason = response
            .prompt_feedback
            .and_then(|f| f.block_reason)
            .unwrap_or_else(|| "unknown".to_string());
        return Err(anyhow!("Gemini returned no candidates (block reason: {})", reason));
    };

    let text: String = candidate
        .content
        .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
        .unwrap_or_default();

    if text.is_empty() {
        return Err(anyhow!(
            "Gemini returned no text (finish reason: {})",
            candidate.finish_reason.as_deref().unwrap_or("unknown")
        ));
    }

    Ok(text)
}

#[async_trait]
impl Responder for GeminiClient {
    async fn generate(&self, text: Option<&str>, image: Option<&Image>) -> Result<String> {
        let parts = build_parts(text, image);
        if parts.is_empty() {
            return Ok(EMPTY_INPUT_REPLY.to_string());
        }
        self.query(parts).await
    }
}
