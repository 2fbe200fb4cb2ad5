//! Gemini `generateContent` client.

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use insyflow_core::source::AssistantModel;

use crate::http::read_json;

pub const GEMINI_API: &str = "https://generativelanguage.googleapis.com/v1beta";

#[derive(Clone)]
pub struct GeminiClient {
    http: Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl GeminiClient {
    pub fn new(http: Client, api_key: &str, model: &str) -> Self {
        Self {
            http,
            base_url: GEMINI_API.to_string(),
            api_key: api_key.to_string(),
            model: model.trim_start_matches("models/").to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl AssistantModel for GeminiClient {
    async fn generate(&self, prompt: &str) -> Result<String> {
        let body = WireRequest {
            contents: vec![WireContent {
                role: Some("user".to_string()),
                parts: vec![WirePart {
                    text: Some(prompt.to_string()),
                }],
            }],
        };
        let resp = self
            .http
            .post(format!(
                "{}/models/{}:generateContent",
                self.base_url, self.model
            ))
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .context("Gemini request failed")?;
        let wire: WireResponse = read_json(resp, "Gemini").await?;
        extract_text(wire)
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
struct WirePart {
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<String>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
struct WireContent {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    parts: Vec<WirePart>,
}

#[derive(Debug, Serialize)]
struct WireRequest {
    contents: Vec<WireContent>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct WireCandidate {
    content: WireContent,
    finish_reason: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct WirePromptFeedback {
    block_reason: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct WireResponse {
    candidates: Vec<WireCandidate>,
    prompt_feedback: Option<WirePromptFeedback>,
}

/// Concatenated text parts of the first candidate.
fn extract_text(wire: WireResponse) -> Result<String> {
    if let Some(reason) = wire.prompt_feedback.and_then(|f| f.block_reason) {
        return Err(anyhow!("Gemini blocked the prompt: {reason}"));
    }
    let candidate = wire
        .candidates
        .into_iter()
        .next()
        .ok_or_else(|| anyhow!("Gemini returned no candidates"))?;
    let text: String = candidate
        .content
        .parts
        .into_iter()
        .filter_map(|p| p.text)
        .collect();
    if text.trim().is_empty() {
        return Err(anyhow!(
            "Gemini returned no text (finish reason: {})",
            candidate.finish_reason.as_deref().unwrap_or("unknown")
        ));
    }
    Ok(text)
}
