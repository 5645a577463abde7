//! OpenAI-compatible text generation provider.
//!
//! Single-turn chat completion over a configurable base URL so tests can
//! point it at a local mock server. No retry at this layer — the story
//! pipeline calls the text generator exactly once per cache miss.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;

use super::TextGenerator;
use crate::core::error::{GenerationError, Result};

/// Text generation provider for any OpenAI-compatible chat endpoint.
pub struct OpenAiTextProvider {
    api_key: Option<String>,
    base_url: String,
    model: String,
    client: Client,
}

impl OpenAiTextProvider {
    pub fn new(
        api_key: Option<String>,
        base_url: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(300))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            api_key,
            base_url: base_url.into(),
            model: model.into(),
            client,
        }
    }
}

#[async_trait]
impl TextGenerator for OpenAiTextProvider {
    async fn generate(&self, prompt: &str) -> Result<String> {
        let url = format!("{}/chat/completions", self.base_url.trim_end_matches('/'));

        let body = serde_json::json!({
            "model": self.model,
            "messages": [
                { "role": "user", "content": prompt }
            ],
        });

        let mut request = self
            .client
            .post(&url)
            .header("content-type", "application/json")
            .json(&body);

        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let resp = request.send().await?;
        let status = resp.status();

        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(GenerationError::Upstream(format!(
                "text generation returned status {status}: {text}"
            )));
        }

        let json: serde_json::Value = resp.json().await?;

        json["choices"]
            .as_array()
            .and_then(|arr| arr.first())
            .and_then(|c| c["message"]["content"].as_str())
            .map(|content| content.to_string())
            .ok_or_else(|| GenerationError::InvalidResponse("Missing content".to_string()))
    }
}
