//! Flux image generation provider.
//!
//! Calls a fal-style `fast-sdxl` endpoint and returns the first image URL
//! from the response. Each call is retried up to [`retry::MAX_RETRIES`]
//! times with the fixed [`retry::RETRY_DELAY`] between attempts; exhaustion
//! surfaces a single terminal error carrying the last failure.

use std::time::Duration;

use async_trait::async_trait;
use rand::Rng;
use reqwest::Client;

use super::retry;
use super::ImageGenerator;
use crate::core::error::{GenerationError, Result};

/// Image generation provider backed by a Flux/fal-style HTTP endpoint.
pub struct FluxImageProvider {
    api_key: Option<String>,
    base_url: String,
    client: Client,
}

impl FluxImageProvider {
    pub fn new(api_key: Option<String>, base_url: impl Into<String>) -> Self {
        if api_key.is_none() {
            log::error!("FLUX_API_KEY is not set; image generation requests will fail");
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(300))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            api_key,
            base_url: base_url.into(),
            client,
        }
    }

    async fn attempt(&self, prompt: &str) -> Result<String> {
        let body = serde_json::json!({
            "prompt": prompt,
            "image_size": "square_hd",
            "steps": 50,
            "seed": rand::thread_rng().gen_range(0..1_000_000u32),
        });

        let mut request = self
            .client
            .post(&self.base_url)
            .header("content-type", "application/json")
            .json(&body);

        if let Some(key) = &self.api_key {
            request = request.header("authorization", format!("Key {key}"));
        }

        let resp = request.send().await?;
        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(GenerationError::Upstream(format!(
                "image generation returned status {status}: {text}"
            )));
        }

        let json: serde_json::Value = resp.json().await?;
        json["images"]
            .as_array()
            .and_then(|arr| arr.first())
            .and_then(|img| img["url"].as_str())
            .map(|url| url.to_string())
            .ok_or_else(|| {
                GenerationError::InvalidResponse(
                    "Unexpected response format from Flux API".to_string(),
                )
            })
    }
}

#[async_trait]
impl ImageGenerator for FluxImageProvider {
    async fn generate(&self, prompt: &str) -> Result<String> {
        log::debug!("Generating image for prompt: {prompt}");

        retry::retry_fixed(retry::MAX_RETRIES, retry::RETRY_DELAY, |attempt| {
            log::debug!("Image generation attempt {attempt}");
            self.attempt(prompt)
        })
        .await
    }
}
