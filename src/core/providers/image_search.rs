//! Google Custom Search image provider.
//!
//! Looks up a single child-safe, medium-size image for a query. Missing
//! credentials disable search (the caller falls back to generation), and
//! search failures are logged and reported as "no result" rather than
//! propagated.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;

use super::ImageSearcher;

/// Image search provider backed by the Google Custom Search API.
pub struct GoogleImageSearcher {
    api_key: Option<String>,
    engine_id: Option<String>,
    base_url: String,
    client: Client,
}

impl GoogleImageSearcher {
    pub fn new(
        api_key: Option<String>,
        engine_id: Option<String>,
        base_url: impl Into<String>,
    ) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            api_key,
            engine_id,
            base_url: base_url.into(),
            client,
        }
    }

    /// Whether both credentials are present.
    pub fn is_configured(&self) -> bool {
        self.api_key.is_some() && self.engine_id.is_some()
    }
}

#[async_trait]
impl ImageSearcher for GoogleImageSearcher {
    async fn search(&self, query: &str) -> Option<String> {
        let (api_key, engine_id) = match (&self.api_key, &self.engine_id) {
            (Some(key), Some(id)) => (key, id),
            _ => {
                log::error!(
                    "Google API key or Search Engine ID is missing (key present: {}, engine present: {})",
                    self.api_key.is_some(),
                    self.engine_id.is_some()
                );
                return None;
            }
        };

        log::debug!("Initiating image search with query: {query}");

        let result = self
            .client
            .get(&self.base_url)
            .query(&[
                ("key", api_key.as_str()),
                ("cx", engine_id.as_str()),
                ("q", query),
                ("searchType", "image"),
                ("num", "1"),
                ("imgSize", "medium"),
                ("safe", "high"),
            ])
            .send()
            .await;

        let resp = match result {
            Ok(resp) => resp,
            Err(e) => {
                log::error!("Error searching images: {e}");
                return None;
            }
        };

        if !resp.status().is_success() {
            log::error!("Image search returned status {}", resp.status());
            return None;
        }

        let json: serde_json::Value = match resp.json().await {
            Ok(json) => json,
            Err(e) => {
                log::error!("Failed to decode image search response: {e}");
                return None;
            }
        };

        match json["items"]
            .as_array()
            .and_then(|items| items.first())
            .and_then(|item| item["link"].as_str())
        {
            Some(link) => {
                log::debug!("Image found: {link}");
                Some(link.to_string())
            }
            None => {
                log::debug!("No images found in search results");
                None
            }
        }
    }
}
