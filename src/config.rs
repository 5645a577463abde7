use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Top-level application configuration.
///
/// Non-secret settings come from `~/.config/storypeak/config.toml` with
/// defaults for anything missing. Secrets are environment-only and applied
/// on top by [`AppConfig::load`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub text: TextConfig,
    pub images: ImagesConfig,
    #[serde(skip)]
    pub secrets: Secrets,
}

/// HTTP server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Port for the content API.
    pub port: u16,
}

/// Text generation service configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TextConfig {
    /// Base URL of the chat-completions endpoint.
    pub base_url: String,
    /// Model name sent with each request.
    pub model: String,
}

/// Image generation and search configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ImagesConfig {
    /// Base URL of the image generation service.
    pub flux_base_url: String,
    /// Base URL of the image search service.
    pub search_base_url: String,
    /// Try Image Search before falling back to the Image Generator,
    /// for word images and background images alike.
    pub use_image_search: bool,
}

/// Secrets, sourced from the environment only and never serialized.
#[derive(Debug, Clone, Default)]
pub struct Secrets {
    pub text_api_key: Option<String>,
    pub flux_api_key: Option<String>,
    pub google_api_key: Option<String>,
    pub google_search_engine_id: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            text: TextConfig::default(),
            images: ImagesConfig::default(),
            secrets: Secrets::default(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { port: 8490 }
    }
}

impl Default for TextConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".to_string(),
            model: "gpt-4".to_string(),
        }
    }
}

impl Default for ImagesConfig {
    fn default() -> Self {
        Self {
            flux_base_url: "https://fal.run/fal-ai/fast-sdxl".to_string(),
            search_base_url: "https://www.googleapis.com/customsearch/v1".to_string(),
            use_image_search: false,
        }
    }
}

impl AppConfig {
    /// Load configuration from `~/.config/storypeak/config.toml` and apply
    /// environment overrides. Returns defaults if the file is missing or
    /// unparseable.
    pub fn load() -> Self {
        let config_path = Self::config_path();
        let mut config = match std::fs::read_to_string(&config_path) {
            Ok(contents) => match toml::from_str(&contents) {
                Ok(config) => {
                    log::info!("Loaded config from {}", config_path.display());
                    config
                }
                Err(e) => {
                    log::warn!(
                        "Failed to parse config at {}: {e} — using defaults",
                        config_path.display()
                    );
                    Self::default()
                }
            },
            Err(_) => {
                log::debug!(
                    "No config file at {} — using defaults",
                    config_path.display()
                );
                Self::default()
            }
        };
        config.apply_env();
        config
    }

    /// Apply environment variables on top of the file/default values.
    pub fn apply_env(&mut self) {
        self.secrets = Secrets {
            text_api_key: non_empty_env("TEXT_API_KEY"),
            flux_api_key: non_empty_env("FLUX_API_KEY"),
            google_api_key: non_empty_env("GOOGLE_API_KEY"),
            google_search_engine_id: non_empty_env("GOOGLE_SEARCH_ENGINE_ID"),
        };

        if let Some(value) = non_empty_env("USE_GOOGLE_IMAGES") {
            self.images.use_image_search = value == "true";
        }
        if let Some(port) = non_empty_env("STORYPEAK_PORT").and_then(|p| p.parse().ok()) {
            self.server.port = port;
        }
    }

    /// Whether image search has the credentials it needs.
    pub fn search_configured(&self) -> bool {
        self.secrets.google_api_key.is_some() && self.secrets.google_search_engine_id.is_some()
    }

    fn config_path() -> PathBuf {
        dirs::config_dir()
            .map(|d| d.join("storypeak").join("config.toml"))
            .unwrap_or_else(|| PathBuf::from("config.toml"))
    }
}

fn non_empty_env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.server.port, 8490);
        assert_eq!(config.text.model, "gpt-4");
        assert!(!config.images.use_image_search);
        assert!(config.secrets.text_api_key.is_none());
    }

    #[test]
    fn test_search_configured_requires_both_credentials() {
        let mut config = AppConfig::default();
        assert!(!config.search_configured());

        config.secrets.google_api_key = Some("key".to_string());
        assert!(!config.search_configured());

        config.secrets.google_search_engine_id = Some("engine".to_string());
        assert!(config.search_configured());
    }

    #[test]
    fn test_partial_toml_falls_back_to_defaults() {
        let config: AppConfig = toml::from_str("[server]\nport = 9000\n").unwrap();
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.text.model, "gpt-4");
    }
}
