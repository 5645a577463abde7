//! External collaborator traits and implementations.
//!
//! The pipelines depend on three black-box services, held behind traits so
//! tests can substitute doubles:
//!
//! - [`TextGenerator`] — LLM completion; returns free-form text that is not
//!   guaranteed to be well-formed JSON
//! - [`ImageGenerator`] — prompt-to-image; retried internally with a fixed
//!   delay and a terminal error after exhaustion
//! - [`ImageSearcher`] — query-to-image-URL; "no result" and "not
//!   configured" are both normal `None` outcomes, never errors

pub mod flux;
pub mod image_search;
pub mod openai;
pub mod retry;

pub use flux::FluxImageProvider;
pub use image_search::GoogleImageSearcher;
pub use openai::OpenAiTextProvider;

use async_trait::async_trait;

use crate::core::error::Result;

/// LLM completion service.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Generate free-form text for a prompt. The output may be anything,
    /// including malformed JSON; callers own parsing and validation.
    async fn generate(&self, prompt: &str) -> Result<String>;
}

/// Image generation service.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ImageGenerator: Send + Sync {
    /// Generate an image for a prompt and return its URL.
    async fn generate(&self, prompt: &str) -> Result<String>;
}

/// Image search service.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ImageSearcher: Send + Sync {
    /// Search for one image URL. Returns `None` when nothing is found or
    /// when the searcher is not configured; never fails for "not found".
    async fn search(&self, query: &str) -> Option<String>;
}
