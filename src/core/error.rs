//! Error taxonomy for the content generation pipelines.
//!
//! Pipelines catch internal failures and surface a single descriptive error
//! carrying the original message. Missing image-search configuration is not
//! an error (search degrades to "no result"), and per-word image failures
//! inside a word set degrade to a null image instead of surfacing here.

/// Result type for pipeline and provider operations.
pub type Result<T> = std::result::Result<T, GenerationError>;

/// Errors produced by the generation pipelines and their collaborators.
#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    /// The text generator returned output that is not valid JSON.
    #[error("Failed to parse the generated content: {0}")]
    Parse(String),

    /// Well-formed JSON with a missing or malformed required field.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Image generation failed after exhausting all retry attempts.
    #[error("Failed to generate image after {attempts} attempts: {last}")]
    Exhausted { attempts: u32, last: String },

    /// Any other external-service failure, original message preserved.
    #[error("Upstream error: {0}")]
    Upstream(String),

    /// Transport-level HTTP failure.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Unexpected response shape from an external service.
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl GenerationError {
    /// Validation error for a missing or invalid field, named specifically.
    pub fn invalid_field(field: &str) -> Self {
        GenerationError::Validation(format!(
            "Invalid or missing {field} in the generated content"
        ))
    }
}
