//! Content API
//!
//! HTTP surface over the generation pipelines.
//!
//! ## Endpoints
//! - `POST /api/story` - Generate (or fetch cached) story content
//! - `POST /api/story-image` - Generate a story illustration
//! - `GET /api/word-scramble/:difficulty/:set` - Generate a word-scramble set
//! - `GET /api/background` - Resolve the game background image
//! - `GET /api/test-env` - Report which secrets are configured
//! - `GET /api/test-image-search` - Run a live image-search probe
//! - `GET /health` - Health check

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::{Json, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use tokio::sync::oneshot;
use tower_http::cors::{Any, CorsLayer};

use crate::core::error::GenerationError;
use crate::core::images::ImageService;
use crate::core::providers::ImageSearcher;
use crate::core::story::StoryPipeline;
use crate::core::words::{Difficulty, WordSetPipeline};

// ============================================================================
// State
// ============================================================================

/// Everything the handlers need, shared behind an `Arc`.
pub struct ApiState {
    pub stories: Arc<StoryPipeline>,
    pub word_sets: Arc<WordSetPipeline>,
    pub images: Arc<ImageService>,
    pub searcher: Arc<dyn ImageSearcher>,
    pub env: EnvStatus,
}

/// Secret-presence snapshot for the diagnostic endpoints. Lengths only,
/// never the values themselves (except the non-secret toggle).
#[derive(Debug, Clone)]
pub struct EnvStatus {
    pub text_key_len: Option<usize>,
    pub flux_key_len: Option<usize>,
    pub google_key_len: Option<usize>,
    pub search_engine_id_present: bool,
    pub use_image_search: bool,
}

// ============================================================================
// Requests
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoryRequest {
    pub grade: String,
    pub subject: String,
    #[serde(default)]
    pub difficulty: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoryImageRequest {
    pub image_prompt: String,
}

// ============================================================================
// Error mapping
// ============================================================================

/// HTTP projection of a pipeline error.
struct ApiError(GenerationError);

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            GenerationError::Upstream(_)
            | GenerationError::Http(_)
            | GenerationError::Exhausted { .. }
            | GenerationError::InvalidResponse(_) => StatusCode::BAD_GATEWAY,
            GenerationError::Parse(_) | GenerationError::Validation(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        (status, self.0.to_string()).into_response()
    }
}

impl From<GenerationError> for ApiError {
    fn from(e: GenerationError) -> Self {
        Self(e)
    }
}

// ============================================================================
// Service
// ============================================================================

/// The content API server.
pub struct ApiServer {
    port: u16,
    state: Arc<ApiState>,
    shutdown_tx: Option<oneshot::Sender<()>>,
}

impl ApiServer {
    pub fn new(port: u16, state: Arc<ApiState>) -> Self {
        Self {
            port,
            state,
            shutdown_tx: None,
        }
    }

    /// Start serving in a background task.
    pub async fn start(&mut self) -> Result<(), String> {
        if self.shutdown_tx.is_some() {
            return Err("API server already running".to_string());
        }

        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let app = router(self.state.clone());
        let addr = SocketAddr::from(([0, 0, 0, 0], self.port));

        tokio::spawn(async move {
            let listener = match tokio::net::TcpListener::bind(addr).await {
                Ok(l) => l,
                Err(e) => {
                    log::error!("Failed to bind content API to {}: {}", addr, e);
                    return;
                }
            };

            log::info!("Content API started on http://{}", addr);

            axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    let _ = shutdown_rx.await;
                    log::info!("Content API shutting down");
                })
                .await
                .ok();
        });

        self.shutdown_tx = Some(shutdown_tx);
        Ok(())
    }

    pub fn stop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
            log::info!("Content API stopped");
        }
    }

    pub fn is_running(&self) -> bool {
        self.shutdown_tx.is_some()
    }
}

/// Build the router. Exposed so tests can drive handlers without a socket.
pub fn router(state: Arc<ApiState>) -> Router {
    Router::new()
        .route("/api/story", post(generate_story))
        .route("/api/story-image", post(generate_story_image))
        .route("/api/word-scramble/:difficulty/:set", get(word_scramble))
        .route("/api/background", get(background))
        .route("/api/test-env", get(test_env))
        .route("/api/test-image-search", get(test_image_search))
        .route("/health", get(health_check))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}

// ============================================================================
// HTTP Handlers
// ============================================================================

async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

async fn generate_story(
    State(state): State<Arc<ApiState>>,
    Json(request): Json<StoryRequest>,
) -> Result<Response, ApiError> {
    let content = state
        .stories
        .generate(
            &request.grade,
            &request.subject,
            request.difficulty.as_deref(),
        )
        .await?;
    Ok(Json(content).into_response())
}

async fn generate_story_image(
    State(state): State<Arc<ApiState>>,
    Json(request): Json<StoryImageRequest>,
) -> Result<Response, ApiError> {
    let url = state
        .images
        .generate_story_image(&request.image_prompt)
        .await?;
    Ok(Json(serde_json::json!({ "imageUrl": url })).into_response())
}

async fn word_scramble(
    State(state): State<Arc<ApiState>>,
    Path((difficulty, set_number)): Path<(String, u32)>,
) -> Result<Response, Response> {
    let difficulty: Difficulty = difficulty
        .parse()
        .map_err(|e: String| (StatusCode::BAD_REQUEST, e).into_response())?;

    let set = state
        .word_sets
        .generate(difficulty, set_number)
        .await
        .map_err(|e| ApiError(e).into_response())?;
    Ok(Json(set).into_response())
}

async fn background(State(state): State<Arc<ApiState>>) -> Result<Response, ApiError> {
    let url = state.images.generate_background().await?;
    Ok(Json(serde_json::json!({ "imageUrl": url })).into_response())
}

/// Report which credentials are present without exposing their values.
async fn test_env(State(state): State<Arc<ApiState>>) -> impl IntoResponse {
    let env = &state.env;
    let check = serde_json::json!({
        "textApiKey": {
            "present": env.text_key_len.is_some(),
            "length": env.text_key_len.unwrap_or(0),
        },
        "fluxApiKey": {
            "present": env.flux_key_len.is_some(),
            "length": env.flux_key_len.unwrap_or(0),
        },
        "googleApiKey": {
            "present": env.google_key_len.is_some(),
            "length": env.google_key_len.unwrap_or(0),
        },
        "searchEngineId": {
            "present": env.search_engine_id_present,
        },
        "useImageSearch": env.use_image_search,
    });

    log::info!("Environment check: {check}");
    Json(serde_json::json!({
        "message": "Environment check complete",
        "check": check,
    }))
}

/// Run a fixed live search to verify the image-search credentials.
async fn test_image_search(State(state): State<Arc<ApiState>>) -> Response {
    log::info!("Attempting to search for image...");

    match state.searcher.search("cartoon apple for children").await {
        Some(url) => {
            log::info!("Successfully retrieved image URL: {url}");
            Json(serde_json::json!({
                "success": true,
                "imageUrl": url,
                "message": "Image URL successfully retrieved",
            }))
            .into_response()
        }
        None => (
            StatusCode::NOT_FOUND,
            Json(serde_json::json!({
                "success": false,
                "message": "No image found",
                "debug": {
                    "googleApiKeyPresent": state.env.google_key_len.is_some(),
                    "searchEngineIdPresent": state.env.search_engine_id_present,
                    "useImageSearch": state.env.use_image_search,
                },
            })),
        )
            .into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::cache::ContentCache;
    use crate::core::providers::{
        MockImageGenerator, MockImageSearcher, MockTextGenerator,
    };
    use crate::core::words::WordTable;
    use tower::ServiceExt;

    fn state_with(
        text: MockTextGenerator,
        generator: MockImageGenerator,
        searcher: MockImageSearcher,
    ) -> Arc<ApiState> {
        let generator: Arc<dyn crate::core::providers::ImageGenerator> = Arc::new(generator);
        let searcher: Arc<dyn ImageSearcher> = Arc::new(searcher);

        Arc::new(ApiState {
            stories: Arc::new(StoryPipeline::new(
                Arc::new(ContentCache::new()),
                Arc::new(text),
            )),
            word_sets: Arc::new(WordSetPipeline::new(
                Arc::new(ContentCache::new()),
                Arc::new(WordTable::builtin()),
                generator.clone(),
                searcher.clone(),
                false,
            )),
            images: Arc::new(ImageService::new(generator, searcher.clone(), false)),
            searcher,
            env: EnvStatus {
                text_key_len: Some(8),
                flux_key_len: None,
                google_key_len: None,
                search_engine_id_present: false,
                use_image_search: false,
            },
        })
    }

    fn default_state() -> Arc<ApiState> {
        state_with(
            MockTextGenerator::new(),
            MockImageGenerator::new(),
            MockImageSearcher::new(),
        )
    }

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_health_check() {
        let app = router(default_state());
        let response = app
            .oneshot(
                axum::http::Request::builder()
                    .uri("/health")
                    .body(axum::body::Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["status"], "ok");
    }

    #[tokio::test]
    async fn test_word_scramble_rejects_unknown_difficulty() {
        let app = router(default_state());
        let response = app
            .oneshot(
                axum::http::Request::builder()
                    .uri("/api/word-scramble/medium/1")
                    .body(axum::body::Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_word_scramble_returns_full_set() {
        let mut generator = MockImageGenerator::new();
        generator
            .expect_generate()
            .returning(|_| Ok("https://img/w.png".to_string()));
        let app = router(state_with(
            MockTextGenerator::new(),
            generator,
            MockImageSearcher::new(),
        ));

        let response = app
            .oneshot(
                axum::http::Request::builder()
                    .uri("/api/word-scramble/easy/1")
                    .body(axum::body::Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["images"].as_array().unwrap().len(), 4);
        assert_eq!(json["scrambledWords"].as_array().unwrap().len(), 4);
        assert!(json["category"].as_str().unwrap().len() > 0);
    }

    #[tokio::test]
    async fn test_story_image_maps_upstream_failure_to_bad_gateway() {
        let mut generator = MockImageGenerator::new();
        generator
            .expect_generate()
            .returning(|_| Err(GenerationError::Upstream("down".to_string())));
        let app = router(state_with(
            MockTextGenerator::new(),
            generator,
            MockImageSearcher::new(),
        ));

        let response = app
            .oneshot(
                axum::http::Request::builder()
                    .method("POST")
                    .uri("/api/story-image")
                    .header("content-type", "application/json")
                    .body(axum::body::Body::from(
                        serde_json::json!({ "imagePrompt": "a scene" }).to_string(),
                    ))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    }

    #[tokio::test]
    async fn test_env_check_reports_presence_without_values() {
        let app = router(default_state());
        let response = app
            .oneshot(
                axum::http::Request::builder()
                    .uri("/api/test-env")
                    .body(axum::body::Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["check"]["textApiKey"]["present"], true);
        assert_eq!(json["check"]["textApiKey"]["length"], 8);
        assert_eq!(json["check"]["googleApiKey"]["present"], false);
    }

    #[tokio::test]
    async fn test_image_search_probe_reports_miss_with_debug() {
        let mut searcher = MockImageSearcher::new();
        searcher.expect_search().times(1).returning(|_| None);
        let app = router(state_with(
            MockTextGenerator::new(),
            MockImageGenerator::new(),
            searcher,
        ));

        let response = app
            .oneshot(
                axum::http::Request::builder()
                    .uri("/api/test-image-search")
                    .body(axum::body::Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let json = body_json(response).await;
        assert_eq!(json["success"], false);
        assert_eq!(json["debug"]["googleApiKeyPresent"], false);
    }
}
