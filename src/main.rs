use std::sync::Arc;

use storypeak::api::{ApiServer, ApiState, EnvStatus};
use storypeak::config::AppConfig;
use storypeak::core::cache::ContentCache;
use storypeak::core::images::ImageService;
use storypeak::core::preload;
use storypeak::core::providers::{
    FluxImageProvider, GoogleImageSearcher, ImageGenerator, ImageSearcher, OpenAiTextProvider,
    TextGenerator,
};
use storypeak::core::story::StoryPipeline;
use storypeak::core::words::{WordSetPipeline, WordTable};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    let _log_guard = storypeak::core::logging::init();
    log::info!("StoryPeak v{} starting", storypeak::VERSION);

    let config = AppConfig::load();
    let use_search = config.images.use_image_search && config.search_configured();
    if config.images.use_image_search && !config.search_configured() {
        log::warn!("Image search enabled but credentials are missing; falling back to generation");
    }

    // Providers
    let text: Arc<dyn TextGenerator> = Arc::new(OpenAiTextProvider::new(
        config.secrets.text_api_key.clone(),
        config.text.base_url.clone(),
        config.text.model.clone(),
    ));
    let generator: Arc<dyn ImageGenerator> = Arc::new(FluxImageProvider::new(
        config.secrets.flux_api_key.clone(),
        config.images.flux_base_url.clone(),
    ));
    let searcher: Arc<dyn ImageSearcher> = Arc::new(GoogleImageSearcher::new(
        config.secrets.google_api_key.clone(),
        config.secrets.google_search_engine_id.clone(),
        config.images.search_base_url.clone(),
    ));

    // Pipelines
    let stories = Arc::new(StoryPipeline::new(Arc::new(ContentCache::new()), text));
    let word_sets = Arc::new(WordSetPipeline::new(
        Arc::new(ContentCache::new()),
        Arc::new(WordTable::builtin()),
        generator.clone(),
        searcher.clone(),
        use_search,
    ));
    let images = Arc::new(ImageService::new(generator, searcher.clone(), use_search));

    // Warm the word-set cache without blocking startup
    let preload_handle = preload::spawn_preload(word_sets.clone());
    tokio::spawn(async move {
        if let Err(e) = preload_handle.await {
            log::warn!("Preload supervisor failed: {e}");
        }
    });

    let state = Arc::new(ApiState {
        stories,
        word_sets,
        images,
        searcher,
        env: EnvStatus {
            text_key_len: config.secrets.text_api_key.as_ref().map(|k| k.len()),
            flux_key_len: config.secrets.flux_api_key.as_ref().map(|k| k.len()),
            google_key_len: config.secrets.google_api_key.as_ref().map(|k| k.len()),
            search_engine_id_present: config.secrets.google_search_engine_id.is_some(),
            use_image_search: use_search,
        },
    });

    let mut server = ApiServer::new(config.server.port, state);
    server.start().await?;

    tokio::signal::ctrl_c().await?;
    log::info!("Shutdown signal received");
    server.stop();

    Ok(())
}
