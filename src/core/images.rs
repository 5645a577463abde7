//! Standalone image operations.
//!
//! Story illustrations and the game background are generated on demand and
//! never cached; callers that want reuse keep the returned URL themselves.

use std::sync::Arc;

use crate::core::error::{GenerationError, Result};
use crate::core::providers::{ImageGenerator, ImageSearcher};

const BACKGROUND_SEARCH_QUERY: &str = "cartoon mountain climbing scene for kids math game";

const BACKGROUND_PROMPT: &str = "A cartoon-style mountain climbing scene with a ladder going up \
the mountain, colorful geometric shapes scattered around, perfect for a kids' math game about \
perimeters. Bright, cheerful colors, safe for children, no people. Simple, clean design with \
pastel colors.";

/// Image operations that sit outside the cached pipelines.
pub struct ImageService {
    generator: Arc<dyn ImageGenerator>,
    searcher: Arc<dyn ImageSearcher>,
    use_search: bool,
}

impl ImageService {
    pub fn new(
        generator: Arc<dyn ImageGenerator>,
        searcher: Arc<dyn ImageSearcher>,
        use_search: bool,
    ) -> Self {
        Self {
            generator,
            searcher,
            use_search,
        }
    }

    /// Generate an illustration for a story from its image prompt.
    pub async fn generate_story_image(&self, image_prompt: &str) -> Result<String> {
        match self.generator.generate(image_prompt).await {
            Ok(url) => Ok(url),
            Err(e) => {
                log::error!("Error generating image: {e}");
                Err(GenerationError::Upstream(
                    "Failed to generate image for the story".to_string(),
                ))
            }
        }
    }

    /// Resolve the perimeter-game background: search first when enabled,
    /// then fall back to generation with a fixed scene prompt.
    pub async fn generate_background(&self) -> Result<String> {
        if self.use_search {
            if let Some(url) = self.searcher.search(BACKGROUND_SEARCH_QUERY).await {
                return Ok(url);
            }
        }

        match self.generator.generate(BACKGROUND_PROMPT).await {
            Ok(url) => Ok(url),
            Err(e) => {
                log::error!("Error generating perimeter game background: {e}");
                Err(GenerationError::Upstream(
                    "Failed to generate background image".to_string(),
                ))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::providers::{MockImageGenerator, MockImageSearcher};

    fn service(
        generator: MockImageGenerator,
        searcher: MockImageSearcher,
        use_search: bool,
    ) -> ImageService {
        ImageService::new(Arc::new(generator), Arc::new(searcher), use_search)
    }

    #[tokio::test]
    async fn test_story_image_passes_prompt_through() {
        let mut generator = MockImageGenerator::new();
        generator
            .expect_generate()
            .withf(|prompt| prompt == "a fox counting apples")
            .times(1)
            .returning(|_| Ok("https://img/story.png".to_string()));
        let searcher = MockImageSearcher::new();

        let svc = service(generator, searcher, false);
        let url = svc.generate_story_image("a fox counting apples").await.unwrap();
        assert_eq!(url, "https://img/story.png");
    }

    #[tokio::test]
    async fn test_story_image_failure_is_wrapped() {
        let mut generator = MockImageGenerator::new();
        generator
            .expect_generate()
            .returning(|_| Err(GenerationError::Upstream("boom".to_string())));
        let searcher = MockImageSearcher::new();

        let svc = service(generator, searcher, false);
        let err = svc.generate_story_image("anything").await.unwrap_err();
        assert!(err
            .to_string()
            .contains("Failed to generate image for the story"));
    }

    #[tokio::test]
    async fn test_background_search_hit_skips_generator() {
        let mut searcher = MockImageSearcher::new();
        searcher
            .expect_search()
            .withf(|q| q == BACKGROUND_SEARCH_QUERY)
            .times(1)
            .returning(|_| Some("https://img/bg.png".to_string()));
        let mut generator = MockImageGenerator::new();
        generator.expect_generate().times(0);

        let svc = service(generator, searcher, true);
        assert_eq!(svc.generate_background().await.unwrap(), "https://img/bg.png");
    }

    #[tokio::test]
    async fn test_background_search_miss_falls_back_to_generation() {
        let mut searcher = MockImageSearcher::new();
        searcher.expect_search().times(1).returning(|_| None);
        let mut generator = MockImageGenerator::new();
        generator
            .expect_generate()
            .withf(|prompt| prompt == BACKGROUND_PROMPT)
            .times(1)
            .returning(|_| Ok("https://img/gen-bg.png".to_string()));

        let svc = service(generator, searcher, true);
        assert_eq!(
            svc.generate_background().await.unwrap(),
            "https://img/gen-bg.png"
        );
    }

    #[tokio::test]
    async fn test_background_both_paths_failing_errors() {
        let mut searcher = MockImageSearcher::new();
        searcher.expect_search().returning(|_| None);
        let mut generator = MockImageGenerator::new();
        generator
            .expect_generate()
            .returning(|_| Err(GenerationError::Upstream("down".to_string())));

        let svc = service(generator, searcher, true);
        let err = svc.generate_background().await.unwrap_err();
        assert!(err.to_string().contains("Failed to generate background image"));
    }
}
