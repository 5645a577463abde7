//! Startup cache warming for word-scramble sets.
//!
//! Warms both difficulty tiers for set numbers 1 through 5 so first
//! requests land on a hot cache. Every warm-up task is supervised; a
//! failed or panicked task is logged and counted, never fatal, and the
//! server keeps serving while warming runs.

use std::sync::Arc;

use tokio::task::{JoinHandle, JoinSet};

use crate::core::words::{word_set_cache_key, Difficulty, WordSetPipeline};

pub const PRELOAD_SET_NUMBERS: std::ops::RangeInclusive<u32> = 1..=5;

/// Outcome of one preload run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PreloadReport {
    pub warmed: usize,
    pub failed: usize,
}

impl PreloadReport {
    pub fn total(&self) -> usize {
        self.warmed + self.failed
    }
}

/// Warm every `{difficulty}-{set}` combination concurrently.
pub async fn preload_word_sets(pipeline: Arc<WordSetPipeline>) -> PreloadReport {
    let mut tasks = JoinSet::new();

    for difficulty in Difficulty::ALL {
        for set_number in PRELOAD_SET_NUMBERS {
            let pipeline = pipeline.clone();
            tasks.spawn(async move {
                let outcome = pipeline.generate(difficulty, set_number).await.map(|_| ());
                (difficulty, set_number, outcome)
            });
        }
    }

    let mut report = PreloadReport {
        warmed: 0,
        failed: 0,
    };

    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok((_, _, Ok(()))) => report.warmed += 1,
            Ok((difficulty, set_number, Err(e))) => {
                log::warn!(
                    "Preload failed for {}: {e}",
                    word_set_cache_key(difficulty, set_number)
                );
                report.failed += 1;
            }
            Err(e) => {
                log::warn!("Preload task panicked: {e}");
                report.failed += 1;
            }
        }
    }

    log::info!(
        "Word-set preload finished: {} warmed, {} failed",
        report.warmed,
        report.failed
    );
    report
}

/// Kick off preloading in the background and return its handle.
pub fn spawn_preload(pipeline: Arc<WordSetPipeline>) -> JoinHandle<PreloadReport> {
    tokio::spawn(preload_word_sets(pipeline))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::cache::ContentCache;
    use crate::core::providers::{MockImageGenerator, MockImageSearcher};
    use crate::core::words::WordTable;

    fn pipeline_with_generator(generator: MockImageGenerator) -> Arc<WordSetPipeline> {
        let mut searcher = MockImageSearcher::new();
        searcher.expect_search().times(0);
        Arc::new(WordSetPipeline::new(
            Arc::new(ContentCache::new()),
            Arc::new(WordTable::builtin()),
            Arc::new(generator),
            Arc::new(searcher),
            false,
        ))
    }

    #[tokio::test]
    async fn test_preload_warms_all_ten_keys() {
        let mut generator = MockImageGenerator::new();
        generator
            .expect_generate()
            .returning(|_| Ok("https://img/warm.png".to_string()));

        let report = preload_word_sets(pipeline_with_generator(generator)).await;

        assert_eq!(report.warmed, 10);
        assert_eq!(report.failed, 0);
        assert_eq!(report.total(), 10);
    }

    #[tokio::test]
    async fn test_preload_survives_image_failures() {
        // Image failures degrade words to null images inside the pipeline,
        // so every set still assembles and warming succeeds.
        let mut generator = MockImageGenerator::new();
        generator
            .expect_generate()
            .returning(|_| Err(crate::core::error::GenerationError::Upstream("down".to_string())));

        let report = preload_word_sets(pipeline_with_generator(generator)).await;

        assert_eq!(report.warmed, 10);
        assert_eq!(report.failed, 0);
    }
}
