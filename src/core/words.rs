//! Word-scramble set generation.
//!
//! A word set is one vocabulary category (picked uniformly at random per
//! uncached request), an illustration URL per word, and a scrambled form of
//! each word. Sets are cached by `{difficulty}-{set_number}`, so the same
//! key always returns the same category and the same scrambles thereafter —
//! novelty is traded for not re-paying the image services.
//!
//! The vocabulary taxonomy lives in a [`WordTable`] owned by the pipeline
//! rather than ambient global state. Resolved image URLs are written back
//! into the table so a word's image is fetched at most once per process,
//! whichever category or set resolves it first; concurrent writes are
//! idempotent last-write-wins.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use futures::future::join_all;
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::core::cache::ContentCache;
use crate::core::error::{GenerationError, Result};
use crate::core::providers::{ImageGenerator, ImageSearcher};

// ============================================================================
// Model
// ============================================================================

/// Word-set difficulty tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    Hard,
}

impl Difficulty {
    pub const ALL: [Difficulty; 2] = [Difficulty::Easy, Difficulty::Hard];

    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Hard => "hard",
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Difficulty {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "easy" => Ok(Difficulty::Easy),
            "hard" => Ok(Difficulty::Hard),
            other => Err(format!("unknown difficulty: {other}")),
        }
    }
}

/// A vocabulary word and its illustration, if one has been resolved yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WordImage {
    pub word: String,
    pub image_url: Option<String>,
}

impl WordImage {
    fn unresolved(word: &str) -> Self {
        Self {
            word: word.to_string(),
            image_url: None,
        }
    }
}

/// A word and a random permutation of its characters.
///
/// The scrambled form is not guaranteed to differ from the original; a
/// shuffle can land on the identity permutation and that is accepted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScrambledWord {
    pub word: String,
    pub scrambled_word: String,
}

/// One playable word-scramble set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WordScrambleSet {
    pub category: String,
    pub images: Vec<WordImage>,
    pub scrambled_words: Vec<ScrambledWord>,
}

/// A named category and its fixed, ordered word list.
#[derive(Debug, Clone)]
pub struct WordCategory {
    pub name: String,
    pub words: Vec<WordImage>,
}

impl WordCategory {
    fn new(name: &str, words: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            words: words.iter().map(|w| WordImage::unresolved(w)).collect(),
        }
    }
}

// ============================================================================
// Word table
// ============================================================================

/// The vocabulary taxonomy, shared by every word-set request.
///
/// Constructed once at startup and injected into the pipeline. All access
/// goes through an async `RwLock`; image-URL writes are single-field and
/// idempotent, so concurrent resolutions of the same word are benign.
pub struct WordTable {
    tiers: RwLock<HashMap<Difficulty, Vec<WordCategory>>>,
}

impl WordTable {
    pub fn new(tiers: HashMap<Difficulty, Vec<WordCategory>>) -> Self {
        Self {
            tiers: RwLock::new(tiers),
        }
    }

    /// The built-in taxonomy: four categories of four words per tier.
    pub fn builtin() -> Self {
        let mut tiers = HashMap::new();
        tiers.insert(
            Difficulty::Easy,
            vec![
                WordCategory::new("food", &["apple", "banana", "pizza", "cookie"]),
                WordCategory::new("animals", &["cat", "dog", "elephant", "lion"]),
                WordCategory::new("birds", &["eagle", "penguin", "parrot", "owl"]),
                WordCategory::new("vehicles", &["car", "bus", "bike", "train"]),
            ],
        );
        tiers.insert(
            Difficulty::Hard,
            vec![
                WordCategory::new("astronomy", &["nebula", "quasar", "galaxy", "comet"]),
                WordCategory::new("chemistry", &["molecule", "isotope", "catalyst", "polymer"]),
                WordCategory::new("mythology", &["phoenix", "minotaur", "hydra", "kraken"]),
                WordCategory::new("geography", &["fjord", "plateau", "archipelago", "tundra"]),
            ],
        );
        Self::new(tiers)
    }

    /// Category names for a tier, in declaration order.
    pub async fn category_names(&self, difficulty: Difficulty) -> Vec<String> {
        let tiers = self.tiers.read().await;
        tiers
            .get(&difficulty)
            .map(|cats| cats.iter().map(|c| c.name.clone()).collect())
            .unwrap_or_default()
    }

    /// Snapshot of a category's word list, current image URLs included.
    pub async fn snapshot(&self, difficulty: Difficulty, category: &str) -> Option<Vec<WordImage>> {
        let tiers = self.tiers.read().await;
        tiers
            .get(&difficulty)?
            .iter()
            .find(|c| c.name == category)
            .map(|c| c.words.clone())
    }

    /// Record a resolved image URL for a word. Last write wins; unknown
    /// words are ignored.
    pub async fn set_image(
        &self,
        difficulty: Difficulty,
        category: &str,
        word: &str,
        image_url: &str,
    ) {
        let mut tiers = self.tiers.write().await;
        if let Some(entry) = tiers
            .get_mut(&difficulty)
            .and_then(|cats| cats.iter_mut().find(|c| c.name == category))
            .and_then(|c| c.words.iter_mut().find(|w| w.word == word))
        {
            entry.image_url = Some(image_url.to_string());
        }
    }
}

// ============================================================================
// Scrambling
// ============================================================================

/// Produce a uniform random permutation of a word's characters.
///
/// There is deliberately no check against the shuffle reproducing the
/// original order; callers must accept `scrambled == word`.
pub fn scramble_word(word: &str) -> String {
    let mut chars: Vec<char> = word.chars().collect();
    chars.shuffle(&mut rand::thread_rng());
    chars.into_iter().collect()
}

// ============================================================================
// Pipeline
// ============================================================================

/// Deterministic cache key for a word-set request.
pub fn word_set_cache_key(difficulty: Difficulty, set_number: u32) -> String {
    format!("{difficulty}-{set_number}")
}

/// Cache-fronted word-set generation.
pub struct WordSetPipeline {
    cache: Arc<ContentCache<WordScrambleSet>>,
    table: Arc<WordTable>,
    generator: Arc<dyn ImageGenerator>,
    searcher: Arc<dyn ImageSearcher>,
    use_search: bool,
}

impl WordSetPipeline {
    pub fn new(
        cache: Arc<ContentCache<WordScrambleSet>>,
        table: Arc<WordTable>,
        generator: Arc<dyn ImageGenerator>,
        searcher: Arc<dyn ImageSearcher>,
        use_search: bool,
    ) -> Self {
        Self {
            cache,
            table,
            generator,
            searcher,
            use_search,
        }
    }

    /// Generate (or return the cached) word set for a key.
    ///
    /// `set_number` only distinguishes cache entries; content varies through
    /// the random category pick on a miss.
    pub async fn generate(
        &self,
        difficulty: Difficulty,
        set_number: u32,
    ) -> Result<WordScrambleSet> {
        let key = word_set_cache_key(difficulty, set_number);

        if let Some(cached) = self.cache.get(&key).await {
            log::debug!("Word-set cache hit for {key}");
            return Ok(cached);
        }
        log::debug!("Word-set cache miss for {key}; generating");

        let categories = self.table.category_names(difficulty).await;
        if categories.is_empty() {
            return Err(GenerationError::Validation(format!(
                "no word categories available for difficulty {difficulty}"
            )));
        }
        let category = {
            let index = rand::thread_rng().gen_range(0..categories.len());
            categories[index].clone()
        };
        log::info!("Selected category {category} for {key}");

        let words = self
            .table
            .snapshot(difficulty, &category)
            .await
            .unwrap_or_default();

        // Resolve every word's image concurrently. A single word failing
        // degrades that word to a null image instead of failing the set.
        let resolutions = words
            .iter()
            .map(|word| self.resolve_word(difficulty, &category, word));
        let images: Vec<WordImage> = join_all(resolutions).await;

        let scrambled_words: Vec<ScrambledWord> = images
            .iter()
            .map(|img| ScrambledWord {
                word: img.word.clone(),
                scrambled_word: scramble_word(&img.word),
            })
            .collect();

        let set = WordScrambleSet {
            category,
            images,
            scrambled_words,
        };
        validate_set(&set)?;

        self.cache.put(key, set.clone()).await;
        Ok(set)
    }

    /// Resolve one word's image: existing table entry, then search (when
    /// enabled), then generation. Failures degrade to `None`.
    async fn resolve_word(
        &self,
        difficulty: Difficulty,
        category: &str,
        word: &WordImage,
    ) -> WordImage {
        if word.image_url.is_some() {
            return word.clone();
        }

        match self.fetch_image(&word.word).await {
            Ok(url) => {
                self.table
                    .set_image(difficulty, category, &word.word, &url)
                    .await;
                WordImage {
                    word: word.word.clone(),
                    image_url: Some(url),
                }
            }
            Err(e) => {
                log::error!("Failed to resolve image for word \"{}\": {e}", word.word);
                WordImage {
                    word: word.word.clone(),
                    image_url: None,
                }
            }
        }
    }

    async fn fetch_image(&self, word: &str) -> Result<String> {
        if self.use_search {
            if let Some(url) = self.searcher.search(&format!("cartoon {word} for children")).await
            {
                log::debug!("Found searched image for {word}: {url}");
                return Ok(url);
            }
        }

        let prompt = format!(
            "A simple, cartoon-style drawing of a {word} on a white background, \
             suitable for children."
        );
        self.generator.generate(&prompt).await
    }
}

/// Shape check for an assembled set before it is cached.
fn validate_set(set: &WordScrambleSet) -> Result<()> {
    if set.category.is_empty() {
        return Err(GenerationError::Validation(
            "word set has an empty category".to_string(),
        ));
    }
    if set.images.is_empty() || set.images.len() != set.scrambled_words.len() {
        return Err(GenerationError::Validation(
            "word set images and scrambles are misaligned".to_string(),
        ));
    }
    Ok(())
}
