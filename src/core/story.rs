//! Story generation pipeline.
//!
//! Produces an educational story with exactly four word problems for a
//! (grade, subject, difficulty) request: cache check, one text-generator
//! call, JSON parse, field-by-field validation, cache write. Nothing is
//! cached on failure, so the next call regenerates from scratch.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::core::cache::ContentCache;
use crate::core::error::{GenerationError, Result};
use crate::core::providers::TextGenerator;

/// Number of word problems every story must carry.
pub const QUESTION_COUNT: usize = 4;

/// One word problem with a numeric answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoryQuestion {
    pub id: u32,
    pub question: String,
    pub answer: f64,
}

/// A generated story with its word problems and an illustration prompt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoryContent {
    pub title: String,
    pub story: String,
    pub questions: Vec<StoryQuestion>,
    pub image_prompt: String,
}

impl StoryContent {
    /// Validate a parsed JSON value field-by-field and build the typed
    /// content. Errors name the specific defect.
    pub fn from_value(value: &serde_json::Value) -> Result<Self> {
        let title = value["title"]
            .as_str()
            .filter(|s| !s.trim().is_empty())
            .ok_or_else(|| GenerationError::invalid_field("title"))?;

        let story = value["story"]
            .as_str()
            .filter(|s| !s.trim().is_empty())
            .ok_or_else(|| GenerationError::invalid_field("story"))?;

        let questions = value["questions"].as_array();
        let count = questions.map(|q| q.len()).unwrap_or(0);
        let questions = match questions {
            Some(arr) if arr.len() == QUESTION_COUNT => arr,
            _ => {
                return Err(GenerationError::Validation(format!(
                    "Invalid or missing questions in the generated content. \
                     Expected {QUESTION_COUNT} questions, got {count}"
                )));
            }
        };

        let mut parsed_questions = Vec::with_capacity(QUESTION_COUNT);
        for (i, q) in questions.iter().enumerate() {
            let id = q["id"]
                .as_u64()
                .filter(|id| *id > 0 && *id <= u64::from(u32::MAX));
            let question = q["question"].as_str().filter(|s| !s.trim().is_empty());
            let answer = q["answer"].as_f64();

            match (id, question, answer) {
                (Some(id), Some(question), Some(answer)) => {
                    parsed_questions.push(StoryQuestion {
                        id: id as u32,
                        question: question.to_string(),
                        answer,
                    });
                }
                _ => {
                    return Err(GenerationError::Validation(format!(
                        "Invalid question structure for question {}",
                        i + 1
                    )));
                }
            }
        }

        let image_prompt = value["imagePrompt"]
            .as_str()
            .filter(|s| !s.trim().is_empty())
            .ok_or_else(|| GenerationError::invalid_field("image prompt"))?;

        Ok(Self {
            title: title.to_string(),
            story: story.to_string(),
            questions: parsed_questions,
            image_prompt: image_prompt.to_string(),
        })
    }
}

/// Deterministic cache key for a story request.
///
/// Grade and subject are free text and may contain the separator, so each
/// segment is length-prefixed. Absent difficulty maps to a bare `-`, which
/// no present value can render as (present values carry a length prefix).
pub fn story_cache_key(grade: &str, subject: &str, difficulty: Option<&str>) -> String {
    let difficulty = match difficulty {
        Some(d) => format!("{}:{d}", d.len()),
        None => "-".to_string(),
    };
    format!(
        "{}:{grade}|{}:{subject}|{difficulty}",
        grade.len(),
        subject.len()
    )
}

/// Cache-fronted story generation.
pub struct StoryPipeline {
    cache: Arc<ContentCache<StoryContent>>,
    text: Arc<dyn TextGenerator>,
}

impl StoryPipeline {
    pub fn new(cache: Arc<ContentCache<StoryContent>>, text: Arc<dyn TextGenerator>) -> Self {
        Self { cache, text }
    }

    /// Generate (or return the cached) story for a request.
    ///
    /// The text generator is called at most once per cache miss, with no
    /// retry at this layer.
    pub async fn generate(
        &self,
        grade: &str,
        subject: &str,
        difficulty: Option<&str>,
    ) -> Result<StoryContent> {
        let key = story_cache_key(grade, subject, difficulty);

        if let Some(cached) = self.cache.get(&key).await {
            log::debug!("Story cache hit for {key}");
            return Ok(cached);
        }
        log::debug!("Story cache miss for {key}; generating");

        let prompt = build_story_prompt(grade, subject, difficulty);
        let raw = self.text.generate(&prompt).await?;

        let value: serde_json::Value = serde_json::from_str(raw.trim()).map_err(|e| {
            log::error!("JSON parsing error: {e}; received text: {raw}");
            GenerationError::Parse(e.to_string())
        })?;

        let content = StoryContent::from_value(&value)?;

        self.cache.put(key, content.clone()).await;
        Ok(content)
    }
}

/// Build the natural-language prompt demanding the structured story JSON.
///
/// Math requests get extra concept guidance keyed to the difficulty.
fn build_story_prompt(grade: &str, subject: &str, difficulty: Option<&str>) -> String {
    let mut prompt = format!(
        "Create an educational story for {grade} students about {subject}. \
         Include a title, a short story (2-3 paragraphs), and EXACTLY 4 math \
         word problems with numerical answers. Also, provide a brief image \
         prompt that describes a scene from the story."
    );

    if subject == "Math" {
        if let Some(difficulty) = difficulty {
            prompt.push_str(&format!(
                "\nThe difficulty level is {difficulty}.\n\
                 For {difficulty} questions, focus on the following math concepts:\n\
                 - Multiplication\n\
                 - Time and distance\n\
                 - Algebra\n\
                 - Fractions\n\
                 - Area and perimeter\n\
                 - Volume\n"
            ));
            if difficulty == "Easy" {
                prompt.push_str(
                    "For easy questions, use simpler numbers and straightforward calculations.\n",
                );
            }
            if difficulty == "Hard" {
                prompt.push_str(
                    "For hard questions, include more complex calculations and multi-step problems.\n",
                );
            }
        }
    }

    prompt.push_str(
        "\nFormat the response as JSON with the following structure:\n\
         {\n\
           \"title\": \"Story Title\",\n\
           \"story\": \"Story text...\",\n\
           \"questions\": [\n\
             {\"id\": 1, \"question\": \"Question text...\", \"answer\": numerical_answer},\n\
             {\"id\": 2, \"question\": \"Question text...\", \"answer\": numerical_answer},\n\
             {\"id\": 3, \"question\": \"Question text...\", \"answer\": numerical_answer},\n\
             {\"id\": 4, \"question\": \"Question text...\", \"answer\": numerical_answer}\n\
           ],\n\
           \"imagePrompt\": \"Brief description of a scene from the story for image generation\"\n\
         }\n\
         Ensure that the JSON is properly formatted, all fields are present, \
         and there are EXACTLY 4 questions.",
    );

    prompt
}
