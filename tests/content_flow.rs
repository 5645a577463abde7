//! Pipeline flows over real HTTP providers backed by a local mock server.

use std::sync::Arc;

use storypeak::core::cache::ContentCache;
use storypeak::core::error::GenerationError;
use storypeak::core::providers::{
    FluxImageProvider, GoogleImageSearcher, OpenAiTextProvider,
};
use storypeak::core::story::StoryPipeline;
use storypeak::core::words::{Difficulty, WordSetPipeline, WordTable};
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn story_json() -> serde_json::Value {
    serde_json::json!({
        "title": "The Apple Orchard",
        "story": "Mia visited an orchard. She counted baskets all afternoon.",
        "questions": [
            { "id": 1, "question": "3 baskets of 4 apples?", "answer": 12 },
            { "id": 2, "question": "Half of 10 apples?", "answer": 5 },
            { "id": 3, "question": "7 plus 8 apples?", "answer": 15 },
            { "id": 4, "question": "20 minus 6 apples?", "answer": 14 }
        ],
        "imagePrompt": "A sunny apple orchard with wooden baskets"
    })
}

fn story_pipeline(server: &MockServer) -> StoryPipeline {
    StoryPipeline::new(
        Arc::new(ContentCache::new()),
        Arc::new(OpenAiTextProvider::new(
            Some("test-key".to_string()),
            server.uri(),
            "gpt-4",
        )),
    )
}

#[tokio::test]
async fn story_request_parses_and_caches_the_completion() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "choices": [
                { "message": { "role": "assistant", "content": story_json().to_string() } }
            ]
        })))
        .expect(1) // second request must come from the cache
        .mount(&server)
        .await;

    let pipeline = story_pipeline(&server);

    let first = pipeline
        .generate("3rd grade", "Math", Some("easy"))
        .await
        .unwrap();
    assert_eq!(first.title, "The Apple Orchard");
    assert_eq!(first.questions.len(), 4);
    assert_eq!(first.questions[0].answer, 12.0);

    let second = pipeline
        .generate("3rd grade", "Math", Some("easy"))
        .await
        .unwrap();
    assert_eq!(first, second);
}

#[tokio::test]
async fn story_with_non_json_completion_fails_and_is_not_cached() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "choices": [
                { "message": { "role": "assistant", "content": "Once upon a time..." } }
            ]
        })))
        .expect(2) // the failed first request must not populate the cache
        .mount(&server)
        .await;

    let pipeline = story_pipeline(&server);

    for _ in 0..2 {
        let err = pipeline
            .generate("3rd grade", "Reading", None)
            .await
            .unwrap_err();
        assert!(matches!(err, GenerationError::Parse(_)));
    }
}

#[tokio::test]
async fn math_story_request_carries_difficulty_guidance() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(body_partial_json(serde_json::json!({ "model": "gpt-4" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "choices": [
                { "message": { "role": "assistant", "content": story_json().to_string() } }
            ]
        })))
        .mount(&server)
        .await;

    let pipeline = story_pipeline(&server);
    pipeline
        .generate("5th grade", "Math", Some("hard"))
        .await
        .unwrap();

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);
    let body: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
    let prompt = body["messages"][0]["content"].as_str().unwrap();
    assert!(prompt.contains("5th grade"));
    assert!(prompt.contains("hard"));
    assert!(prompt.contains("EXACTLY 4"));
}

#[tokio::test]
async fn word_set_resolves_every_word_through_the_image_service() {
    let image_server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "images": [{ "url": "https://img/word.png" }]
        })))
        .expect(4) // one generation per word in the chosen category
        .mount(&image_server)
        .await;

    let search_server = MockServer::start().await;

    let pipeline = WordSetPipeline::new(
        Arc::new(ContentCache::new()),
        Arc::new(WordTable::builtin()),
        Arc::new(FluxImageProvider::new(
            Some("flux-key".to_string()),
            image_server.uri(),
        )),
        Arc::new(GoogleImageSearcher::new(None, None, search_server.uri())),
        false,
    );

    let set = pipeline.generate(Difficulty::Hard, 3).await.unwrap();

    assert_eq!(set.images.len(), 4);
    assert!(set
        .images
        .iter()
        .all(|w| w.image_url.as_deref() == Some("https://img/word.png")));
    assert_eq!(set.scrambled_words.len(), 4);
    for (image, scrambled) in set.images.iter().zip(&set.scrambled_words) {
        assert_eq!(image.word, scrambled.word);
    }

    // A repeat request for the same key is served from the cache; the
    // mock's expect(4) would fail on any further generation calls.
    let again = pipeline.generate(Difficulty::Hard, 3).await.unwrap();
    assert_eq!(set, again);
}
