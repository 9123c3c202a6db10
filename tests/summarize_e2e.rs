//! End-to-end summarization runs against a scripted generator.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use chrono::Utc;
use hn_digest::llm::{Summarize, SummarizeError};
use hn_digest::models::{Priority, Story};
use hn_digest::store::Store;
use hn_digest::summarize::SummarizationPipeline;

/// Scripted generator: a fixed reply (or a scripted failure), counting
/// calls so tests can assert what got summarized.
struct StubSummarizer {
    reply: Option<String>,
    calls: Arc<AtomicUsize>,
}

impl StubSummarizer {
    fn replying(text: &str) -> Self {
        Self {
            reply: Some(text.to_string()),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    fn failing() -> Self {
        Self {
            reply: None,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }
}

impl Summarize for StubSummarizer {
    async fn summarize(&self, _content: &str) -> Result<String, SummarizeError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.reply {
            Some(text) => Ok(text.clone()),
            None => Err(SummarizeError::Status(503)),
        }
    }
}

fn story_with_content(id: i64, content: Option<&str>) -> Story {
    Story {
        id,
        title: Some(format!("Story {id}")),
        by: Some("poster".into()),
        score: Some(10),
        url: None,
        content: content.map(str::to_string),
        summary: None,
        priority: Priority::Normal,
        last_updated: Utc::now(),
    }
}

#[tokio::test]
async fn unsummarized_story_gets_a_summary_and_a_fresh_stamp() {
    let store = Store::open_in_memory().unwrap();
    store
        .insert(&story_with_content(5, Some("A long article body.")))
        .unwrap();
    let before = store.get(5).unwrap().unwrap().last_updated;

    let generator = StubSummarizer::replying("A tidy summary.");
    let calls = Arc::clone(&generator.calls);
    let pipeline = SummarizationPipeline::new(generator, store.clone(), 10);

    let report = pipeline.run().await.unwrap();
    assert_eq!(report.candidates, 1);
    assert_eq!(report.summarized, 1);
    assert_eq!(report.failed, 0);

    let after = store.get(5).unwrap().unwrap();
    assert_eq!(after.summary.as_deref(), Some("A tidy summary."));
    assert!(after.last_updated >= before);

    // Nothing left to summarize: the second run is an immediate no-op.
    let second = pipeline.run().await.unwrap();
    assert_eq!(second.candidates, 0);
    assert_eq!(second.summarized, 0);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn failed_generation_leaves_the_story_retryable() {
    let store = Store::open_in_memory().unwrap();
    store
        .insert(&story_with_content(6, Some("Another article body.")))
        .unwrap();

    let pipeline = SummarizationPipeline::new(StubSummarizer::failing(), store.clone(), 10);
    let report = pipeline.run().await.unwrap();
    assert_eq!(report.candidates, 1);
    assert_eq!(report.summarized, 0);
    assert_eq!(report.failed, 1);

    // Summary stays null, so the next run will pick the story up again.
    assert!(store.get(6).unwrap().unwrap().summary.is_none());
    assert_eq!(store.stories_missing_summary().unwrap().len(), 1);
}

#[tokio::test]
async fn stories_without_content_are_not_candidates() {
    let store = Store::open_in_memory().unwrap();
    store.insert(&story_with_content(1, None)).unwrap();
    store.insert(&story_with_content(2, Some("  "))).unwrap();

    let generator = StubSummarizer::replying("unused");
    let calls = Arc::clone(&generator.calls);
    let pipeline = SummarizationPipeline::new(generator, store.clone(), 10);

    let report = pipeline.run().await.unwrap();
    assert_eq!(report.candidates, 0);
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn one_failure_does_not_block_other_summaries() {
    // A generator that fails only for one story's content.
    struct Selective;
    impl Summarize for Selective {
        async fn summarize(&self, content: &str) -> Result<String, SummarizeError> {
            if content.contains("poison") {
                Err(SummarizeError::EmptyReply)
            } else {
                Ok(format!("summary of: {content}"))
            }
        }
    }

    let store = Store::open_in_memory().unwrap();
    store
        .insert(&story_with_content(1, Some("good article")))
        .unwrap();
    store
        .insert(&story_with_content(2, Some("poison article")))
        .unwrap();
    store
        .insert(&story_with_content(3, Some("better article")))
        .unwrap();

    let report = SummarizationPipeline::new(Selective, store.clone(), 10)
        .run()
        .await
        .unwrap();
    assert_eq!(report.candidates, 3);
    assert_eq!(report.summarized, 2);
    assert_eq!(report.failed, 1);

    assert!(store.get(1).unwrap().unwrap().summary.is_some());
    assert!(store.get(2).unwrap().unwrap().summary.is_none());
    assert!(store.get(3).unwrap().unwrap().summary.is_some());
}
