//! End-to-end ingestion runs against a scripted story source.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use hn_digest::extract::ContentExtractor;
use hn_digest::hn::{FetchError, SourceApi};
use hn_digest::ingest::IngestionPipeline;
use hn_digest::models::{Priority, StoryDetails};
use hn_digest::rules::RuleSet;
use hn_digest::store::Store;

/// Scripted source: a fixed id list and item table, counting detail
/// fetches so tests can assert what got re-fetched.
struct StubSource {
    ids: Vec<i64>,
    items: Vec<StoryDetails>,
    detail_calls: Arc<AtomicUsize>,
}

impl StubSource {
    fn new(items: Vec<StoryDetails>) -> Self {
        Self {
            ids: items.iter().map(|s| s.id).collect(),
            items,
            detail_calls: Arc::new(AtomicUsize::new(0)),
        }
    }
}

impl SourceApi for StubSource {
    async fn top_story_ids(&self) -> Result<Vec<i64>, FetchError> {
        Ok(self.ids.clone())
    }

    async fn story_details(&self, id: i64) -> Result<StoryDetails, FetchError> {
        self.detail_calls.fetch_add(1, Ordering::SeqCst);
        self.items
            .iter()
            .find(|s| s.id == id)
            .cloned()
            .ok_or(FetchError::NotFound { id })
    }
}

fn details(id: i64, title: &str, url: Option<&str>) -> StoryDetails {
    StoryDetails {
        id,
        title: Some(title.to_string()),
        by: Some("poster".to_string()),
        score: Some(100),
        url: url.map(str::to_string),
    }
}

fn pipeline(
    source: StubSource,
    blacklist_rules: &str,
    priority_rules: &str,
    store: Store,
) -> IngestionPipeline<StubSource> {
    let mut blacklist = RuleSet::empty();
    blacklist.add_source(blacklist_rules, "test-blacklist");
    let blacklist = Arc::new(blacklist);

    let mut priority = RuleSet::empty();
    priority.add_source(priority_rules, "test-priority");

    let extractor =
        ContentExtractor::new(Arc::clone(&blacklist), Duration::from_secs(1)).unwrap();
    IngestionPipeline::new(source, extractor, blacklist, Arc::new(priority), store, 10)
}

#[tokio::test]
async fn blacklisted_story_gets_no_row() {
    // Candidate list [1, 2, 3]; story 2 links to a blacklisted host.
    let source = StubSource::new(vec![
        details(1, "Self post one", None),
        details(2, "Spam post", Some("https://spam.example.com/offer")),
        details(3, "Self post three", None),
    ]);
    let store = Store::open_in_memory().unwrap();

    let report = pipeline(source, "string:spam.example.com", "", store.clone())
        .run()
        .await
        .unwrap();

    assert_eq!(report.discovered, 3);
    assert_eq!(report.persisted, 2);
    assert_eq!(report.blacklisted, 1);
    assert_eq!(report.failed, 0);

    assert!(store.get(1).unwrap().is_some());
    assert!(store.get(2).unwrap().is_none());
    assert!(store.get(3).unwrap().is_some());
}

#[tokio::test]
async fn second_run_never_revisits_stored_stories() {
    let source = StubSource::new(vec![
        details(1, "First", None),
        details(2, "Second", None),
        details(3, "Third", None),
    ]);
    let detail_calls = Arc::clone(&source.detail_calls);
    let store = Store::open_in_memory().unwrap();

    let p = pipeline(source, "", "", store.clone());
    let first = p.run().await.unwrap();
    assert_eq!(first.persisted, 3);
    assert_eq!(detail_calls.load(Ordering::SeqCst), 3);

    let second = p.run().await.unwrap();
    assert_eq!(second.discovered, 3);
    assert_eq!(second.skipped_existing, 3);
    assert_eq!(second.persisted, 0);
    // No detail endpoint traffic for already-stored ids.
    assert_eq!(detail_calls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn priority_is_classified_at_ingestion() {
    let source = StubSource::new(vec![
        details(1, "CVE-2024-12345 fix released", None),
        details(2, "A big sqlite milestone", None),
        details(3, "Nothing notable", None),
    ]);
    let store = Store::open_in_memory().unwrap();

    let rules = "regex:CVE-\\d{4}-\\d+\nstring:sqlite";
    pipeline(source, "", rules, store.clone())
        .run()
        .await
        .unwrap();

    assert_eq!(store.get(1).unwrap().unwrap().priority, Priority::High);
    assert_eq!(store.get(2).unwrap().unwrap().priority, Priority::Medium);
    assert_eq!(store.get(3).unwrap().unwrap().priority, Priority::Normal);
}

#[tokio::test]
async fn extraction_failure_still_persists_the_row() {
    // Port 1 on localhost refuses the connection immediately; the story
    // must still land in the store with null content.
    let source = StubSource::new(vec![details(
        9,
        "Unreachable host",
        Some("http://127.0.0.1:1/article"),
    )]);
    let store = Store::open_in_memory().unwrap();

    let report = pipeline(source, "", "", store.clone()).run().await.unwrap();
    assert_eq!(report.persisted, 1);
    assert_eq!(report.failed, 0);

    let stored = store.get(9).unwrap().unwrap();
    assert_eq!(stored.title.as_deref(), Some("Unreachable host"));
    assert!(stored.content.is_none());
}

#[tokio::test]
async fn one_failing_item_does_not_abort_its_siblings() {
    // Id 2 is in the candidate list but the detail endpoint knows nothing
    // about it.
    let mut source = StubSource::new(vec![
        details(1, "Fine", None),
        details(3, "Also fine", None),
    ]);
    source.ids = vec![1, 2, 3];
    let store = Store::open_in_memory().unwrap();

    let report = pipeline(source, "", "", store.clone()).run().await.unwrap();
    assert_eq!(report.discovered, 3);
    assert_eq!(report.persisted, 2);
    assert_eq!(report.failed, 1);
    assert!(store.get(1).unwrap().is_some());
    assert!(store.get(3).unwrap().is_some());
}

#[tokio::test]
async fn empty_candidate_list_is_a_normal_no_op() {
    let source = StubSource::new(vec![]);
    let store = Store::open_in_memory().unwrap();

    let report = pipeline(source, "", "", store.clone()).run().await.unwrap();
    assert_eq!(report.discovered, 0);
    assert_eq!(report.persisted, 0);
    assert!(store.existing_ids().unwrap().is_empty());
}

#[tokio::test]
async fn unavailable_source_aborts_the_run() {
    struct DownSource;
    impl SourceApi for DownSource {
        async fn top_story_ids(&self) -> Result<Vec<i64>, FetchError> {
            Err(FetchError::Status {
                status: 503,
                url: "http://localhost/topstories.json".into(),
            })
        }
        async fn story_details(&self, id: i64) -> Result<StoryDetails, FetchError> {
            Err(FetchError::NotFound { id })
        }
    }

    let store = Store::open_in_memory().unwrap();
    let blacklist = Arc::new(RuleSet::empty());
    let extractor =
        ContentExtractor::new(Arc::clone(&blacklist), Duration::from_secs(1)).unwrap();
    let p = IngestionPipeline::new(
        DownSource,
        extractor,
        blacklist,
        Arc::new(RuleSet::empty()),
        store.clone(),
        10,
    );

    assert!(matches!(
        p.run().await,
        Err(FetchError::Status { status: 503, .. })
    ));
    assert!(store.existing_ids().unwrap().is_empty());
}

#[tokio::test]
async fn duplicate_candidate_ids_are_processed_once() {
    let mut source = StubSource::new(vec![details(5, "Twice listed", None)]);
    source.ids = vec![5, 5, 5];
    let store = Store::open_in_memory().unwrap();

    let report = pipeline(source, "", "", store.clone()).run().await.unwrap();
    assert_eq!(report.discovered, 3);
    assert_eq!(report.skipped_existing, 0);
    assert_eq!(report.persisted, 1);
    assert_eq!(report.duplicates, 0);
}
