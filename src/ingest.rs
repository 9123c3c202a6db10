//! The concurrent ingestion pipeline.
//!
//! One run discovers the candidate id list, drops ids the store already
//! has, then walks each remaining story through detail fetch, the
//! blacklist gate, priority classification, content extraction, and
//! persistence, with a bounded number of stories in flight at once.
//! Failures are confined to the story they hit: only an
//! unavailable candidate-id list aborts the run, and the run always waits
//! for every submitted task to reach a terminal state before reporting.

use std::collections::HashSet;
use std::sync::Arc;

use futures::stream::{self, StreamExt};
use itertools::Itertools;
use tracing::{debug, error, info, instrument, warn};

use crate::extract::ContentExtractor;
use crate::hn::{FetchError, SourceApi};
use crate::models::Story;
use crate::rules::RuleSet;
use crate::store::{Store, StoreError};

/// Terminal state of a single story's task.
enum ItemOutcome {
    /// Complete row written.
    Persisted,
    /// Url or title matched the blacklist; no row written.
    Blacklisted,
    /// Another writer got there first; logged, not an error.
    Duplicate,
    /// Detail fetch or persistence failed; story abandoned.
    Failed,
}

/// Counts reported at the end of an ingestion run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct IngestReport {
    /// Candidate ids returned by the source.
    pub discovered: usize,
    /// Candidates dropped because the store already has them.
    pub skipped_existing: usize,
    /// Stories dropped by the blacklist.
    pub blacklisted: usize,
    /// Complete rows written.
    pub persisted: usize,
    /// Insert races lost to a sibling writer.
    pub duplicates: usize,
    /// Stories abandoned after a per-item failure.
    pub failed: usize,
}

/// Orchestrates one ingestion run over a story source.
pub struct IngestionPipeline<S> {
    source: S,
    extractor: ContentExtractor,
    blacklist: Arc<RuleSet>,
    priority_rules: Arc<RuleSet>,
    store: Store,
    workers: usize,
}

impl<S: SourceApi + Sync> IngestionPipeline<S> {
    pub fn new(
        source: S,
        extractor: ContentExtractor,
        blacklist: Arc<RuleSet>,
        priority_rules: Arc<RuleSet>,
        store: Store,
        workers: usize,
    ) -> Self {
        Self {
            source,
            extractor,
            blacklist,
            priority_rules,
            store,
            workers,
        }
    }

    /// Run one ingestion batch to completion.
    ///
    /// Returns an error only when the candidate-id list itself cannot be
    /// fetched; every other failure is tallied in the report.
    #[instrument(level = "info", skip_all)]
    pub async fn run(&self) -> Result<IngestReport, FetchError> {
        let candidate_ids = self.source.top_story_ids().await.inspect_err(|e| {
            error!(error = %e, "could not fetch the candidate id list; aborting run");
        })?;

        let mut report = IngestReport {
            discovered: candidate_ids.len(),
            ..IngestReport::default()
        };
        if candidate_ids.is_empty() {
            info!("source returned no candidates; nothing to do");
            return Ok(report);
        }

        let known = self.store.existing_ids().unwrap_or_else(|e| {
            warn!(error = %e, "could not read existing ids; treating store as empty");
            HashSet::new()
        });

        let unique_ids: Vec<i64> = candidate_ids.into_iter().unique().collect();
        let to_process: Vec<i64> = unique_ids
            .iter()
            .copied()
            .filter(|id| !known.contains(id))
            .collect();
        report.skipped_existing = unique_ids.len() - to_process.len();
        info!(
            discovered = report.discovered,
            new = to_process.len(),
            skipped_existing = report.skipped_existing,
            workers = self.workers,
            "starting ingestion batch"
        );

        let outcomes: Vec<ItemOutcome> = stream::iter(to_process)
            .map(|id| self.process_story(id))
            .buffer_unordered(self.workers)
            .collect()
            .await;

        for outcome in outcomes {
            match outcome {
                ItemOutcome::Persisted => report.persisted += 1,
                ItemOutcome::Blacklisted => report.blacklisted += 1,
                ItemOutcome::Duplicate => report.duplicates += 1,
                ItemOutcome::Failed => report.failed += 1,
            }
        }

        info!(
            persisted = report.persisted,
            blacklisted = report.blacklisted,
            duplicates = report.duplicates,
            failed = report.failed,
            "ingestion run complete"
        );
        Ok(report)
    }

    /// Walk one story to a terminal state. Never propagates an error:
    /// whatever happens here must not touch sibling tasks.
    #[instrument(level = "debug", skip(self))]
    async fn process_story(&self, id: i64) -> ItemOutcome {
        let details = match self.source.story_details(id).await {
            Ok(details) => details,
            Err(e) => {
                warn!(id, error = %e, "abandoning story: detail fetch failed");
                return ItemOutcome::Failed;
            }
        };

        if self
            .blacklist
            .matches(details.url.as_deref(), details.title.as_deref())
        {
            debug!(id, url = details.url.as_deref().unwrap_or(""), "story is blacklisted; no row written");
            return ItemOutcome::Blacklisted;
        }

        let priority = self
            .priority_rules
            .classify(details.url.as_deref(), details.title.as_deref());

        let content = match &details.url {
            Some(url) => match self.extractor.extract(url).await {
                Ok(text) => Some(text),
                Err(e) => {
                    warn!(id, %url, error = %e, "content extraction failed; persisting without content");
                    None
                }
            },
            None => None,
        };

        let story = Story::from_details(details, priority, content);
        match self.store.insert(&story) {
            Ok(()) => {
                debug!(id, priority = story.priority.as_i64(), "story persisted");
                ItemOutcome::Persisted
            }
            Err(StoreError::AlreadyExists(_)) => {
                warn!(id, "story already present; insert skipped");
                ItemOutcome::Duplicate
            }
            Err(e) => {
                error!(id, error = %e, "could not persist story");
                ItemOutcome::Failed
            }
        }
    }
}
