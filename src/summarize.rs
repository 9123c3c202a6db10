//! The concurrent summarization pipeline.
//!
//! Independent of ingestion and separately schedulable: one run finds
//! every persisted story with extracted content but no summary, fans out
//! to a bounded number of generator calls, and writes each successful
//! summary back. A failed story keeps its null summary and is picked up
//! again on the next run; nothing is retried within a run.

use futures::stream::{self, StreamExt};
use tracing::{debug, error, info, instrument, warn};

use crate::llm::Summarize;
use crate::store::{Store, StoreError};
use crate::utils::truncate_for_log;

/// Counts reported at the end of a summarization run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SummaryReport {
    /// Stories with content but no summary at the start of the run.
    pub candidates: usize,
    /// Summaries generated and stored.
    pub summarized: usize,
    /// Stories left unsummarized for a later run.
    pub failed: usize,
}

/// Orchestrates one summarization run over the store.
pub struct SummarizationPipeline<G> {
    generator: G,
    store: Store,
    workers: usize,
}

impl<G: Summarize + Sync> SummarizationPipeline<G> {
    pub fn new(generator: G, store: Store, workers: usize) -> Self {
        Self {
            generator,
            store,
            workers,
        }
    }

    /// Run one summarization batch to completion.
    ///
    /// An empty candidate set is a normal, immediate completion. The run
    /// waits for every submitted task before reporting.
    #[instrument(level = "info", skip_all)]
    pub async fn run(&self) -> Result<SummaryReport, StoreError> {
        let pending = self.store.stories_missing_summary()?;

        let mut report = SummaryReport {
            candidates: pending.len(),
            ..SummaryReport::default()
        };
        if pending.is_empty() {
            info!("every story with content already has a summary");
            return Ok(report);
        }
        info!(candidates = pending.len(), workers = self.workers, "starting summarization batch");

        let results: Vec<bool> = stream::iter(pending)
            .map(|(id, content)| self.summarize_story(id, content))
            .buffer_unordered(self.workers)
            .collect()
            .await;

        report.summarized = results.iter().filter(|ok| **ok).count();
        report.failed = report.candidates - report.summarized;

        info!(
            summarized = report.summarized,
            failed = report.failed,
            "summarization run complete"
        );
        Ok(report)
    }

    /// Summarize and persist one story; returns whether the summary was
    /// stored. Failures stay confined to this story.
    #[instrument(level = "debug", skip(self, content))]
    async fn summarize_story(&self, id: i64, content: String) -> bool {
        match self.generator.summarize(&content).await {
            Ok(summary) => match self.store.update_summary(id, &summary) {
                Ok(()) => {
                    debug!(id, preview = %truncate_for_log(&summary, 120), "summary stored");
                    true
                }
                Err(e) => {
                    error!(id, error = %e, "could not store summary");
                    false
                }
            },
            Err(e) => {
                warn!(id, error = %e, "summary generation failed; will retry on a later run");
                false
            }
        }
    }
}
