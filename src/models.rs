//! Data models for stories flowing through the ingestion and
//! summarization pipelines.
//!
//! - [`StoryDetails`]: the raw item record returned by the source API
//! - [`Story`]: the complete record persisted to the store
//! - [`Priority`]: the three-level classification computed at ingestion time

use chrono::{DateTime, Utc};
use serde::Deserialize;

/// Priority tier assigned to a story when it is first ingested.
///
/// Computed once from the story's url/title against the priority rules and
/// never recomputed afterwards. Stored as its integer value so the web
/// layer can sort on it directly.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord)]
pub enum Priority {
    /// No rule matched.
    #[default]
    Normal,
    /// A substring rule matched.
    Medium,
    /// A regex rule matched.
    High,
}

impl Priority {
    /// Integer form used in the stories table (0, 1 or 2).
    pub fn as_i64(self) -> i64 {
        match self {
            Priority::Normal => 0,
            Priority::Medium => 1,
            Priority::High => 2,
        }
    }

    /// Convert a stored integer back to a tier. Unknown values fall back
    /// to [`Priority::Normal`] so older rows stay readable.
    pub fn from_i64(value: i64) -> Self {
        match value {
            2 => Priority::High,
            1 => Priority::Medium,
            _ => Priority::Normal,
        }
    }
}

/// An item as returned by the source API's detail endpoint.
///
/// Everything except `id` is optional: dead, deleted and self-text items
/// omit fields, and the pipeline tolerates all of them.
#[derive(Debug, Clone, Deserialize)]
pub struct StoryDetails {
    pub id: i64,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub by: Option<String>,
    #[serde(default)]
    pub score: Option<i64>,
    #[serde(default)]
    pub url: Option<String>,
}

/// A story as persisted to the store.
///
/// `content` is `None` until extraction succeeds and stays `None` forever
/// if it never does; `summary` is `None` until the summarization pipeline
/// fills it in on a later run.
#[derive(Debug, Clone)]
pub struct Story {
    pub id: i64,
    pub title: Option<String>,
    pub by: Option<String>,
    pub score: Option<i64>,
    pub url: Option<String>,
    pub content: Option<String>,
    pub summary: Option<String>,
    pub priority: Priority,
    pub last_updated: DateTime<Utc>,
}

impl Story {
    /// Build the persistable record from fetched details plus the
    /// pipeline's classification and extraction results.
    pub fn from_details(details: StoryDetails, priority: Priority, content: Option<String>) -> Self {
        Story {
            id: details.id,
            title: details.title,
            by: details.by,
            score: details.score,
            url: details.url,
            content,
            summary: None,
            priority,
            last_updated: Utc::now(),
        }
    }
}
