//! Hacker News source API client.
//!
//! Two read-only endpoints drive ingestion: the top-stories id list and
//! the per-item detail record. Both are unreliable third parties, so every
//! call returns an explicit [`FetchError`] instead of panicking or hiding
//! the failure mode; the pipeline decides which failures abort a run and
//! which abandon a single item.
//!
//! [`SourceApi`] is the seam the ingestion pipeline is generic over, so
//! tests can substitute a scripted source without any network.

use std::time::Duration;

use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::{debug, instrument};

use crate::models::StoryDetails;

/// Production base URL for the source API.
pub const DEFAULT_API_BASE: &str = "https://hacker-news.firebaseio.com/v0";

/// Failure modes of a single source API call.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The endpoint answered with a non-success status.
    #[error("source returned HTTP {status} for {url}")]
    Status { status: u16, url: String },
    /// The item id resolved to no payload (dead or unknown id).
    #[error("item {id} has no payload at the source")]
    NotFound { id: i64 },
    /// Timeout, connection failure, or any other transport-level error.
    #[error("transport failure: {0}")]
    Transport(#[from] reqwest::Error),
    /// The endpoint answered 200 with a body that does not parse.
    #[error("malformed response body: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// The two read-only operations the ingestion pipeline needs from the
/// story source.
pub trait SourceApi {
    /// Fetch the full ordered list of top candidate ids.
    async fn top_story_ids(&self) -> Result<Vec<i64>, FetchError>;

    /// Fetch the detail record for one story id.
    async fn story_details(&self, id: i64) -> Result<StoryDetails, FetchError>;
}

/// HTTP client for the Hacker News Firebase API.
#[derive(Debug, Clone)]
pub struct HnClient {
    http: reqwest::Client,
    base_url: String,
}

impl HnClient {
    /// Build a client against `base_url` with a per-request timeout.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, FetchError> {
        let resp = self.http.get(url).send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }
        let body = resp.text().await?;
        Ok(serde_json::from_str(&body)?)
    }
}

impl SourceApi for HnClient {
    #[instrument(level = "info", skip_all)]
    async fn top_story_ids(&self) -> Result<Vec<i64>, FetchError> {
        let url = format!("{}/topstories.json", self.base_url);
        let ids: Vec<i64> = self.get_json(&url).await?;
        debug!(count = ids.len(), "fetched top story ids");
        Ok(ids)
    }

    #[instrument(level = "debug", skip(self))]
    async fn story_details(&self, id: i64) -> Result<StoryDetails, FetchError> {
        let url = format!("{}/item/{}.json", self.base_url, id);
        // The detail endpoint returns literal `null` for unknown ids.
        let details: Option<StoryDetails> = self.get_json(&url).await?;
        details.ok_or(FetchError::NotFound { id })
    }
}
