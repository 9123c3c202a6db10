//! Summary generation against a chat-style backend.
//!
//! The backend is an Ollama-compatible service: POST a
//! `{model, messages, stream: false}` payload to `/api/chat` and read the
//! reply from `{message: {content}}`. It is treated as unreliable and
//! possibly absent; every failure surfaces as a [`SummarizeError`] that
//! the pipeline logs and converts to a null summary, leaving the story
//! eligible for retry on the next run. There is no retry within a call.
//!
//! [`Summarize`] is the seam the summarization pipeline is generic over,
//! so tests can substitute a scripted generator.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, instrument};

/// Default backend address when none is configured.
pub const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";

/// Default model requested from the backend.
pub const DEFAULT_MODEL: &str = "llama3.2";

/// Failure modes of a single summarization call.
#[derive(Debug, Error)]
pub enum SummarizeError {
    /// Nothing to summarize; no backend call was made.
    #[error("content is empty; nothing to summarize")]
    NoContent,
    /// The backend answered with a non-success status.
    #[error("summarization backend returned HTTP {0}")]
    Status(u16),
    /// Connection refused, timeout, or any other transport-level error.
    #[error("transport failure: {0}")]
    Transport(#[from] reqwest::Error),
    /// The backend answered 200 with a body that does not parse.
    #[error("malformed backend response: {0}")]
    Malformed(#[from] serde_json::Error),
    /// The backend parsed fine but returned an empty reply.
    #[error("backend returned an empty reply")]
    EmptyReply,
}

/// Text-in/text-out summarization.
pub trait Summarize {
    /// Produce a plain-text summary of `content`.
    async fn summarize(&self, content: &str) -> Result<String, SummarizeError>;
}

/// Client for an Ollama-compatible chat-completion endpoint.
#[derive(Debug, Clone)]
pub struct OllamaClient {
    http: reqwest::Client,
    base_url: String,
    model: String,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    stream: bool,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    content: String,
}

/// Wrap article content in the fixed summarization prompt.
pub fn build_prompt(content: &str) -> String {
    format!("Summarize the following article:\n\n{content}\n\nSummary:")
}

impl OllamaClient {
    /// Build a client for `base_url`, requesting `model` on every call.
    ///
    /// Local models can take a while on long articles, so the timeout here
    /// is configured separately from the article-fetch timeout.
    pub fn new(base_url: &str, model: &str, timeout: Duration) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
        })
    }
}

impl Summarize for OllamaClient {
    #[instrument(level = "debug", skip_all)]
    async fn summarize(&self, content: &str) -> Result<String, SummarizeError> {
        if content.trim().is_empty() {
            return Err(SummarizeError::NoContent);
        }

        let prompt = build_prompt(content);
        let request = ChatRequest {
            model: &self.model,
            messages: vec![ChatMessage {
                role: "user",
                content: &prompt,
            }],
            stream: false,
        };

        let resp = self
            .http
            .post(format!("{}/api/chat", self.base_url))
            .json(&request)
            .send()
            .await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(SummarizeError::Status(status.as_u16()));
        }

        let body = resp.text().await?;
        let parsed: ChatResponse = serde_json::from_str(&body)?;
        let summary = parsed.message.content.trim().to_string();
        if summary.is_empty() {
            return Err(SummarizeError::EmptyReply);
        }
        debug!(model = %self.model, bytes = summary.len(), "summary generated");
        Ok(summary)
    }
}
