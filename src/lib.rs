//! # hn_digest
//!
//! A Hacker News ingestion and summarization pipeline that fetches
//! trending stories, extracts readable article text from their links,
//! classifies each story against operator-supplied rules, and generates
//! AI summaries into a local SQLite snapshot.
//!
//! ## Architecture
//!
//! Two independently schedulable pipelines share a rule engine and a
//! store:
//!
//! 1. **Ingestion** ([`ingest`]): discover candidate ids, drop the ones
//!    already stored, then concurrently (bounded, 10 workers by default)
//!    fetch details, apply the blacklist, classify priority, extract
//!    article content, and persist one row per story.
//! 2. **Summarization** ([`summarize`]): find stored stories with content
//!    but no summary and concurrently generate and persist summaries via
//!    an Ollama-compatible chat backend.
//!
//! Failures from the unreliable third parties involved (the source API,
//! arbitrary article hosts, the summarization backend) are confined to
//! the story they hit; only a failure to obtain the candidate id list
//! aborts a run.

pub mod cli;
pub mod extract;
pub mod hn;
pub mod ingest;
pub mod llm;
pub mod models;
pub mod rules;
pub mod store;
pub mod summarize;
pub mod utils;
