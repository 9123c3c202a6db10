//! Command-line interface definitions for hn_digest.
//!
//! All options can be provided via command-line flags or environment
//! variables, and every external collaborator (store, rule files, source
//! API, summarization backend) is an explicit parameter resolved once at
//! startup.

use clap::{Parser, Subcommand};

use crate::{hn, llm};

/// Command-line arguments for the hn_digest pipelines.
///
/// # Examples
///
/// ```sh
/// # One ingestion run against the defaults
/// hn_digest ingest
///
/// # Both pipelines, custom store and a remote backend
/// hn_digest --db-path /var/lib/hn/stories.db --llm-url http://gpubox:11434 run
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// SQLite database the pipelines read and write
    #[arg(long, env = "HN_DIGEST_DB", default_value = "./db/hackernews.db")]
    pub db_path: String,

    /// Blacklist rule files; all sources merge into one matcher
    #[arg(
        long = "blacklist",
        env = "HN_DIGEST_BLACKLIST",
        value_delimiter = ',',
        default_values_t = [
            String::from("config/blacklist.txt"),
            String::from("config/blacklist_urls.txt"),
        ]
    )]
    pub blacklist_files: Vec<String>,

    /// Priority rule file
    #[arg(long, env = "HN_DIGEST_PRIORITY_RULES", default_value = "config/priority.txt")]
    pub priority_rules: String,

    /// Bound on concurrently in-flight story tasks per run
    #[arg(long, env = "HN_DIGEST_WORKERS", default_value_t = 10)]
    pub workers: usize,

    /// Timeout in seconds for source API and article fetches
    #[arg(long, env = "HN_DIGEST_HTTP_TIMEOUT", default_value_t = 10)]
    pub http_timeout_secs: u64,

    /// Base URL of the story source API
    #[arg(long, env = "HN_DIGEST_SOURCE_URL", default_value = hn::DEFAULT_API_BASE)]
    pub source_url: String,

    /// Base URL of the chat summarization backend
    #[arg(long, env = "HN_DIGEST_LLM_URL", default_value = llm::DEFAULT_OLLAMA_URL)]
    pub llm_url: String,

    /// Model requested from the summarization backend
    #[arg(long, env = "HN_DIGEST_LLM_MODEL", default_value = llm::DEFAULT_MODEL)]
    pub llm_model: String,

    /// Timeout in seconds for a single summarization call
    #[arg(long, env = "HN_DIGEST_LLM_TIMEOUT", default_value_t = 120)]
    pub llm_timeout_secs: u64,
}

/// The independently schedulable jobs.
#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Discover new stories, extract article content, and persist them
    Ingest,
    /// Generate summaries for stories that have content but no summary
    Summarize,
    /// Ingest, then summarize, in one invocation
    Run,
}
