//! SQLite-backed story store.
//!
//! One `stories` row per story id. The store exclusively owns persisted
//! state; pipelines hold transient [`Story`] values and discard them after
//! a write. The connection is wrapped in `Arc<Mutex<_>>` so a single
//! handle can be cloned across concurrent worker tasks: each write is a
//! single independent statement and no cross-task coordination is needed
//! beyond the primary-key uniqueness the database already enforces.
//!
//! The schema evolves additively: opening a database created before the
//! `summary` or `priority` columns existed adds them in place, with no
//! downtime and no manual backfill.

use std::collections::HashSet;
use std::fs;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::Utc;
use rusqlite::{Connection, OptionalExtension, params};
use thiserror::Error;
use tracing::{debug, info};

use crate::models::{Priority, Story};

/// Failure modes of a store operation.
#[derive(Debug, Error)]
pub enum StoreError {
    /// An insert hit an id that is already present. Callers treat this as
    /// a logged warning, never as a fatal condition.
    #[error("story {0} already exists in the store")]
    AlreadyExists(i64),
    /// Any other database failure.
    #[error("database failure: {0}")]
    Sqlite(#[from] rusqlite::Error),
    /// The store location could not be prepared.
    #[error("could not prepare store location: {0}")]
    Io(#[from] std::io::Error),
}

/// Cloneable handle to the stories table.
#[derive(Clone)]
pub struct Store {
    conn: Arc<Mutex<Connection>>,
}

impl Store {
    /// Open (creating if needed) the database at `path` and bring its
    /// schema up to date.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(path)?;
        info!(path = %path.display(), "store opened");
        Self::from_connection(conn)
    }

    /// In-memory store for tests.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self, StoreError> {
        init_schema(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn lock(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().expect("store mutex poisoned")
    }

    /// True when a row exists for `id`.
    pub fn exists(&self, id: i64) -> Result<bool, StoreError> {
        let conn = self.lock();
        let mut stmt = conn.prepare("SELECT 1 FROM stories WHERE id = ?1")?;
        Ok(stmt.exists(params![id])?)
    }

    /// All ids currently present, for bulk deduplication before a batch.
    pub fn existing_ids(&self) -> Result<HashSet<i64>, StoreError> {
        let conn = self.lock();
        let mut stmt = conn.prepare("SELECT id FROM stories")?;
        let rows = stmt.query_map([], |row| row.get(0))?;
        let mut ids = HashSet::new();
        for id in rows {
            ids.insert(id?);
        }
        Ok(ids)
    }

    /// Ids and content of stories that are summarizable but not yet
    /// summarized.
    pub fn stories_missing_summary(&self) -> Result<Vec<(i64, String)>, StoreError> {
        let conn = self.lock();
        let mut stmt = conn.prepare(
            "SELECT id, content FROM stories
             WHERE content IS NOT NULL AND length(trim(content)) > 0 AND summary IS NULL",
        )?;
        let rows = stmt.query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?;
        let mut pending = Vec::new();
        for row in rows {
            pending.push(row?);
        }
        Ok(pending)
    }

    /// Insert a complete story row.
    ///
    /// A primary-key violation maps to [`StoreError::AlreadyExists`]; two
    /// racing inserts for the same id leave exactly one row behind.
    pub fn insert(&self, story: &Story) -> Result<(), StoreError> {
        let conn = self.lock();
        let result = conn.execute(
            "INSERT INTO stories (id, title, \"by\", score, url, content, summary, priority, last_updated)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                story.id,
                story.title,
                story.by,
                story.score,
                story.url,
                story.content,
                story.summary,
                story.priority.as_i64(),
                story.last_updated,
            ],
        );
        match result {
            Ok(_) => {
                debug!(id = story.id, "story row inserted");
                Ok(())
            }
            Err(e) if is_unique_violation(&e) => Err(StoreError::AlreadyExists(story.id)),
            Err(e) => Err(e.into()),
        }
    }

    /// Set a story's summary and refresh its `last_updated` stamp.
    pub fn update_summary(&self, id: i64, summary: &str) -> Result<(), StoreError> {
        let conn = self.lock();
        conn.execute(
            "UPDATE stories SET summary = ?1, last_updated = ?2 WHERE id = ?3",
            params![summary, Utc::now(), id],
        )?;
        Ok(())
    }

    /// Read a story back by id.
    pub fn get(&self, id: i64) -> Result<Option<Story>, StoreError> {
        let conn = self.lock();
        let mut stmt = conn.prepare(
            "SELECT id, title, \"by\", score, url, content, summary, priority, last_updated
             FROM stories WHERE id = ?1",
        )?;
        let story = stmt
            .query_row(params![id], |row| {
                Ok(Story {
                    id: row.get(0)?,
                    title: row.get(1)?,
                    by: row.get(2)?,
                    score: row.get(3)?,
                    url: row.get(4)?,
                    content: row.get(5)?,
                    summary: row.get(6)?,
                    priority: row
                        .get::<_, Option<i64>>(7)?
                        .map(Priority::from_i64)
                        .unwrap_or_default(),
                    last_updated: row.get(8)?,
                })
            })
            .optional()?;
        Ok(story)
    }
}

fn is_unique_violation(e: &rusqlite::Error) -> bool {
    matches!(
        e,
        rusqlite::Error::SqliteFailure(err, _)
            if err.code == rusqlite::ErrorCode::ConstraintViolation
    )
}

fn init_schema(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch("PRAGMA journal_mode=WAL;")?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS stories (
            id INTEGER PRIMARY KEY,
            title TEXT,
            \"by\" TEXT,
            score INTEGER,
            url TEXT,
            content TEXT,
            summary TEXT,
            priority INTEGER DEFAULT 0,
            last_updated TEXT
        )",
        [],
    )?;

    // Databases created by earlier revisions predate these columns.
    let columns = column_names(conn)?;
    if !columns.iter().any(|c| c == "summary") {
        conn.execute("ALTER TABLE stories ADD COLUMN summary TEXT", [])?;
    }
    if !columns.iter().any(|c| c == "priority") {
        conn.execute("ALTER TABLE stories ADD COLUMN priority INTEGER DEFAULT 0", [])?;
    }

    Ok(())
}

fn column_names(conn: &Connection) -> Result<Vec<String>, rusqlite::Error> {
    let mut stmt = conn.prepare("PRAGMA table_info(stories)")?;
    let rows = stmt.query_map([], |row| row.get::<_, String>(1))?;
    rows.collect()
}
