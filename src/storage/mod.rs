// src/storage/mod.rs

//! Durable snapshot storage for board listings.
//!
//! One `BoardStore` session per board per sweep. On open the whole table is
//! bulk-loaded into an in-memory working copy, which is the single read
//! source for classification during the sweep; the copy is discarded when
//! the session drops. Writes go to SQLite first (autocommit, so committed
//! before the call returns) and only then to the working copy, so a crash
//! mid-write can never leave the cache ahead of disk.

use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use chrono::NaiveDateTime;
use rusqlite::{params, params_from_iter, Connection, ToSql};

use crate::error::{AppError, Result};
use crate::models::{Baseline, Post};
use crate::pipeline::diff::{Classification, Field};

/// Whether a name is a bare SQL identifier safe to splice into a statement.
///
/// Table names come from configuration, not query parameters, so they are
/// interpolated verbatim and must be restricted here.
pub fn is_sql_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Snapshot store session for one board's table.
pub struct BoardStore {
    conn: Connection,
    table: String,
    cache: HashMap<i64, Baseline>,
}

impl BoardStore {
    /// Open (creating if missing) the snapshot table at `path` and load the
    /// working copy.
    pub fn open(path: impl AsRef<Path>, table: &str) -> Result<Self> {
        Self::init(Connection::open(path)?, table)
    }

    /// In-memory store, destroyed when the session drops. Used by tests and
    /// kept out of `#[cfg(test)]` so integration callers can use it too.
    pub fn open_in_memory(table: &str) -> Result<Self> {
        Self::init(Connection::open_in_memory()?, table)
    }

    fn init(conn: Connection, table: &str) -> Result<Self> {
        if !is_sql_identifier(table) {
            return Err(AppError::config(format!("invalid table name '{table}'")));
        }

        // Independent board sweeps may share the database file.
        conn.busy_timeout(Duration::from_millis(1500))?;

        conn.execute_batch(&format!(
            "CREATE TABLE IF NOT EXISTS {table} (
                id INTEGER PRIMARY KEY NOT NULL,
                url TEXT NOT NULL,
                title TEXT NOT NULL,
                author TEXT NOT NULL,
                replies INTEGER DEFAULT 0,
                reply_timestamp DATETIME,
                reply_author TEXT,
                first_seen DATETIME,
                last_updated DATETIME DEFAULT CURRENT_TIMESTAMP,
                read_by_scan BOOLEAN DEFAULT 0
            );"
        ))?;

        let mut store = Self {
            conn,
            table: table.to_string(),
            cache: HashMap::new(),
        };
        store.cache = store.load_all()?;
        Ok(store)
    }

    /// Bulk-load every baseline row into a map keyed by id.
    fn load_all(&self) -> Result<HashMap<i64, Baseline>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT id, url, title, author, replies, reply_timestamp, reply_author FROM {}",
            self.table
        ))?;

        let rows = stmt.query_map([], |row| {
            Ok(Baseline {
                id: row.get(0)?,
                url: row.get(1)?,
                title: row.get(2)?,
                author: row.get(3)?,
                replies: row.get(4)?,
                reply_timestamp: row.get(5)?,
                reply_author: row.get(6)?,
            })
        })?;

        let mut cache = HashMap::new();
        for row in rows {
            let baseline = row?;
            cache.insert(baseline.id, baseline);
        }
        Ok(cache)
    }

    /// Look up the baseline for an id in the working copy.
    ///
    /// `None` means the id has never been seen; that is the expected case
    /// for a new post, not an error.
    pub fn baseline(&self, id: i64) -> Option<&Baseline> {
        self.cache.get(&id)
    }

    /// Number of baseline rows in the working copy.
    pub fn len(&self) -> usize {
        self.cache.len()
    }

    /// Whether the snapshot has no rows yet.
    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }

    /// Apply the write implied by a classification.
    ///
    /// `New` inserts the full row including `first_seen`; `Changed` updates
    /// only the differing columns plus `last_updated` in one statement;
    /// `Unchanged` touches nothing.
    pub fn apply(&mut self, post: &Post, classification: &Classification) -> Result<()> {
        match classification {
            Classification::Unchanged => Ok(()),
            Classification::New => self.insert(post),
            Classification::Changed(fields) => self.update(post, fields),
        }
    }

    fn insert(&mut self, post: &Post) -> Result<()> {
        self.conn.execute(
            &format!(
                "INSERT INTO {}
                    (id, url, title, author, replies, reply_timestamp, reply_author, first_seen)
                    VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                self.table
            ),
            params![
                post.id,
                post.url,
                post.title,
                post.author,
                post.replies,
                post.reply_timestamp,
                post.reply_author,
                post.first_seen,
            ],
        )?;

        self.cache.insert(post.id, Baseline::from(post));
        Ok(())
    }

    fn update(&mut self, post: &Post, fields: &[Field]) -> Result<()> {
        let mut assignments: Vec<String> = Vec::with_capacity(fields.len() + 1);
        let mut values: Vec<&dyn ToSql> = Vec::with_capacity(fields.len() + 1);

        for (i, field) in fields.iter().enumerate() {
            assignments.push(format!("{} = ?{}", field.column(), i + 1));
            values.push(field_value(*field, post));
        }
        assignments.push("last_updated = CURRENT_TIMESTAMP".to_string());
        values.push(&post.id);

        let sql = format!(
            "UPDATE {} SET {} WHERE id = ?{}",
            self.table,
            assignments.join(", "),
            fields.len() + 1
        );
        self.conn.execute(&sql, params_from_iter(values))?;

        // Durable write succeeded; now mirror exactly those fields.
        if let Some(entry) = self.cache.get_mut(&post.id) {
            for field in fields {
                match field {
                    Field::Url => entry.url = post.url.clone(),
                    Field::Title => entry.title = post.title.clone(),
                    Field::Author => entry.author = post.author.clone(),
                    Field::Replies => entry.replies = post.replies,
                    Field::ReplyTimestamp => entry.reply_timestamp = post.reply_timestamp,
                    Field::ReplyAuthor => entry.reply_author = post.reply_author.clone(),
                }
            }
        }
        Ok(())
    }

    /// Read `first_seen` and `last_updated` straight from durable storage.
    ///
    /// Bypasses the working copy; used for reporting and invariant checks.
    pub fn row_timestamps(&self, id: i64) -> Result<Option<(NaiveDateTime, NaiveDateTime)>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT first_seen, last_updated FROM {} WHERE id = ?1",
            self.table
        ))?;
        let mut rows = stmt.query(params![id])?;
        match rows.next()? {
            Some(row) => Ok(Some((row.get(0)?, row.get(1)?))),
            None => Ok(None),
        }
    }
}

fn field_value(field: Field, post: &Post) -> &dyn ToSql {
    match field {
        Field::Url => &post.url,
        Field::Title => &post.title,
        Field::Author => &post.author,
        Field::Replies => &post.replies,
        Field::ReplyTimestamp => &post.reply_timestamp,
        Field::ReplyAuthor => &post.reply_author,
    }
}
