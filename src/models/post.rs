//! Post data structures.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// One thread entry observed on a board listing page.
///
/// Immutable once parsed; `first_seen` is stamped at observation time and
/// only persisted on the first insert of this id.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Post {
    /// Topic id, the natural key. Stable and never reused by the source.
    pub id: i64,

    /// Canonicalized topic URL carrying only the `topic` query parameter
    pub url: String,

    /// Thread title
    pub title: String,

    /// Thread starter
    pub author: String,

    /// Reply count
    pub replies: i64,

    /// Timestamp of the most recent reply (second precision)
    pub reply_timestamp: NaiveDateTime,

    /// Author of the most recent reply
    pub reply_author: String,

    /// When this observation was made
    pub first_seen: NaiveDateTime,
}

/// Last-known state of a post, as persisted in the snapshot table.
///
/// Only the six comparable columns are carried; `first_seen` and
/// `last_updated` stay in durable storage and never participate in
/// classification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Baseline {
    pub id: i64,
    pub url: String,
    pub title: String,
    pub author: String,
    pub replies: i64,
    pub reply_timestamp: NaiveDateTime,
    pub reply_author: String,
}

impl From<&Post> for Baseline {
    fn from(post: &Post) -> Self {
        Self {
            id: post.id,
            url: post.url.clone(),
            title: post.title.clone(),
            author: post.author.clone(),
            replies: post.replies,
            reply_timestamp: post.reply_timestamp,
            reply_author: post.reply_author.clone(),
        }
    }
}
