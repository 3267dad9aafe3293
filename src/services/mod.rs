// src/services/mod.rs

//! Services for talking to the remote forum.

pub mod listing;

use async_trait::async_trait;

use crate::error::Result;
use crate::models::{Board, Post};

pub use listing::ListingClient;

/// Posts per listing page; page URLs advance in this stride.
pub const PAGE_STRIDE: u64 = 50;

/// Source of listing pages for a board.
///
/// The sweep controller consumes this behind a trait so tests can drive it
/// with scripted pages instead of the live forum.
#[async_trait]
pub trait PageSource: Send + Sync {
    /// Upper bound on post offsets for this board, discovered once per
    /// sweep from the landing page. A stale bound is non-fatal; early
    /// termination is the primary stop condition.
    async fn discover_extent(&self, board: &Board) -> Result<u64>;

    /// Fetch and parse one listing page at the given post offset, in
    /// source order.
    async fn fetch_page(&self, board: &Board, offset: u64) -> Result<Vec<Post>>;
}
