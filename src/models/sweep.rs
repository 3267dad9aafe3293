//! Sweep outcome reporting structures.

use std::fmt;

/// Why a sweep stopped paging.
///
/// All three are successful terminal states; they are kept distinct so a
/// run log shows whether the early-termination shortcut fired or the sweep
/// walked every page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SweepEnd {
    /// An unchanged post was seen; everything after it in recency order is
    /// assumed already captured.
    KnownPost { offset: u64 },

    /// A page yielded zero posts (end of listing, or listing table absent).
    EmptyPage { offset: u64 },

    /// Every page up to the discovered extent was visited.
    Exhausted,
}

impl fmt::Display for SweepEnd {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::KnownPost { offset } => write!(f, "known post at offset {offset}"),
            Self::EmptyPage { offset } => write!(f, "empty page at offset {offset}"),
            Self::Exhausted => write!(f, "all pages visited"),
        }
    }
}

/// Summary of one board sweep.
#[derive(Debug, Clone)]
pub struct SweepReport {
    /// Board display name
    pub board: String,

    /// Pages fetched and processed
    pub pages_processed: usize,

    /// Pages skipped due to fetch/parse faults
    pub pages_skipped: usize,

    /// Posts inserted for the first time
    pub new_posts: usize,

    /// Posts with at least one changed field
    pub updated_posts: usize,

    /// How the sweep terminated
    pub end: SweepEnd,
}

impl SweepReport {
    /// Whether the sweep wrote anything to the snapshot.
    pub fn wrote_anything(&self) -> bool {
        self.new_posts > 0 || self.updated_posts > 0
    }
}
