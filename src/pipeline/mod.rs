//! Pipeline entry points for watcher operations.
//!
//! - `diff`: classify observed posts against the stored baseline
//! - `sweep`: drive the page-by-page walk and apply the writes

pub mod diff;
pub mod sweep;

pub use diff::{classify, Classification, Field};
pub use sweep::{run_watch, sweep_board, WatchOutcome};
