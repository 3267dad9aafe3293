// src/models/mod.rs

//! Domain models for the watcher application.

mod board;
mod config;
mod post;
mod sweep;

// Re-export all public types
pub use board::Board;
pub use config::{Config, WatcherConfig};
pub use post::{Baseline, Post};
pub use sweep::{SweepEnd, SweepReport};
