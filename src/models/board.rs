//! Board definitions.

use serde::{Deserialize, Serialize};

/// A forum board being watched.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Board {
    /// Display name (e.g., "Interest Checks")
    pub name: String,

    /// SMF board id in the listing URL
    pub board: u32,

    /// Destination table for this board's snapshot
    pub table: String,
}

impl Board {
    /// Build the listing URL for this board from the configured template.
    pub fn listing_url(&self, template: &str) -> String {
        template.replace("{board}", &self.board.to_string())
    }
}
