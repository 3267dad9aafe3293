//! Application configuration structures.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::models::Board;

/// Root application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// HTTP and sweep behavior settings
    #[serde(default)]
    pub watcher: WatcherConfig,

    /// Boards to watch
    #[serde(default = "defaults::boards")]
    pub boards: Vec<Board>,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Load configuration or return default if loading fails.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        Self::load(&path).unwrap_or_else(|e| {
            log::warn!(
                "Config load failed from {:?}: {}. Using defaults.",
                path.as_ref(),
                e
            );
            Self::default()
        })
    }

    /// Validate configuration values for basic sanity.
    pub fn validate(&self) -> Result<()> {
        if self.watcher.user_agent.trim().is_empty() {
            return Err(AppError::config("watcher.user_agent is empty"));
        }
        if self.watcher.timeout_secs == 0 {
            return Err(AppError::config("watcher.timeout_secs must be > 0"));
        }
        if self.watcher.max_concurrent_boards == 0 {
            return Err(AppError::config("watcher.max_concurrent_boards must be > 0"));
        }
        if !self.watcher.listing_url.contains("{board}") {
            return Err(AppError::config(
                "watcher.listing_url must contain a {board} placeholder",
            ));
        }
        if self.boards.is_empty() {
            return Err(AppError::config("No boards defined"));
        }
        for board in &self.boards {
            if !crate::storage::is_sql_identifier(&board.table) {
                return Err(AppError::config(format!(
                    "Board '{}' has an invalid table name '{}'",
                    board.name, board.table
                )));
            }
        }
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            watcher: WatcherConfig::default(),
            boards: defaults::boards(),
        }
    }
}

/// HTTP client and sweep behavior settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatcherConfig {
    /// User-Agent header for HTTP requests
    #[serde(default = "defaults::user_agent")]
    pub user_agent: String,

    /// Request timeout in seconds
    #[serde(default = "defaults::timeout")]
    pub timeout_secs: u64,

    /// Pacing delay between listing pages in seconds
    #[serde(default = "defaults::page_delay")]
    pub page_delay_secs: u64,

    /// Maximum boards swept concurrently
    #[serde(default = "defaults::max_concurrent_boards")]
    pub max_concurrent_boards: usize,

    /// Path to the SQLite snapshot database
    #[serde(default = "defaults::database_path")]
    pub database_path: String,

    /// Board listing URL template with a `{board}` placeholder
    #[serde(default = "defaults::listing_url")]
    pub listing_url: String,
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self {
            user_agent: defaults::user_agent(),
            timeout_secs: defaults::timeout(),
            page_delay_secs: defaults::page_delay(),
            max_concurrent_boards: defaults::max_concurrent_boards(),
            database_path: defaults::database_path(),
            listing_url: defaults::listing_url(),
        }
    }
}

mod defaults {
    use crate::models::Board;

    pub fn user_agent() -> String {
        "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36".into()
    }
    pub fn timeout() -> u64 {
        30
    }
    pub fn page_delay() -> u64 {
        3
    }
    pub fn max_concurrent_boards() -> usize {
        2
    }
    pub fn database_path() -> String {
        "hackwatch.db".into()
    }
    pub fn listing_url() -> String {
        "https://geekhack.org/index.php?board={board}".into()
    }

    pub fn boards() -> Vec<Board> {
        vec![
            Board {
                name: "Group Buys and Preorders".into(),
                board: 70,
                table: "group_buys".into(),
            },
            Board {
                name: "Interest Checks".into(),
                board: 132,
                table: "interest_checks".into(),
            },
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_table() {
        let mut config = Config::default();
        config.boards[0].table = "bad name".into();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_missing_placeholder() {
        let mut config = Config::default();
        config.watcher.listing_url = "https://geekhack.org/index.php".into();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_parse_minimal_toml() {
        let config: Config = toml::from_str(
            r#"
            [watcher]
            page_delay_secs = 1

            [[boards]]
            name = "Making Stuff Together"
            board = 19
            table = "making_stuff"
            "#,
        )
        .unwrap();

        assert_eq!(config.watcher.page_delay_secs, 1);
        assert_eq!(config.watcher.timeout_secs, 30);
        assert_eq!(config.boards.len(), 1);
        assert_eq!(config.boards[0].board, 19);
    }
}
