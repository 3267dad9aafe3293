// src/pipeline/sweep.rs

//! Sweep controller: the page-by-page walk over a board listing.
//!
//! Pages are visited strictly in order because the stop rule depends on it:
//! the listing is most-recent-activity-first, so the first unchanged post
//! proves everything after it is already captured. A failed page is skipped,
//! never fatal; a storage failure aborts the sweep.

use std::sync::Arc;
use std::time::Duration;

use futures::stream::{self, StreamExt};

use crate::error::Result;
use crate::models::{Board, Config, SweepEnd, SweepReport};
use crate::pipeline::diff::{classify, Classification};
use crate::services::{ListingClient, PageSource, PAGE_STRIDE};
use crate::storage::BoardStore;

/// Outcome of sweeping all configured boards.
#[derive(Debug, Default)]
pub struct WatchOutcome {
    pub reports: Vec<SweepReport>,
    pub failed_boards: usize,
}

/// Sweep one board: walk its pages in order, classify every post against
/// the baseline, and stop at the first already-known post.
pub async fn sweep_board(
    source: &dyn PageSource,
    store: &mut BoardStore,
    board: &Board,
    pacing: Duration,
) -> Result<SweepReport> {
    let extent = source.discover_extent(board).await?;
    log::info!(
        "Sweeping board '{}' up to offset {} ({} posts in baseline)",
        board.name,
        extent,
        store.len()
    );

    let mut report = SweepReport {
        board: board.name.clone(),
        pages_processed: 0,
        pages_skipped: 0,
        new_posts: 0,
        updated_posts: 0,
        end: SweepEnd::Exhausted,
    };

    let mut first_page = true;
    'pages: for offset in (0..extent).step_by(PAGE_STRIDE as usize) {
        // Pacing between requests, skipped before the first page.
        if !first_page {
            tokio::time::sleep(pacing).await;
        }
        first_page = false;

        let posts = match source.fetch_page(board, offset).await {
            Ok(posts) => posts,
            Err(e) if !e.is_fatal() => {
                log::warn!(
                    "Skipping page at offset {} on board '{}': {}",
                    offset,
                    board.name,
                    e
                );
                report.pages_skipped += 1;
                continue;
            }
            Err(e) => return Err(e),
        };

        if posts.is_empty() {
            log::info!(
                "Board '{}': empty page at offset {}, stopping",
                board.name,
                offset
            );
            report.end = SweepEnd::EmptyPage { offset };
            break;
        }

        report.pages_processed += 1;

        for post in &posts {
            let classification = classify(store.baseline(post.id), post);
            store.apply(post, &classification)?;

            match classification {
                Classification::New => report.new_posts += 1,
                Classification::Changed(_) => report.updated_posts += 1,
                Classification::Unchanged => {
                    log::info!(
                        "Board '{}': post {} unchanged at offset {}, stopping",
                        board.name,
                        post.id,
                        offset
                    );
                    report.end = SweepEnd::KnownPost { offset };
                    break 'pages;
                }
            }
        }
    }

    Ok(report)
}

/// Run sweeps for all boards, bounded by the configured concurrency.
///
/// Boards share no mutable state; each sweep owns its store session for its
/// whole duration. A failed board is logged and counted, not fatal to the
/// others.
pub async fn run_watch(config: &Config, boards: &[Board]) -> Result<WatchOutcome> {
    let client = ListingClient::new(Arc::new(config.clone()))?;
    let pacing = Duration::from_secs(config.watcher.page_delay_secs);
    let concurrency = config.watcher.max_concurrent_boards.max(1);

    let mut jobs = stream::iter(boards)
        .map(|board| {
            let client = &client;
            async move { (board, sweep_one(client, config, board, pacing).await) }
        })
        .buffer_unordered(concurrency);

    let mut outcome = WatchOutcome::default();
    while let Some((board, result)) = jobs.next().await {
        match result {
            Ok(report) => {
                log::info!(
                    "Board '{}': {} new, {} updated, {} pages ({} skipped), ended by {}",
                    report.board,
                    report.new_posts,
                    report.updated_posts,
                    report.pages_processed,
                    report.pages_skipped,
                    report.end
                );
                outcome.reports.push(report);
            }
            Err(e) => {
                log::error!("Sweep failed for board '{}': {}", board.name, e);
                outcome.failed_boards += 1;
            }
        }
    }

    Ok(outcome)
}

async fn sweep_one(
    source: &ListingClient,
    config: &Config,
    board: &Board,
    pacing: Duration,
) -> Result<SweepReport> {
    let mut store = BoardStore::open(&config.watcher.database_path, &board.table)?;
    sweep_board(source, &mut store, board, pacing).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use chrono::NaiveDate;

    use crate::error::AppError;
    use crate::models::Post;

    fn make_post(id: i64, replies: i64) -> Post {
        Post {
            id,
            url: format!("https://geekhack.org/index.php?topic={id}"),
            title: format!("Thread {id}"),
            author: "author".to_string(),
            replies,
            reply_timestamp: NaiveDate::from_ymd_opt(2022, 1, 1)
                .unwrap()
                .and_hms_opt(0, 0, 0)
                .unwrap(),
            reply_author: "replier".to_string(),
            first_seen: NaiveDate::from_ymd_opt(2022, 1, 1)
                .unwrap()
                .and_hms_opt(0, 0, 0)
                .unwrap(),
        }
    }

    fn test_board() -> Board {
        Board {
            name: "Test Board".to_string(),
            board: 1,
            table: "test_board".to_string(),
        }
    }

    /// A page is either a parsed post list or a simulated fetch fault.
    enum Page {
        Posts(Vec<Post>),
        Fault,
    }

    /// Scripted page source recording which offsets were fetched.
    struct ScriptedSource {
        extent: u64,
        pages: HashMap<u64, Page>,
        fetched: Mutex<Vec<u64>>,
    }

    impl ScriptedSource {
        fn new(extent: u64, pages: Vec<(u64, Page)>) -> Self {
            Self {
                extent,
                pages: pages.into_iter().collect(),
                fetched: Mutex::new(Vec::new()),
            }
        }

        fn fetched(&self) -> Vec<u64> {
            self.fetched.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl PageSource for ScriptedSource {
        async fn discover_extent(&self, _board: &Board) -> Result<u64> {
            Ok(self.extent)
        }

        async fn fetch_page(&self, _board: &Board, offset: u64) -> Result<Vec<Post>> {
            self.fetched.lock().unwrap().push(offset);
            match self.pages.get(&offset) {
                Some(Page::Posts(posts)) => Ok(posts.clone()),
                Some(Page::Fault) => Err(AppError::parse("fetch", "scripted fault")),
                None => Ok(Vec::new()),
            }
        }
    }

    #[tokio::test]
    async fn test_first_sweep_inserts_everything() {
        let source = ScriptedSource::new(
            100,
            vec![
                (0, Page::Posts(vec![make_post(3, 5), make_post(2, 1)])),
                (50, Page::Posts(vec![make_post(1, 0)])),
            ],
        );
        let mut store = BoardStore::open_in_memory("test_board").unwrap();

        let report = sweep_board(&source, &mut store, &test_board(), Duration::ZERO)
            .await
            .unwrap();

        assert_eq!(report.new_posts, 3);
        assert_eq!(report.updated_posts, 0);
        assert_eq!(report.end, SweepEnd::Exhausted);
        assert_eq!(store.len(), 3);
    }

    #[tokio::test]
    async fn test_second_sweep_is_idempotent() {
        let pages = || {
            vec![
                (0, Page::Posts(vec![make_post(3, 5), make_post(2, 1)])),
                (50, Page::Posts(vec![make_post(1, 0)])),
            ]
        };
        let mut store = BoardStore::open_in_memory("test_board").unwrap();

        let first = ScriptedSource::new(100, pages());
        sweep_board(&first, &mut store, &test_board(), Duration::ZERO)
            .await
            .unwrap();

        let second = ScriptedSource::new(100, pages());
        let report = sweep_board(&second, &mut store, &test_board(), Duration::ZERO)
            .await
            .unwrap();

        // Nothing changed remotely, so the very first post stops the sweep
        // on page 0 with zero writes.
        assert!(!report.wrote_anything());
        assert_eq!(report.end, SweepEnd::KnownPost { offset: 0 });
        assert_eq!(second.fetched(), vec![0]);
    }

    #[tokio::test]
    async fn test_early_termination_mid_page() {
        let known = make_post(10, 4);
        let straggler = make_post(9, 2);

        let mut store = BoardStore::open_in_memory("test_board").unwrap();
        store.apply(&known, &Classification::New).unwrap();

        let source = ScriptedSource::new(
            200,
            vec![
                (0, Page::Posts(vec![make_post(30, 0), make_post(29, 0)])),
                (50, Page::Posts(vec![make_post(28, 0)])),
                (100, Page::Posts(vec![known.clone(), straggler.clone()])),
                (150, Page::Posts(vec![make_post(5, 0)])),
            ],
        );

        let report = sweep_board(&source, &mut store, &test_board(), Duration::ZERO)
            .await
            .unwrap();

        assert_eq!(report.end, SweepEnd::KnownPost { offset: 100 });
        assert_eq!(report.new_posts, 3);
        // The page with the known post is the last one fetched; page 150 is
        // never requested, and the post after the known one on page 100 is
        // never classified.
        assert_eq!(source.fetched(), vec![0, 50, 100]);
        assert!(store.baseline(straggler.id).is_none());
    }

    #[tokio::test]
    async fn test_page_fault_is_isolated() {
        let source = ScriptedSource::new(
            150,
            vec![
                (0, Page::Posts(vec![make_post(20, 0)])),
                (50, Page::Fault),
                (100, Page::Posts(vec![make_post(18, 0)])),
            ],
        );
        let mut store = BoardStore::open_in_memory("test_board").unwrap();

        let report = sweep_board(&source, &mut store, &test_board(), Duration::ZERO)
            .await
            .unwrap();

        assert_eq!(report.pages_skipped, 1);
        assert_eq!(report.pages_processed, 2);
        assert_eq!(report.new_posts, 2);
        assert_eq!(report.end, SweepEnd::Exhausted);
        assert!(store.baseline(20).is_some());
        assert!(store.baseline(18).is_some());
    }

    #[tokio::test]
    async fn test_empty_page_stops_the_sweep() {
        let source = ScriptedSource::new(
            200,
            vec![(0, Page::Posts(vec![make_post(7, 0)]))],
            // Offsets 50+ are unscripted and come back empty.
        );
        let mut store = BoardStore::open_in_memory("test_board").unwrap();

        let report = sweep_board(&source, &mut store, &test_board(), Duration::ZERO)
            .await
            .unwrap();

        assert_eq!(report.end, SweepEnd::EmptyPage { offset: 50 });
        assert_eq!(source.fetched(), vec![0, 50]);
    }

    #[tokio::test]
    async fn test_updated_post_is_written_and_sweep_continues() {
        let mut original = make_post(40, 3);
        let mut store = BoardStore::open_in_memory("test_board").unwrap();
        store.apply(&original, &Classification::New).unwrap();

        original.replies = 8;
        original.reply_author = "latest".to_string();

        let source = ScriptedSource::new(
            100,
            vec![
                (0, Page::Posts(vec![original.clone(), make_post(41, 0)])),
                (50, Page::Posts(vec![make_post(39, 0)])),
            ],
        );

        let report = sweep_board(&source, &mut store, &test_board(), Duration::ZERO)
            .await
            .unwrap();

        // A changed post does not stop the sweep; only an unchanged one does.
        assert_eq!(report.updated_posts, 1);
        assert_eq!(report.new_posts, 2);
        assert_eq!(report.end, SweepEnd::Exhausted);
        assert_eq!(store.baseline(40).unwrap().replies, 8);
    }
}
