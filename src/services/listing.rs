// src/services/listing.rs

//! Listing page client for SMF boards.
//!
//! Fetches board index pages over HTTP and parses the thread table into
//! [`Post`] records. A single malformed row is skipped and logged, never
//! fatal to the page; a missing thread table yields an empty page.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{NaiveDateTime, Utc};
use scraper::{ElementRef, Html, Selector};

use crate::error::{AppError, Result};
use crate::models::{Board, Config, Post};
use crate::services::{PageSource, PAGE_STRIDE};
use crate::utils::http;
use crate::utils::url::canonical_topic;

/// Timestamp format of the lastpost cell, e.g.
/// `Sat, 01 January 2022, 00:00:00`.
const LASTPOST_FORMAT: &str = "%a, %d %B %Y, %H:%M:%S";

/// Pre-parsed CSS selectors for the SMF listing markup.
struct ListingSelectors {
    listing_table: Selector,
    row: Selector,
    subject: Selector,
    sticky: Selector,
    title_span: Selector,
    link: Selector,
    author_line: Selector,
    stats: Selector,
    lastpost: Selector,
    pagelinks: Selector,
}

impl ListingSelectors {
    fn new() -> Result<Self> {
        Ok(Self {
            listing_table: parse_selector("table.table_grid")?,
            row: parse_selector("tr")?,
            subject: parse_selector("td.subject.windowbg2, td.subject.lockedbg2")?,
            sticky: parse_selector("td.subject.stickybg2, td.subject.stickybg")?,
            title_span: parse_selector("span")?,
            link: parse_selector("a[href]")?,
            author_line: parse_selector("p")?,
            stats: parse_selector("td.stats.windowbg, td.stats.lockedbg")?,
            lastpost: parse_selector("td.lastpost.windowbg2, td.lastpost.lockedbg2")?,
            pagelinks: parse_selector("div.pagelinks.floatleft")?,
        })
    }
}

/// HTTP-backed page source for board listings.
pub struct ListingClient {
    config: Arc<Config>,
    client: reqwest::Client,
    selectors: ListingSelectors,
}

impl ListingClient {
    /// Create a new listing client with the given configuration.
    pub fn new(config: Arc<Config>) -> Result<Self> {
        let client = http::create_client(&config.watcher)?;
        Ok(Self {
            config,
            client,
            selectors: ListingSelectors::new()?,
        })
    }

    /// Build the URL for a board page. Offset 0 is the bare listing URL;
    /// later pages append `.{offset}`.
    fn page_url(&self, board: &Board, offset: u64) -> String {
        let base = board.listing_url(&self.config.watcher.listing_url);
        if offset == 0 {
            base
        } else {
            format!("{base}.{offset}")
        }
    }

    async fn fetch(&self, url: &str) -> Result<String> {
        let response = self.client.get(url).send().await?.error_for_status()?;
        Ok(response.text().await?)
    }

    /// Parse a listing page body into posts, in source order.
    fn parse_listing(&self, html: &str, board: &Board) -> Vec<Post> {
        let document = Html::parse_document(html);

        let Some(table) = document.select(&self.selectors.listing_table).next() else {
            log::warn!("Thread table absent on board '{}'", board.name);
            return Vec::new();
        };

        let observed_at = Utc::now().naive_utc();
        let mut posts = Vec::new();

        for row in table.select(&self.selectors.row) {
            // Thread rows carry no class attribute; header and separator
            // rows do.
            if row.value().attr("class").is_some() {
                continue;
            }

            // Pinned rows break the recency ordering the early-termination
            // rule relies on, so they are excluded from classification.
            if row.select(&self.selectors.sticky).next().is_some() {
                log::debug!("Skipping pinned row on board '{}'", board.name);
                continue;
            }

            match self.parse_row(&row, observed_at) {
                Ok(post) => posts.push(post),
                Err(e) => {
                    log::warn!("Skipping malformed row on board '{}': {}", board.name, e);
                }
            }
        }

        posts
    }

    /// Parse one thread row.
    fn parse_row(&self, row: &ElementRef<'_>, observed_at: NaiveDateTime) -> Result<Post> {
        let subject = row
            .select(&self.selectors.subject)
            .next()
            .ok_or_else(|| AppError::parse("listing row", "no subject cell"))?;

        let span = subject
            .select(&self.selectors.title_span)
            .next()
            .ok_or_else(|| AppError::parse("listing row", "no title span"))?;
        let title = normalize_ws(&span.text().collect::<String>());

        let href = span
            .select(&self.selectors.link)
            .next()
            .and_then(|a| a.value().attr("href"))
            .ok_or_else(|| AppError::parse("listing row", "no thread link"))?;
        let (id, url) = canonical_topic(href)?;

        let author_p = subject
            .select(&self.selectors.author_line)
            .next()
            .ok_or_else(|| AppError::parse("listing row", "no author line"))?;
        let author_text = author_p.text().collect::<String>();
        let author_line = author_text.lines().next().unwrap_or("").trim();
        let author = author_line
            .split_once("by")
            .map(|(_, rest)| rest.trim())
            .unwrap_or(author_line)
            .to_string();

        let stats = row
            .select(&self.selectors.stats)
            .next()
            .ok_or_else(|| AppError::parse("listing row", "no stats cell"))?;
        let stats_text = normalize_ws(&stats.text().collect::<String>()).to_lowercase();
        let replies_end = stats_text
            .find("replies")
            .ok_or_else(|| AppError::parse("listing row", "no reply count"))?;
        let replies = stats_text[..replies_end]
            .trim()
            .parse::<i64>()
            .map_err(|e| AppError::parse("listing row", format!("bad reply count: {e}")))?;

        let lastpost = row
            .select(&self.selectors.lastpost)
            .next()
            .ok_or_else(|| AppError::parse("listing row", "no lastpost cell"))?;
        let lastpost_text = normalize_ws(&lastpost.text().collect::<String>());
        let by_index = lastpost_text
            .find("by")
            .ok_or_else(|| AppError::parse("listing row", "no lastpost author"))?;
        let timestamp_str = lastpost_text[..by_index].trim();
        let reply_author = lastpost_text[by_index + 2..].trim().to_string();

        let reply_timestamp = NaiveDateTime::parse_from_str(timestamp_str, LASTPOST_FORMAT)
            .map_err(|e| {
                AppError::parse("listing row", format!("bad timestamp '{timestamp_str}': {e}"))
            })?;

        Ok(Post {
            id,
            url,
            title,
            author,
            replies,
            reply_timestamp,
            reply_author,
            first_seen: observed_at,
        })
    }

    /// Parse the page navigation into an upper bound of post offsets.
    ///
    /// The nav reads like `Pages: [1] 2 3 ... 12 »`; the number before the
    /// trailing arrow is the last page, and pages step by [`PAGE_STRIDE`].
    fn parse_page_extent(&self, html: &str) -> Result<u64> {
        let document = Html::parse_document(html);

        let nav = document
            .select(&self.selectors.pagelinks)
            .next()
            .ok_or_else(|| AppError::parse("page navigation", "pagelinks block absent"))?;

        let text = nav.text().collect::<String>();
        let tokens: Vec<&str> = text.split_whitespace().collect();

        let arrow = tokens
            .iter()
            .position(|t| *t == "»")
            .ok_or_else(|| AppError::parse("page navigation", "no trailing page marker"))?;

        let last_page = arrow
            .checked_sub(1)
            .and_then(|i| tokens.get(i))
            .and_then(|t| t.parse::<u64>().ok())
            .ok_or_else(|| AppError::parse("page navigation", "no page number before marker"))?;

        Ok(last_page * PAGE_STRIDE)
    }
}

#[async_trait]
impl PageSource for ListingClient {
    async fn discover_extent(&self, board: &Board) -> Result<u64> {
        let html = self.fetch(&self.page_url(board, 0)).await?;
        self.parse_page_extent(&html)
    }

    async fn fetch_page(&self, board: &Board, offset: u64) -> Result<Vec<Post>> {
        let html = self.fetch(&self.page_url(board, offset)).await?;
        Ok(self.parse_listing(&html, board))
    }
}

fn parse_selector(s: &str) -> Result<Selector> {
    Selector::parse(s).map_err(|e| AppError::selector(s, format!("{e:?}")))
}

fn normalize_ws(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}
