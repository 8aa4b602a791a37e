//! Registry drop-list retrieval.
//!
//! Internetstiftelsen (IIS) publishes one JSON feed per TLD listing every
//! domain scheduled for release, each with its release date. A fetch
//! downloads every configured feed once and keeps the entries that release
//! inside the requested window of dates.

use crate::error::ScanError;
use crate::protocols::build_http_client;
use crate::types::{DropEntry, ScanConfig};
use async_trait::async_trait;
use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::{debug, info};

/// Source of domains scheduled for release on a date.
#[async_trait]
pub trait DropListSource: Send + Sync {
    /// Fetch the deduplicated domains releasing on `target_date`.
    ///
    /// All-or-nothing: any unreachable or malformed feed fails the whole
    /// fetch with `ScanError::SourceUnavailable`.
    async fn fetch(&self, target_date: NaiveDate) -> Result<Vec<DropEntry>, ScanError>;

    /// Fetch the domains releasing from `start` through `extra_days` days later.
    ///
    /// Entries are deduplicated by name; a name listed on several days keeps
    /// its earliest date. The default asks `fetch` once per day. Sources that
    /// download whole feeds override it to download once.
    async fn fetch_range(
        &self,
        start: NaiveDate,
        extra_days: u32,
    ) -> Result<Vec<DropEntry>, ScanError> {
        let end = window_end(start, extra_days)?;
        let mut unique = BTreeMap::new();
        for date in start.iter_days().take_while(|d| *d <= end) {
            merge_entries(&mut unique, self.fetch(date).await?);
        }
        Ok(unique.into_values().collect())
    }
}

/// Entries of one window together with how many rows each feed listed.
#[derive(Debug, Clone, Default)]
pub struct DropWindow {
    pub entries: Vec<DropEntry>,
    /// (tld, rows in the downloaded feed) in scan order
    pub feed_sizes: Vec<(String, usize)>,
}

/// One raw row of an IIS feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedEntry {
    /// Domain name as published (e.g., "example.se")
    pub name: String,

    /// Release date as published ("YYYY-MM-DD")
    #[serde(default)]
    pub release_at: Option<String>,
}

impl FeedEntry {
    /// Parsed release date, if the feed gave a valid one.
    pub fn release_date(&self) -> Option<NaiveDate> {
        self.release_at
            .as_deref()
            .and_then(|s| NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").ok())
    }
}

#[derive(Debug, Deserialize)]
struct FeedDocument {
    #[serde(default)]
    data: Vec<FeedEntry>,
}

/// Drop-list client for the IIS `.se` / `.nu` feeds.
#[derive(Clone)]
pub struct IisDropList {
    http_client: reqwest::Client,
    /// (tld, feed url) in scan order
    feeds: Vec<(String, String)>,
    timeout: Duration,
}

impl IisDropList {
    /// Create a client for every TLD in `config.tlds`.
    pub fn new(config: &ScanConfig) -> Result<Self, ScanError> {
        let mut feeds = Vec::with_capacity(config.tlds.len());
        for tld in &config.tlds {
            let url = config.feed_url(tld).ok_or_else(|| {
                ScanError::config(format!("No drop-list feed configured for .{}", tld))
            })?;
            feeds.push((tld.to_ascii_lowercase(), url.to_string()));
        }

        Ok(Self {
            http_client: build_http_client(&config.user_agent, config.feed_timeout)?,
            feeds,
            timeout: config.feed_timeout,
        })
    }

    /// TLDs this client fetches, in order.
    pub fn tlds(&self) -> impl Iterator<Item = &str> {
        self.feeds.iter().map(|(tld, _)| tld.as_str())
    }

    /// Download the complete feed for one TLD.
    pub async fn fetch_feed(&self, tld: &str) -> Result<Vec<FeedEntry>, ScanError> {
        let url = self
            .feeds
            .iter()
            .find(|(t, _)| t == tld)
            .map(|(_, url)| url.as_str())
            .ok_or_else(|| ScanError::config(format!("No drop-list feed for .{}", tld)))?;

        debug!(tld, url, "fetching drop list");

        let response = self.http_client.get(url).send().await.map_err(|e| {
            if e.is_timeout() {
                ScanError::source_unavailable(url, format!("timed out after {:?}", self.timeout))
            } else {
                ScanError::source_unavailable(url, format!("request failed: {}", e))
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(ScanError::source_unavailable(
                url,
                format!("server returned HTTP {}", status.as_u16()),
            ));
        }

        let body = response.text().await.map_err(|e| {
            ScanError::source_unavailable(url, format!("failed to read body: {}", e))
        })?;

        parse_feed(&body).map_err(|e| ScanError::source_unavailable(url, e))
    }

    /// Download each feed once and select the window `start ..= start + extra_days`.
    pub async fn fetch_window(
        &self,
        start: NaiveDate,
        extra_days: u32,
    ) -> Result<DropWindow, ScanError> {
        let end = window_end(start, extra_days)?;
        let mut unique = BTreeMap::new();
        let mut feed_sizes = Vec::with_capacity(self.feeds.len());

        for (tld, _) in &self.feeds {
            let feed = self.fetch_feed(tld).await?;
            let before = unique.len();
            merge_entries(&mut unique, select_window(&feed, tld, start, end));
            info!(
                tld = tld.as_str(),
                listed = feed.len(),
                releasing = unique.len() - before,
                "drop list fetched"
            );
            feed_sizes.push((tld.clone(), feed.len()));
        }

        Ok(DropWindow {
            entries: unique.into_values().collect(),
            feed_sizes,
        })
    }
}

#[async_trait]
impl DropListSource for IisDropList {
    async fn fetch(&self, target_date: NaiveDate) -> Result<Vec<DropEntry>, ScanError> {
        self.fetch_range(target_date, 0).await
    }

    async fn fetch_range(
        &self,
        start: NaiveDate,
        extra_days: u32,
    ) -> Result<Vec<DropEntry>, ScanError> {
        Ok(self.fetch_window(start, extra_days).await?.entries)
    }
}

/// Parse a feed body into its rows.
///
/// A JSON object without `data` is an empty feed; anything that is not a
/// JSON object with a `data` array of rows is malformed.
pub fn parse_feed(body: &str) -> Result<Vec<FeedEntry>, String> {
    serde_json::from_str::<FeedDocument>(body)
        .map(|doc| doc.data)
        .map_err(|e| format!("malformed feed: {}", e))
}

/// Keep the rows of one feed that release between `start` and `end`, inclusive.
///
/// Rows with an unparseable date or a name outside `tld` are skipped.
pub fn select_window(
    feed: &[FeedEntry],
    tld: &str,
    start: NaiveDate,
    end: NaiveDate,
) -> Vec<DropEntry> {
    feed.iter()
        .filter_map(|row| {
            let date = row.release_date().filter(|d| (start..=end).contains(d))?;
            match DropEntry::new(&row.name, tld, date) {
                Ok(entry) => Some(entry),
                Err(e) => {
                    debug!(name = row.name.as_str(), error = %e, "skipping feed row");
                    None
                }
            }
        })
        .collect()
}

/// Last date of a window starting at `start`.
fn window_end(start: NaiveDate, extra_days: u32) -> Result<NaiveDate, ScanError> {
    start
        .checked_add_days(Days::new(u64::from(extra_days)))
        .ok_or_else(|| ScanError::config("Lookahead window runs past the calendar"))
}

/// Add `entries` to `unique`, keeping the earliest release date per name.
fn merge_entries(unique: &mut BTreeMap<String, DropEntry>, entries: Vec<DropEntry>) {
    for entry in entries {
        match unique.get(&entry.domain) {
            Some(existing) if existing.release_date <= entry.release_date => {}
            _ => {
                unique.insert(entry.domain.clone(), entry);
            }
        }
    }
}
