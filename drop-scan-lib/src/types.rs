//! Core data types for drop-list scanning.
//!
//! This module defines the per-domain record produced by a scan, the raw
//! drop-list entry it starts from, the index-check result, and the scan
//! configuration value passed to every component.

use crate::error::ScanError;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

/// IIS feed of `.se` domains scheduled for release.
pub const IIS_SE_URL: &str = "https://data.internetstiftelsen.se/bardate_domains.json";

/// IIS feed of `.nu` domains scheduled for release.
pub const IIS_NU_URL: &str = "https://data.internetstiftelsen.se/bardate_domains_nu.json";

/// Internet Archive CDX endpoint.
pub const WAYBACK_CDX_URL: &str = "http://web.archive.org/cdx/search/cdx";

/// Common Crawl index server.
pub const COMMONCRAWL_INDEX_URL: &str = "https://index.commoncrawl.org";

pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// A domain scheduled for release, as listed by the registry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DropEntry {
    /// Fully qualified, lowercase domain name (e.g., "example.se")
    pub domain: String,

    /// TLD the entry was listed under (e.g., "se")
    pub tld: String,

    /// Date the registry releases the domain
    pub release_date: NaiveDate,
}

impl DropEntry {
    /// Create an entry, normalizing the name and checking it belongs to `tld`.
    pub fn new(domain: &str, tld: &str, release_date: NaiveDate) -> Result<Self, ScanError> {
        let domain = domain.trim().trim_end_matches('.').to_ascii_lowercase();
        let tld = tld.trim().trim_start_matches('.').to_ascii_lowercase();

        crate::utils::validate_domain(&domain)?;
        if !crate::utils::belongs_to_tld(&domain, &tld) {
            return Err(ScanError::invalid_domain(
                &domain,
                format!("not under .{}", tld),
            ));
        }

        Ok(Self {
            domain,
            tld,
            release_date,
        })
    }
}

/// Outcome of checking a domain against the index engines.
///
/// `indexed` is three-valued: `Some(true)` when an engine found pages,
/// `Some(false)` when at least one engine answered and none found pages,
/// `None` when every engine failed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexResult {
    pub indexed: Option<bool>,
    pub estimated_pages: Option<u64>,
    pub source: Option<String>,
}

impl IndexResult {
    /// No engine produced an answer.
    pub fn unknown() -> Self {
        Self::default()
    }

    /// At least one engine answered and none found pages.
    pub fn not_indexed() -> Self {
        Self {
            indexed: Some(false),
            estimated_pages: None,
            source: None,
        }
    }

    /// `pages` results found by `source`.
    pub fn indexed<S: Into<String>>(pages: u64, source: S) -> Self {
        Self {
            indexed: Some(true),
            estimated_pages: Some(pages),
            source: Some(source.into()),
        }
    }
}

/// Result of scanning one domain.
///
/// Filled progressively during one pipeline pass and never changed after
/// it has been assembled. Report files are its only durable form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomainRecord {
    /// The domain name (e.g., "example.se")
    pub domain: String,

    /// Top-level domain suffix (e.g., "se")
    pub tld: String,

    /// Scheduled release date
    pub release_date: NaiveDate,

    /// Whether the domain is unregistered right now.
    /// - `Some(true)`: DNS says the name does not exist
    /// - `Some(false)`: the name resolves
    /// - `None`: not checked, or the lookup failed
    pub available: Option<bool>,

    /// Whether an index engine has pages for the domain (`None` if unknown)
    pub indexed: Option<bool>,

    /// Largest page count reported by an engine; only set when indexed
    pub estimated_pages: Option<u64>,

    /// Engine that reported `estimated_pages`
    pub index_source: Option<String>,

    /// When this record was computed
    pub checked_at: DateTime<Utc>,
}

impl DomainRecord {
    /// Assemble a record from a drop entry and the results of its checks.
    ///
    /// A page count or source without `indexed == Some(true)` is dropped.
    pub fn assemble(
        entry: &DropEntry,
        available: Option<bool>,
        index: Option<IndexResult>,
        checked_at: DateTime<Utc>,
    ) -> Self {
        let index = index.unwrap_or_default();
        let (estimated_pages, index_source) = if index.indexed == Some(true) {
            (index.estimated_pages, index.source)
        } else {
            (None, None)
        };

        Self {
            domain: entry.domain.clone(),
            tld: entry.tld.clone(),
            release_date: entry.release_date,
            available,
            indexed: index.indexed,
            estimated_pages,
            index_source,
            checked_at,
        }
    }

    /// Check the record invariants.
    pub fn validate(&self) -> Result<(), ScanError> {
        if self.domain.is_empty() {
            return Err(ScanError::invalid_record(&self.domain, "empty domain"));
        }
        if self.tld.is_empty() || !crate::utils::belongs_to_tld(&self.domain, &self.tld) {
            return Err(ScanError::invalid_record(
                &self.domain,
                format!("domain does not end with .{}", self.tld),
            ));
        }
        if self.indexed != Some(true) && self.estimated_pages.is_some() {
            return Err(ScanError::invalid_record(
                &self.domain,
                "estimated_pages set on a record that is not indexed",
            ));
        }
        Ok(())
    }

    /// Indexed with at least `min_pages` pages.
    pub fn meets_index_threshold(&self, min_pages: u64) -> bool {
        self.indexed == Some(true) && self.estimated_pages.is_some_and(|p| p >= min_pages)
    }
}

/// Configuration shared by every scan component.
///
/// Built once (defaults, then config files, environment and CLI flags) and
/// handed to each component's constructor.
#[derive(Debug, Clone)]
pub struct ScanConfig {
    /// TLDs whose drop lists are fetched
    /// Default: ["se", "nu"]
    pub tlds: Vec<String>,

    /// Drop-list feed URL per TLD
    pub feed_urls: HashMap<String, String>,

    /// User-Agent header for every HTTP request
    pub user_agent: String,

    /// Timeout for fetching one drop-list feed
    /// Default: 30 seconds
    pub feed_timeout: Duration,

    /// Timeout for the DNS availability lookup
    /// Default: 3 seconds
    pub dns_timeout: Duration,

    /// Pause between successive calls to the same index engine
    /// Default: 2.5 seconds
    pub index_delay: Duration,

    /// Timeout for one index engine request
    /// Default: 20 seconds
    pub index_timeout: Duration,

    /// Index engines to query, in order
    /// Default: ["wayback"]
    pub engines: Vec<String>,

    /// Internet Archive CDX endpoint
    pub wayback_url: String,

    /// Max rows requested from a CDX endpoint
    /// Default: 500
    pub wayback_limit: u32,

    /// Common Crawl index server
    pub commoncrawl_url: String,

    /// Common Crawl collection (e.g., "CC-MAIN-2025-33")
    pub commoncrawl_collection: String,

    /// Minimum indexed pages for a domain to survive "only indexed" filtering
    /// Default: 1
    pub min_indexed_pages: u64,

    /// Directory reports are written to
    /// Default: "reports"
    pub report_dir: PathBuf,
}

/// Names of the index engines this build knows about.
pub fn known_engines() -> Vec<&'static str> {
    let mut engines = vec!["wayback"];
    #[cfg(feature = "commoncrawl")]
    engines.push("commoncrawl");
    engines
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            tlds: vec!["se".to_string(), "nu".to_string()],
            feed_urls: HashMap::from([
                ("se".to_string(), IIS_SE_URL.to_string()),
                ("nu".to_string(), IIS_NU_URL.to_string()),
            ]),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            feed_timeout: Duration::from_secs(30),
            dns_timeout: Duration::from_secs(3),
            index_delay: Duration::from_millis(2500),
            index_timeout: Duration::from_secs(20),
            engines: vec!["wayback".to_string()],
            wayback_url: WAYBACK_CDX_URL.to_string(),
            wayback_limit: 500,
            commoncrawl_url: COMMONCRAWL_INDEX_URL.to_string(),
            commoncrawl_collection: "CC-MAIN-2025-33".to_string(),
            min_indexed_pages: 1,
            report_dir: PathBuf::from("reports"),
        }
    }
}

impl ScanConfig {
    /// Set the TLDs to scan.
    pub fn with_tlds(mut self, tlds: Vec<String>) -> Self {
        self.tlds = tlds;
        self
    }

    /// Override the feed URL of one TLD.
    pub fn with_feed_url<T: Into<String>, U: Into<String>>(mut self, tld: T, url: U) -> Self {
        self.feed_urls.insert(tld.into(), url.into());
        self
    }

    /// Set the delay between calls to the same index engine.
    pub fn with_index_delay(mut self, delay: Duration) -> Self {
        self.index_delay = delay;
        self
    }

    /// Set the DNS lookup timeout.
    pub fn with_dns_timeout(mut self, timeout: Duration) -> Self {
        self.dns_timeout = timeout;
        self
    }

    /// Set the index engines to query.
    pub fn with_engines(mut self, engines: Vec<String>) -> Self {
        self.engines = engines;
        self
    }

    /// Set the Wayback CDX endpoint.
    pub fn with_wayback_url<U: Into<String>>(mut self, url: U) -> Self {
        self.wayback_url = url.into();
        self
    }

    /// Set the minimum page count for "only indexed" filtering (at least 1).
    pub fn with_min_indexed_pages(mut self, min: u64) -> Self {
        self.min_indexed_pages = min.max(1);
        self
    }

    /// Set the report directory.
    pub fn with_report_dir<P: Into<PathBuf>>(mut self, dir: P) -> Self {
        self.report_dir = dir.into();
        self
    }

    /// Feed URL for `tld`, if one is configured.
    pub fn feed_url(&self, tld: &str) -> Option<&str> {
        self.feed_urls.get(tld).map(String::as_str)
    }

    /// Check the configuration is usable before building components.
    pub fn validate(&self) -> Result<(), ScanError> {
        if self.tlds.is_empty() {
            return Err(ScanError::config("At least one TLD must be scanned"));
        }
        for tld in &self.tlds {
            if !crate::utils::is_valid_tld(tld) {
                return Err(ScanError::config(format!("Invalid TLD '{}'", tld)));
            }
            if self.feed_url(tld).is_none() {
                return Err(ScanError::config(format!(
                    "No drop-list feed configured for .{}",
                    tld
                )));
            }
        }

        if self.engines.is_empty() {
            return Err(ScanError::config("At least one index engine is required"));
        }
        let known = known_engines();
        for engine in &self.engines {
            if !known.contains(&engine.as_str()) {
                return Err(ScanError::config(format!(
                    "Unknown index engine '{}' (known: {})",
                    engine,
                    known.join(", ")
                )));
            }
        }

        if self.min_indexed_pages == 0 {
            return Err(ScanError::config("min_indexed_pages must be at least 1"));
        }
        if self.wayback_limit == 0 {
            return Err(ScanError::config("wayback_limit must be at least 1"));
        }
        Ok(())
    }
}
