//! Network clients used by a scan.
//!
//! This module contains the registry drop-list client, the DNS availability
//! checker and the index engines queried for page counts.

/// Registry drop-list feeds
pub mod droplist;

/// DNS availability lookups
pub mod dns;

/// Internet Archive CDX index engine
pub mod wayback;

/// Common Crawl CDX index engine
#[cfg(feature = "commoncrawl")]
pub mod commoncrawl;

mod http;

pub use dns::{AvailabilityCheck, DnsAvailabilityChecker, LookupOutcome};
pub use droplist::{DropListSource, DropWindow, FeedEntry, IisDropList};
pub use wayback::WaybackEngine;

#[cfg(feature = "commoncrawl")]
pub use commoncrawl::CommonCrawlEngine;

pub(crate) use http::{build_http_client, request_error};
