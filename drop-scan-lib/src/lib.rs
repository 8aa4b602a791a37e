//! # Drop Scan Library
//!
//! Finds soon-to-expire `.se` and `.nu` domains that still carry indexed
//! content.
//!
//! The library fetches the registry's drop list for a date, checks whether
//! each domain is unregistered (DNS), estimates how many pages index engines
//! hold for it, and writes dated CSV and JSON reports.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use drop_scan_lib::{Pipeline, PipelineOptions, ScanConfig};
//! use chrono::NaiveDate;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ScanConfig::default().with_report_dir("reports");
//!     let mut pipeline = Pipeline::from_config(&config, PipelineOptions::default())?;
//!
//!     let date = NaiveDate::from_ymd_opt(2026, 2, 10).unwrap();
//!     let outcome = pipeline.run(date).await?;
//!
//!     println!("{}", outcome.summary());
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - **Drop lists**: IIS `.se` / `.nu` release feeds, filtered by date
//! - **Availability**: single NS lookup, NXDOMAIN means available
//! - **Index presence**: Wayback Machine CDX, optionally Common Crawl
//! - **Reports**: `YYYY-MM-DD.csv` and `YYYY-MM-DD.json`, replaced atomically

pub use checker::{combine_counts, IndexChecker, IndexEngine};
pub use config::{load_env_config, ConfigManager, EnvConfig, FileConfig};
pub use error::ScanError;
pub use pipeline::{Pipeline, PipelineOptions, RunState, ScanOutcome};
pub use protocols::{
    AvailabilityCheck, DnsAvailabilityChecker, DropListSource, DropWindow, FeedEntry,
    IisDropList, LookupOutcome, WaybackEngine,
};
#[cfg(feature = "commoncrawl")]
pub use protocols::CommonCrawlEngine;
pub use report::{read_report, write_report, Report, ReportPaths, ReportWriter, ScanSummary};
pub use types::{known_engines, DomainRecord, DropEntry, IndexResult, ScanConfig};
pub use utils::{parse_duration_string, split_list, validate_domain};

pub mod protocols;

mod checker;
mod config;
mod error;
mod pipeline;
mod report;
mod types;
mod utils;

// Type alias for convenience
pub type Result<T> = std::result::Result<T, ScanError>;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Get library information for debugging or display purposes.
pub fn info() -> LibraryInfo {
    LibraryInfo {
        version: VERSION,
        features: get_enabled_features(),
        engines: known_engines(),
    }
}

/// Information about the library build and features
#[derive(Debug, Clone)]
pub struct LibraryInfo {
    pub version: &'static str,
    pub features: Vec<&'static str>,
    pub engines: Vec<&'static str>,
}

#[allow(clippy::vec_init_then_push)]
fn get_enabled_features() -> Vec<&'static str> {
    let mut features = Vec::new();

    #[cfg(feature = "commoncrawl")]
    features.push("commoncrawl");

    features
}
