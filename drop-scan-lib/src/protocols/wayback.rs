//! Internet Archive (Wayback Machine) CDX index engine.
//!
//! The CDX API lists archived URLs under a domain. Collapsing on `urlkey`
//! gives one row per distinct page, so the row count is a usable estimate of
//! how much content the domain once had.

use crate::checker::IndexEngine;
use crate::error::ScanError;
use crate::protocols::{build_http_client, request_error};
use crate::types::ScanConfig;
use async_trait::async_trait;
use std::time::Duration;
use tracing::debug;

/// Index engine backed by the Wayback CDX API.
#[derive(Clone)]
pub struct WaybackEngine {
    http_client: reqwest::Client,
    url: String,
    limit: u32,
    timeout: Duration,
}

impl WaybackEngine {
    /// Create an engine from the scan configuration.
    pub fn new(config: &ScanConfig) -> Result<Self, ScanError> {
        Ok(Self {
            http_client: build_http_client(&config.user_agent, config.index_timeout)?,
            url: config.wayback_url.clone(),
            limit: config.wayback_limit,
            timeout: config.index_timeout,
        })
    }
}

#[async_trait]
impl IndexEngine for WaybackEngine {
    fn name(&self) -> &str {
        "wayback"
    }

    async fn page_count(&self, domain: &str) -> Result<u64, ScanError> {
        let pattern = format!("*.{}", domain);
        let limit = self.limit.to_string();

        let response = self
            .http_client
            .get(&self.url)
            .query(&[
                ("url", pattern.as_str()),
                ("matchType", "domain"),
                ("output", "json"),
                ("fl", "urlkey"),
                ("collapse", "urlkey"),
                ("limit", limit.as_str()),
            ])
            .send()
            .await
            .map_err(|e| request_error(domain, "Wayback query", self.timeout, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ScanError::lookup(
                domain,
                format!("Wayback returned HTTP {}", status.as_u16()),
            ));
        }

        let body = response
            .text()
            .await
            .map_err(|e| request_error(domain, "Wayback body", self.timeout, e))?;

        let pages = parse_cdx_rows(&body).map_err(|e| ScanError::lookup(domain, e))?;
        debug!(domain, pages, "Wayback page count");
        Ok(pages)
    }
}

/// Count the result rows of a CDX JSON response.
///
/// The first row is the field header. An empty body means no captures.
pub fn parse_cdx_rows(body: &str) -> Result<u64, String> {
    let body = body.trim();
    if body.is_empty() {
        return Ok(0);
    }

    let rows: Vec<serde_json::Value> =
        serde_json::from_str(body).map_err(|e| format!("malformed CDX response: {}", e))?;
    if rows.iter().any(|row| !row.is_array()) {
        return Err("malformed CDX response: rows must be arrays".to_string());
    }

    Ok(rows.len().saturating_sub(1) as u64)
}
