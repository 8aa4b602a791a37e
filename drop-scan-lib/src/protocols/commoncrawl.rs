//! Common Crawl CDX index engine.
//!
//! Each crawl has its own index collection. The server answers with one JSON
//! object per capture, newline delimited, and with HTTP 404 when the domain
//! has no captures in that collection.

use crate::checker::IndexEngine;
use crate::error::ScanError;
use crate::protocols::{build_http_client, request_error};
use crate::types::ScanConfig;
use async_trait::async_trait;
use reqwest::StatusCode;
use std::time::Duration;
use tracing::debug;

/// Index engine backed by one Common Crawl collection.
#[derive(Clone)]
pub struct CommonCrawlEngine {
    http_client: reqwest::Client,
    endpoint: String,
    limit: u32,
    timeout: Duration,
}

impl CommonCrawlEngine {
    pub fn new(config: &ScanConfig) -> Result<Self, ScanError> {
        let endpoint = format!(
            "{}/{}-index",
            config.commoncrawl_url.trim_end_matches('/'),
            config.commoncrawl_collection
        );

        Ok(Self {
            http_client: build_http_client(&config.user_agent, config.index_timeout)?,
            endpoint,
            limit: config.wayback_limit,
            timeout: config.index_timeout,
        })
    }
}

#[async_trait]
impl IndexEngine for CommonCrawlEngine {
    fn name(&self) -> &str {
        "commoncrawl"
    }

    async fn page_count(&self, domain: &str) -> Result<u64, ScanError> {
        let pattern = format!("*.{}", domain);
        let limit = self.limit.to_string();

        let response = self
            .http_client
            .get(&self.endpoint)
            .query(&[
                ("url", pattern.as_str()),
                ("output", "json"),
                ("fl", "url"),
                ("limit", limit.as_str()),
            ])
            .send()
            .await
            .map_err(|e| request_error(domain, "Common Crawl query", self.timeout, e))?;

        match response.status() {
            StatusCode::NOT_FOUND => return Ok(0),
            status if !status.is_success() => {
                return Err(ScanError::lookup(
                    domain,
                    format!("Common Crawl returned HTTP {}", status.as_u16()),
                ));
            }
            _ => {}
        }

        let body = response
            .text()
            .await
            .map_err(|e| request_error(domain, "Common Crawl body", self.timeout, e))?;

        let pages = count_capture_lines(&body).map_err(|e| ScanError::lookup(domain, e))?;
        debug!(domain, pages, "Common Crawl page count");
        Ok(pages)
    }
}

/// Count the captures in a newline-delimited JSON response.
pub fn count_capture_lines(body: &str) -> Result<u64, String> {
    let mut count = 0;
    for line in body.lines().map(str::trim).filter(|l| !l.is_empty()) {
        let value: serde_json::Value = serde_json::from_str(line)
            .map_err(|e| format!("malformed Common Crawl line: {}", e))?;
        if !value.is_object() {
            return Err("malformed Common Crawl line: expected an object".to_string());
        }
        count += 1;
    }
    Ok(count)
}
