use crate::error::ScanError;
use std::time::Duration;

/// Build the pooled HTTP client shared by one component.
pub(crate) fn build_http_client(
    user_agent: &str,
    timeout: Duration,
) -> Result<reqwest::Client, ScanError> {
    let client = reqwest::Client::builder()
        .user_agent(user_agent)
        .timeout(timeout)
        .pool_idle_timeout(Duration::from_secs(90))
        .tcp_nodelay(true)
        .build()?;
    Ok(client)
}

/// Map a failed index request to a per-domain lookup error.
pub(crate) fn request_error(
    domain: &str,
    operation: &str,
    timeout: Duration,
    err: reqwest::Error,
) -> ScanError {
    if err.is_timeout() {
        ScanError::lookup_timeout(domain, operation, timeout)
    } else if err.is_connect() {
        ScanError::lookup(domain, format!("{}: connection failed: {}", operation, err))
    } else {
        ScanError::lookup(domain, format!("{}: {}", operation, err))
    }
}
