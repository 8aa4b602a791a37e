//! Utility functions for domain validation and value parsing.

use crate::error::ScanError;
use regex::Regex;
use std::time::Duration;

lazy_static::lazy_static! {
    static ref DURATION_RE: Regex =
        Regex::new(r"^(\d+(?:\.\d+)?)\s*(ms|s|m)?$").expect("duration regex is valid");
}

/// Validate a fully qualified domain name.
///
/// # Returns
///
/// `Ok(())` if valid, `Err(ScanError::InvalidDomain)` otherwise.
pub fn validate_domain(domain: &str) -> Result<(), ScanError> {
    if domain.is_empty() {
        return Err(ScanError::invalid_domain(
            domain,
            "Domain name cannot be empty",
        ));
    }

    if domain.len() > 253 {
        return Err(ScanError::invalid_domain(domain, "Domain name too long"));
    }

    let labels: Vec<&str> = domain.split('.').collect();
    if labels.len() < 2 {
        return Err(ScanError::invalid_domain(
            domain,
            "Domain name must include a TLD",
        ));
    }

    for label in labels {
        if label.is_empty() || label.len() > 63 {
            return Err(ScanError::invalid_domain(domain, "Invalid label length"));
        }
        if label.starts_with('-') || label.ends_with('-') {
            return Err(ScanError::invalid_domain(
                domain,
                "Labels cannot start or end with a hyphen",
            ));
        }
        // IDNs arrive in punycode, so plain ASCII is all we accept
        if !label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
            return Err(ScanError::invalid_domain(
                domain,
                "Labels may only contain letters, digits and hyphens",
            ));
        }
    }

    Ok(())
}

/// Whether `domain` is a name directly or indirectly under `tld`.
pub fn belongs_to_tld(domain: &str, tld: &str) -> bool {
    domain.len() > tld.len() + 1
        && domain.ends_with(tld)
        && domain.as_bytes()[domain.len() - tld.len() - 1] == b'.'
}

/// A single-label TLD such as "se" or "nu".
pub fn is_valid_tld(tld: &str) -> bool {
    !tld.is_empty()
        && tld.len() <= 63
        && tld.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
        && !tld.starts_with('-')
        && !tld.ends_with('-')
}

/// Parse a duration string like "500ms", "2.5s", "3" or "1m".
///
/// Bare numbers are seconds.
pub fn parse_duration_string(input: &str) -> Option<Duration> {
    let input = input.trim().to_lowercase();
    let caps = DURATION_RE.captures(&input)?;
    let value: f64 = caps.get(1)?.as_str().parse().ok()?;

    let seconds = match caps.get(2).map(|m| m.as_str()) {
        Some("ms") => value / 1000.0,
        Some("m") => value * 60.0,
        _ => value,
    };

    if !seconds.is_finite() {
        return None;
    }
    Duration::try_from_secs_f64(seconds).ok()
}

/// Split a comma-separated list, dropping blanks.
pub fn split_list(input: &str) -> Vec<String> {
    input
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}
