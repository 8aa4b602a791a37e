//! DNS-based availability checking.
//!
//! A released domain that nobody has re-registered has no delegation, so
//! its name does not exist in DNS. One NS query per domain tells the cases
//! apart: NXDOMAIN means available, any answer (even an empty one) means the
//! name is registered, and anything else leaves the status unknown.

use crate::error::ScanError;
use crate::types::ScanConfig;
use async_trait::async_trait;
use hickory_resolver::config::{ResolverConfig, ResolverOpts};
use hickory_resolver::error::{ResolveError, ResolveErrorKind};
use hickory_resolver::proto::error::ProtoErrorKind;
use hickory_resolver::proto::op::ResponseCode;
use hickory_resolver::proto::rr::RecordType;
use hickory_resolver::TokioAsyncResolver;
use std::time::Duration;
use tracing::{debug, warn};

/// Checks whether a domain is currently unregistered.
#[async_trait]
pub trait AvailabilityCheck: Send + Sync {
    /// `Ok(true)` if the domain is available, `Ok(false)` if it is taken.
    ///
    /// Errors are per-domain (`LookupTimeout` / `LookupError`); callers
    /// record them as an unknown status.
    async fn check(&self, domain: &str) -> Result<bool, ScanError>;
}

/// What a single DNS query came back with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LookupOutcome {
    /// The query returned records
    Records,
    /// NOERROR without records: the name exists
    NoData,
    /// NXDOMAIN: the name does not exist
    NxDomain,
    /// No answer within the timeout
    TimedOut,
    /// Any other failure (SERVFAIL, REFUSED, malformed response, I/O)
    Failed(String),
}

impl LookupOutcome {
    /// Turn a query outcome into an availability answer.
    pub fn into_availability(self, domain: &str, timeout: Duration) -> Result<bool, ScanError> {
        match self {
            Self::NxDomain => Ok(true),
            Self::Records | Self::NoData => Ok(false),
            Self::TimedOut => Err(ScanError::lookup_timeout(domain, "DNS lookup", timeout)),
            Self::Failed(reason) => Err(ScanError::lookup(domain, reason)),
        }
    }
}

/// Availability checker backed by a hickory resolver.
pub struct DnsAvailabilityChecker {
    resolver: TokioAsyncResolver,
    timeout: Duration,
}

impl DnsAvailabilityChecker {
    /// Create a checker using the system resolver configuration.
    ///
    /// Falls back to the resolver's built-in upstreams when the system
    /// configuration cannot be read.
    pub fn new(config: &ScanConfig) -> Self {
        let (resolver_config, opts) = match hickory_resolver::system_conf::read_system_conf() {
            Ok(conf) => conf,
            Err(e) => {
                warn!(error = %e, "cannot read system DNS configuration, using defaults");
                (ResolverConfig::default(), ResolverOpts::default())
            }
        };
        Self::with_resolver_config(resolver_config, opts, config.dns_timeout)
    }

    /// Create a checker against explicit upstream servers.
    pub fn with_resolver_config(
        resolver_config: ResolverConfig,
        mut opts: ResolverOpts,
        timeout: Duration,
    ) -> Self {
        opts.timeout = timeout;
        opts.attempts = 1;
        // every domain is asked about once per run
        opts.cache_size = 0;

        Self {
            resolver: TokioAsyncResolver::tokio(resolver_config, opts),
            timeout,
        }
    }

    /// Run the single NS query for `domain`.
    pub async fn lookup(&self, domain: &str) -> LookupOutcome {
        // trailing dot keeps the system search list out of it
        let fqdn = format!("{}.", domain.trim_end_matches('.'));

        match tokio::time::timeout(self.timeout, self.resolver.lookup(fqdn, RecordType::NS)).await
        {
            Err(_) => LookupOutcome::TimedOut,
            Ok(Ok(lookup)) => {
                if lookup.iter().next().is_some() {
                    LookupOutcome::Records
                } else {
                    LookupOutcome::NoData
                }
            }
            Ok(Err(e)) => outcome_from_error(&e),
        }
    }
}

#[async_trait]
impl AvailabilityCheck for DnsAvailabilityChecker {
    async fn check(&self, domain: &str) -> Result<bool, ScanError> {
        let outcome = self.lookup(domain).await;
        debug!(domain, ?outcome, "DNS lookup finished");
        outcome.into_availability(domain, self.timeout)
    }
}

fn outcome_from_error(err: &ResolveError) -> LookupOutcome {
    match err.kind() {
        ResolveErrorKind::NoRecordsFound { response_code, .. } => match *response_code {
            ResponseCode::NXDomain => LookupOutcome::NxDomain,
            ResponseCode::NoError => LookupOutcome::NoData,
            code => LookupOutcome::Failed(format!("DNS server answered {}", code)),
        },
        ResolveErrorKind::Timeout => LookupOutcome::TimedOut,
        ResolveErrorKind::Proto(proto) if matches!(proto.kind(), ProtoErrorKind::Timeout) => {
            LookupOutcome::TimedOut
        }
        _ => LookupOutcome::Failed(err.to_string()),
    }
}
