//! Error handling for scan operations.
//!
//! Errors fall into two groups. Run-level failures (the drop-list feed is
//! unreachable, the report directory is unwritable, the configuration is
//! broken) abort the run. Per-domain lookup failures are recovered by the
//! pipeline as unknown (`null`) fields on that domain's record.

use std::fmt;
use std::time::Duration;

/// Main error type for scan operations.
#[derive(Debug, Clone)]
pub enum ScanError {
    /// The drop-list feed could not be reached or returned malformed data
    SourceUnavailable { source: String, message: String },

    /// A per-domain lookup (DNS or index engine) ran out of time
    LookupTimeout {
        domain: String,
        operation: String,
        duration: Duration,
    },

    /// A per-domain lookup failed for any other reason
    LookupError { domain: String, message: String },

    /// The report directory or a report file could not be written
    WriteError { path: String, message: String },

    /// Invalid domain name format
    InvalidDomain { domain: String, reason: String },

    /// A record read back from disk violates a record invariant
    InvalidRecord { domain: String, reason: String },

    /// Configuration errors (invalid settings, etc.)
    ConfigError { message: String },

    /// File I/O errors when reading configuration or reports
    FileError { path: String, message: String },

    /// JSON/TOML parsing errors
    ParseError { message: String },

    /// Generic internal errors that don't fit other categories
    Internal { message: String },
}

impl ScanError {
    /// Create a new source-unavailable error.
    pub fn source_unavailable<S: Into<String>, M: Into<String>>(source: S, message: M) -> Self {
        Self::SourceUnavailable {
            source: source.into(),
            message: message.into(),
        }
    }

    /// Create a new lookup timeout error.
    pub fn lookup_timeout<D: Into<String>, O: Into<String>>(
        domain: D,
        operation: O,
        duration: Duration,
    ) -> Self {
        Self::LookupTimeout {
            domain: domain.into(),
            operation: operation.into(),
            duration,
        }
    }

    /// Create a new lookup error.
    pub fn lookup<D: Into<String>, M: Into<String>>(domain: D, message: M) -> Self {
        Self::LookupError {
            domain: domain.into(),
            message: message.into(),
        }
    }

    /// Create a new write error.
    pub fn write<P: Into<String>, M: Into<String>>(path: P, message: M) -> Self {
        Self::WriteError {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a new invalid domain error.
    pub fn invalid_domain<D: Into<String>, R: Into<String>>(domain: D, reason: R) -> Self {
        Self::InvalidDomain {
            domain: domain.into(),
            reason: reason.into(),
        }
    }

    /// Create a new invalid record error.
    pub fn invalid_record<D: Into<String>, R: Into<String>>(domain: D, reason: R) -> Self {
        Self::InvalidRecord {
            domain: domain.into(),
            reason: reason.into(),
        }
    }

    /// Create a new configuration error.
    pub fn config<M: Into<String>>(message: M) -> Self {
        Self::ConfigError {
            message: message.into(),
        }
    }

    /// Create a new file error.
    pub fn file_error<P: Into<String>, M: Into<String>>(path: P, message: M) -> Self {
        Self::FileError {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a new internal error.
    pub fn internal<M: Into<String>>(message: M) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Whether this error terminates the whole run.
    ///
    /// Lookup failures only degrade one record and are never fatal.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Self::LookupTimeout { .. } | Self::LookupError { .. })
    }

    /// Whether this error came from a timeout rather than an explicit failure.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::LookupTimeout { .. })
    }
}

impl fmt::Display for ScanError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SourceUnavailable { source, message } => {
                write!(f, "Drop list unavailable from {}: {}", source, message)
            }
            Self::LookupTimeout {
                domain,
                operation,
                duration,
            } => {
                write!(
                    f,
                    "Timeout after {:?} during {} for '{}'",
                    duration, operation, domain
                )
            }
            Self::LookupError { domain, message } => {
                write!(f, "Lookup failed for '{}': {}", domain, message)
            }
            Self::WriteError { path, message } => {
                write!(f, "Cannot write report at '{}': {}", path, message)
            }
            Self::InvalidDomain { domain, reason } => {
                write!(f, "Invalid domain '{}': {}", domain, reason)
            }
            Self::InvalidRecord { domain, reason } => {
                write!(f, "Invalid record for '{}': {}", domain, reason)
            }
            Self::ConfigError { message } => {
                write!(f, "Configuration error: {}", message)
            }
            Self::FileError { path, message } => {
                write!(f, "File error at '{}': {}", path, message)
            }
            Self::ParseError { message } => {
                write!(f, "Parse error: {}", message)
            }
            Self::Internal { message } => {
                write!(f, "Internal error: {}", message)
            }
        }
    }
}

impl std::error::Error for ScanError {}

impl From<serde_json::Error> for ScanError {
    fn from(err: serde_json::Error) -> Self {
        Self::ParseError {
            message: format!("JSON parsing failed: {}", err),
        }
    }
}

impl From<std::io::Error> for ScanError {
    fn from(err: std::io::Error) -> Self {
        Self::Internal {
            message: format!("I/O error: {}", err),
        }
    }
}

impl From<reqwest::Error> for ScanError {
    fn from(err: reqwest::Error) -> Self {
        Self::Internal {
            message: format!("HTTP client error: {}", err),
        }
    }
}
