//! Common error types shared across crates.

use std::path::PathBuf;
use thiserror::Error;

/// Top-level error type for the TLS identity and trust-configuration layer.
///
/// The taxonomy separates caller-fixable input problems from I/O failures:
/// - [`TlsError::Validation`] — the call as made can never succeed; fix the
///   input and retry.
/// - [`TlsError::Read`] — a file existed but could not be read.
/// - [`TlsError::Malformed`] — a file was read but its contents are unusable.
///
/// Degraded outcomes (a key that cannot be serialised, a missing trust-pool
/// member, an unavailable ambient trust store) are expressed as values at the
/// call site, never as variants here.
#[derive(Debug, Error)]
pub enum TlsError {
    /// The caller supplied input that can never produce a valid result.
    #[error("{0}")]
    Validation(String),

    /// A file was present but reading it failed.
    #[error("failed to read {path}: {source}")]
    Read {
        /// Path that failed to read.
        path: PathBuf,
        /// Underlying I/O cause.
        #[source]
        source: std::io::Error,
    },

    /// A file was read successfully but its contents do not parse.
    #[error("malformed certificate data in {path}: {reason}")]
    Malformed {
        /// Path holding the unusable content.
        path: PathBuf,
        /// What failed to parse.
        reason: String,
    },

    /// Key or certificate construction failed inside the crypto layer.
    #[error("certificate generation failed: {0}")]
    Generation(String),

    /// The assembled transport configuration was rejected by the TLS stack.
    #[error("TLS configuration rejected: {0}")]
    Config(String),
}

impl TlsError {
    /// Shorthand for building a [`TlsError::Validation`].
    pub fn validation(msg: impl Into<String>) -> Self {
        TlsError::Validation(msg.into())
    }
}
