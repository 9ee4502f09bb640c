//! TLS version and cipher-suite policy parsing.
//!
//! Operators express policy as strings (`"1.2"`, a colon-separated cipher
//! list); this module translates them into runtime identifiers and builds a
//! [`TlsCustomizer`] that stamps a validated policy onto any
//! [`ServerTlsConfig`]. All name lookups go through two fixed tables so the
//! edge cases ("" means unset, unknown id maps to `"unknown"`) live in one
//! place.

use rustls::CipherSuite;

use common::TlsError;

use crate::server::ServerTlsConfig;

/// Default minimum protocol version offered by the gateway.
pub const DEFAULT_TLS_MIN_VERSION: &str = "1.2";

/// Default maximum protocol version offered by the gateway.
pub const DEFAULT_TLS_MAX_VERSION: &str = "1.3";

/// Default cipher-suite restriction for TLS 1.2 connections.
pub const DEFAULT_TLS_CIPHER_SUITES: &str = "TLS_ECDHE_RSA_WITH_AES_256_GCM_SHA384:\
TLS_ECDHE_RSA_WITH_CHACHA20_POLY1305_SHA256:\
TLS_ECDHE_RSA_WITH_AES_128_GCM_SHA256";

/// TLS protocol versions understood by the policy layer.
///
/// Ordering follows protocol age, so version bounds compare directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum TlsVersion {
    /// TLS 1.0
    Tls10,
    /// TLS 1.1
    Tls11,
    /// TLS 1.2
    Tls12,
    /// TLS 1.3
    Tls13,
}

/// The fixed bidirectional name ↔ version table.
const VERSIONS_BY_NAME: &[(&str, TlsVersion)] = &[
    ("1.0", TlsVersion::Tls10),
    ("1.1", TlsVersion::Tls11),
    ("1.2", TlsVersion::Tls12),
    ("1.3", TlsVersion::Tls13),
];

impl TlsVersion {
    /// IANA wire identifier for this version.
    pub const fn id(self) -> u16 {
        match self {
            TlsVersion::Tls10 => 0x0301,
            TlsVersion::Tls11 => 0x0302,
            TlsVersion::Tls12 => 0x0303,
            TlsVersion::Tls13 => 0x0304,
        }
    }

    /// Human-readable name (`"1.2"`).
    pub const fn as_str(self) -> &'static str {
        match self {
            TlsVersion::Tls10 => "1.0",
            TlsVersion::Tls11 => "1.1",
            TlsVersion::Tls12 => "1.2",
            TlsVersion::Tls13 => "1.3",
        }
    }

    /// Reverse lookup by wire identifier.
    pub fn from_id(id: u16) -> Option<Self> {
        VERSIONS_BY_NAME
            .iter()
            .map(|(_, v)| *v)
            .find(|v| v.id() == id)
    }
}

/// Parse an operator-supplied TLS version string.
///
/// The empty string maps to `None` ("unset"), not an error.
///
/// # Errors
///
/// Returns [`TlsError::Validation`] for any value outside
/// `{"", "1.0", "1.1", "1.2", "1.3"}`.
pub fn version_from_str(name: &str) -> Result<Option<TlsVersion>, TlsError> {
    if name.is_empty() {
        return Ok(None);
    }
    VERSIONS_BY_NAME
        .iter()
        .find(|(n, _)| *n == name)
        .map(|(_, v)| Some(*v))
        .ok_or_else(|| TlsError::Validation(format!("unsupported TLS version {name:?}")))
}

/// Lossy but total reverse mapping for diagnostics.
///
/// Every known wire identifier maps back to its name; anything else becomes
/// the literal `"unknown"`.
pub fn versions_to_names(ids: &[u16]) -> Vec<String> {
    ids.iter()
        .map(|id| {
            TlsVersion::from_id(*id)
                .map(|v| v.as_str().to_string())
                .unwrap_or_else(|| "unknown".to_string())
        })
        .collect()
}

/// The full named cipher-suite set, TLS 1.3 suites included.
///
/// TLS 1.3 suites are accepted for validation even though they are never
/// independently configurable at this layer.
const CIPHER_SUITES_BY_NAME: &[(&str, CipherSuite)] = &[
    ("TLS_RSA_WITH_AES_128_CBC_SHA", CipherSuite::TLS_RSA_WITH_AES_128_CBC_SHA),
    ("TLS_RSA_WITH_AES_256_CBC_SHA", CipherSuite::TLS_RSA_WITH_AES_256_CBC_SHA),
    ("TLS_RSA_WITH_AES_128_GCM_SHA256", CipherSuite::TLS_RSA_WITH_AES_128_GCM_SHA256),
    ("TLS_RSA_WITH_AES_256_GCM_SHA384", CipherSuite::TLS_RSA_WITH_AES_256_GCM_SHA384),
    ("TLS_ECDHE_ECDSA_WITH_AES_128_CBC_SHA", CipherSuite::TLS_ECDHE_ECDSA_WITH_AES_128_CBC_SHA),
    ("TLS_ECDHE_ECDSA_WITH_AES_256_CBC_SHA", CipherSuite::TLS_ECDHE_ECDSA_WITH_AES_256_CBC_SHA),
    ("TLS_ECDHE_RSA_WITH_AES_128_CBC_SHA", CipherSuite::TLS_ECDHE_RSA_WITH_AES_128_CBC_SHA),
    ("TLS_ECDHE_RSA_WITH_AES_256_CBC_SHA", CipherSuite::TLS_ECDHE_RSA_WITH_AES_256_CBC_SHA),
    ("TLS_ECDHE_ECDSA_WITH_AES_128_GCM_SHA256", CipherSuite::TLS_ECDHE_ECDSA_WITH_AES_128_GCM_SHA256),
    ("TLS_ECDHE_ECDSA_WITH_AES_256_GCM_SHA384", CipherSuite::TLS_ECDHE_ECDSA_WITH_AES_256_GCM_SHA384),
    ("TLS_ECDHE_RSA_WITH_AES_128_GCM_SHA256", CipherSuite::TLS_ECDHE_RSA_WITH_AES_128_GCM_SHA256),
    ("TLS_ECDHE_RSA_WITH_AES_256_GCM_SHA384", CipherSuite::TLS_ECDHE_RSA_WITH_AES_256_GCM_SHA384),
    ("TLS_ECDHE_RSA_WITH_CHACHA20_POLY1305_SHA256", CipherSuite::TLS_ECDHE_RSA_WITH_CHACHA20_POLY1305_SHA256),
    ("TLS_ECDHE_ECDSA_WITH_CHACHA20_POLY1305_SHA256", CipherSuite::TLS_ECDHE_ECDSA_WITH_CHACHA20_POLY1305_SHA256),
    ("TLS_AES_128_GCM_SHA256", CipherSuite::TLS13_AES_128_GCM_SHA256),
    ("TLS_AES_256_GCM_SHA384", CipherSuite::TLS13_AES_256_GCM_SHA384),
    ("TLS_CHACHA20_POLY1305_SHA256", CipherSuite::TLS13_CHACHA20_POLY1305_SHA256),
];

/// Parse a colon-separated list of cipher-suite names.
///
/// Lookups are case-sensitive against the fixed table. The empty string
/// yields an empty list, meaning "no restriction".
///
/// # Errors
///
/// Returns [`TlsError::Validation`] naming the first unknown token; one bad
/// token fails the entire parse.
pub fn cipher_suites_from_str(names: &str) -> Result<Vec<CipherSuite>, TlsError> {
    if names.is_empty() {
        return Ok(Vec::new());
    }
    names
        .split(':')
        .map(|name| {
            CIPHER_SUITES_BY_NAME
                .iter()
                .find(|(n, _)| *n == name)
                .map(|(_, id)| *id)
                .ok_or_else(|| TlsError::Validation(format!("unsupported TLS cipher suite {name:?}")))
        })
        .collect()
}

/// A validated policy, packaged as a function over transport configurations.
///
/// Applying it sets the version bounds and, when TLS 1.2 or below can be
/// negotiated, the cipher-suite restriction. It performs no I/O and may be
/// applied to any number of configurations.
pub type TlsCustomizer = Box<dyn Fn(&mut ServerTlsConfig) + Send + Sync>;

/// Build a [`TlsCustomizer`] from operator-supplied policy strings.
///
/// TLS 1.3 suite selection is not controllable at this layer: when the
/// resolved minimum version is 1.3, the applied cipher-suite list is left
/// empty so the configuration never carries a misleading restriction.
///
/// # Errors
///
/// Returns [`TlsError::Validation`] if either version string is invalid, if
/// both resolve and `min > max`, or if any cipher-suite name is unknown.
pub fn config_customizer(
    min_version: &str,
    max_version: &str,
    cipher_suites: &str,
) -> Result<TlsCustomizer, TlsError> {
    let min = version_from_str(min_version)?;
    let max = version_from_str(max_version)?;
    if let (Some(lo), Some(hi)) = (min, max) {
        if lo > hi {
            return Err(TlsError::Validation(format!(
                "minimum TLS version {} must not exceed maximum TLS version {}",
                lo.as_str(),
                hi.as_str()
            )));
        }
    }
    let suites = cipher_suites_from_str(cipher_suites)?;

    Ok(Box::new(move |config: &mut ServerTlsConfig| {
        config.min_version = min;
        config.max_version = max;
        if min.map_or(true, |v| v < TlsVersion::Tls13) {
            config.cipher_suites = suites.clone();
        } else {
            config.cipher_suites = Vec::new();
        }
    }))
}
