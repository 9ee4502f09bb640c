//! Server TLS bootstrap: operator-supplied key pair with self-signed fallback.
//!
//! [`TlsBootstrap::create_server_config`] tries to load a PEM pair from disk
//! and, on any load failure, falls back to generating a self-signed identity
//! bound to the required hostnames. The result is a [`ServerTlsConfig`]
//! exposing exactly one certificate/key pair; version and cipher policy is
//! applied separately via [`crate::policy::config_customizer`].

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use rustls::crypto::ring;
use rustls::crypto::CryptoProvider;
use rustls::pki_types::{CertificateDer, PrivateKeyDer};
use rustls::server::ServerConfig;
use rustls::{CipherSuite, SupportedCipherSuite};
use tracing::{debug, warn};

use common::TlsError;

use crate::identity::{self, IdentityRequest};
use crate::policy::TlsVersion;

/// Organization label stamped into auto-generated fallback identities.
pub const DEFAULT_ORGANIZATION: &str = "Palisade";

/// Validity window for auto-generated fallback identities.
pub const DEFAULT_FALLBACK_VALID_FOR: Duration = Duration::from_secs(365 * 24 * 60 * 60);

/// Named defaults for fallback identity generation.
///
/// Injected at bootstrap construction rather than read from module globals,
/// so tests (and unusual deployments) can override them per instance.
#[derive(Debug, Clone)]
pub struct IdentityDefaults {
    /// Subject organization for generated certificates.
    pub organization: String,
    /// Validity window for generated certificates.
    pub valid_for: Duration,
}

impl Default for IdentityDefaults {
    fn default() -> Self {
        Self {
            organization: DEFAULT_ORGANIZATION.into(),
            valid_for: DEFAULT_FALLBACK_VALID_FOR,
        }
    }
}

/// The transport configuration handed to the listener/handshake layer.
///
/// Carries exactly one identity plus the policy fields a
/// [`crate::policy::TlsCustomizer`] writes. The private key lives only here;
/// realising the configuration with [`ServerTlsConfig::into_rustls`] consumes
/// it.
#[derive(Debug)]
pub struct ServerTlsConfig {
    /// Certificate chain, leaf first.
    pub certificates: Vec<CertificateDer<'static>>,
    /// Private key matching the leaf certificate.
    pub private_key: PrivateKeyDer<'static>,
    /// Minimum negotiable protocol version; `None` leaves the stack default.
    pub min_version: Option<TlsVersion>,
    /// Maximum negotiable protocol version; `None` leaves the stack default.
    pub max_version: Option<TlsVersion>,
    /// Cipher-suite restriction for TLS ≤ 1.2; empty means unrestricted.
    pub cipher_suites: Vec<CipherSuite>,
}

impl ServerTlsConfig {
    /// Wrap an identity with policy fields unset.
    pub fn new(
        certificates: Vec<CertificateDer<'static>>,
        private_key: PrivateKeyDer<'static>,
    ) -> Self {
        Self {
            certificates,
            private_key,
            min_version: None,
            max_version: None,
            cipher_suites: Vec::new(),
        }
    }

    /// Realise this configuration as a [`rustls::ServerConfig`].
    ///
    /// TLS 1.3 suites are always offered — they are not operator-configurable
    /// and restricting them would only break 1.3 negotiation. rustls
    /// implements no protocol before 1.2, so version bounds below that clamp
    /// to 1.2.
    ///
    /// # Errors
    ///
    /// Returns [`TlsError::Config`] if the version bounds leave no protocol
    /// the runtime supports, or if rustls rejects the certificate/key pair.
    pub fn into_rustls(self) -> Result<Arc<ServerConfig>, TlsError> {
        let include_tls12 = self.min_version.map_or(true, |v| v <= TlsVersion::Tls12)
            && self.max_version.map_or(true, |v| v >= TlsVersion::Tls12);
        let include_tls13 = self.max_version.map_or(true, |v| v >= TlsVersion::Tls13);

        let mut versions: Vec<&'static rustls::SupportedProtocolVersion> = Vec::new();
        if include_tls12 {
            versions.push(&rustls::version::TLS12);
        }
        if include_tls13 {
            versions.push(&rustls::version::TLS13);
        }
        if versions.is_empty() {
            return Err(TlsError::Config(
                "version bounds leave no protocol version supported by the runtime".into(),
            ));
        }

        let provider = if self.cipher_suites.is_empty() {
            ring::default_provider()
        } else {
            let cipher_suites: Vec<SupportedCipherSuite> = ring::ALL_CIPHER_SUITES
                .iter()
                .copied()
                .filter(|suite| match suite {
                    // 1.3 suites stay available regardless of the restriction.
                    SupportedCipherSuite::Tls13(_) => true,
                    _ => self.cipher_suites.contains(&suite.suite()),
                })
                .collect();
            CryptoProvider {
                cipher_suites,
                ..ring::default_provider()
            }
        };

        let config = ServerConfig::builder_with_provider(Arc::new(provider))
            .with_protocol_versions(&versions)
            .map_err(|e| TlsError::Config(e.to_string()))?
            .with_no_client_auth()
            .with_single_cert(self.certificates, self.private_key)
            .map_err(|e| TlsError::Config(e.to_string()))?;

        Ok(Arc::new(config))
    }
}

/// Loads an operator-supplied key pair, falling back to self-signed
/// generation with the injected [`IdentityDefaults`].
#[derive(Debug, Clone, Default)]
pub struct TlsBootstrap {
    defaults: IdentityDefaults,
}

impl TlsBootstrap {
    /// Create a bootstrapper with explicit fallback defaults.
    pub fn new(defaults: IdentityDefaults) -> Self {
        Self { defaults }
    }

    /// Build the server transport configuration.
    ///
    /// Tries `cert_path`/`key_path` first and uses that identity verbatim on
    /// success. Any load failure — missing file, unreadable, malformed —
    /// falls back to a fresh self-signed identity bound to `hosts`. Each
    /// fallback generates a distinct identity; nothing is cached.
    ///
    /// # Errors
    ///
    /// Returns [`TlsError::Validation`] when fallback is needed but `hosts`
    /// is `None` (a host-less certificate would be useless), and propagates
    /// generation failures.
    pub fn create_server_config(
        &self,
        cert_path: &Path,
        key_path: &Path,
        hosts: Option<&[String]>,
    ) -> Result<ServerTlsConfig, TlsError> {
        match load_key_pair(cert_path, key_path) {
            Ok((certificates, private_key)) => {
                debug!(cert = %cert_path.display(), "loaded TLS key pair from disk");
                Ok(ServerTlsConfig::new(certificates, private_key))
            }
            Err(reason) => {
                warn!(
                    cert = %cert_path.display(),
                    key = %key_path.display(),
                    %reason,
                    "unable to load TLS key pair, falling back to a self-signed certificate"
                );
                let hosts = hosts.ok_or_else(|| {
                    TlsError::validation("no hosts supplied for self-signed certificate generation")
                })?;
                let identity = identity::generate(&IdentityRequest {
                    hosts: hosts.to_vec(),
                    organization: self.defaults.organization.clone(),
                    valid_from: None,
                    valid_for: Some(self.defaults.valid_for),
                    ecdsa_curve: None,
                })?;
                Ok(ServerTlsConfig::new(
                    vec![identity.cert_der],
                    identity.key_der,
                ))
            }
        }
    }
}

/// Build the server transport configuration with [`IdentityDefaults::default`].
///
/// Convenience wrapper over [`TlsBootstrap::create_server_config`].
///
/// # Errors
///
/// Same failure modes as [`TlsBootstrap::create_server_config`].
pub fn create_server_config(
    cert_path: &Path,
    key_path: &Path,
    hosts: Option<&[String]>,
) -> Result<ServerTlsConfig, TlsError> {
    TlsBootstrap::default().create_server_config(cert_path, key_path, hosts)
}

fn load_key_pair(
    cert_path: &Path,
    key_path: &Path,
) -> Result<(Vec<CertificateDer<'static>>, PrivateKeyDer<'static>), TlsError> {
    let cert_bytes = std::fs::read(cert_path).map_err(|source| TlsError::Read {
        path: cert_path.to_path_buf(),
        source,
    })?;
    let mut reader = cert_bytes.as_slice();
    let certificates = rustls_pemfile::certs(&mut reader)
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| TlsError::Malformed {
            path: cert_path.to_path_buf(),
            reason: e.to_string(),
        })?;
    let leaf = certificates.first().ok_or_else(|| TlsError::Malformed {
        path: cert_path.to_path_buf(),
        reason: "no CERTIFICATE blocks found".into(),
    })?;

    // The leaf must at least be well-formed X.509 before we accept the pair.
    x509_parser::parse_x509_certificate(leaf.as_ref()).map_err(|e| TlsError::Malformed {
        path: cert_path.to_path_buf(),
        reason: e.to_string(),
    })?;

    let key_bytes = std::fs::read(key_path).map_err(|source| TlsError::Read {
        path: key_path.to_path_buf(),
        source,
    })?;
    let mut reader = key_bytes.as_slice();
    let private_key = rustls_pemfile::private_key(&mut reader)
        .map_err(|e| TlsError::Malformed {
            path: key_path.to_path_buf(),
            reason: e.to_string(),
        })?
        .ok_or_else(|| TlsError::Malformed {
            path: key_path.to_path_buf(),
            reason: "no private-key block found".into(),
        })?;

    Ok((certificates, private_key))
}
