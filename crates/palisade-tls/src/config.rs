//! Configuration loading and validation for the gateway TLS layer.
//!
//! All values are read from environment variables at startup. The process
//! will exit with a clear error message if any variable cannot be parsed or
//! fails policy validation.

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::policy::{
    self, TlsCustomizer, DEFAULT_TLS_CIPHER_SUITES, DEFAULT_TLS_MAX_VERSION,
    DEFAULT_TLS_MIN_VERSION,
};
use crate::server::{self, ServerTlsConfig};

/// Validated TLS configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Filesystem path to the PEM-encoded TLS certificate chain.
    #[serde(default = "default_tls_cert_path")]
    pub tls_cert_path: String,

    /// Filesystem path to the PEM-encoded TLS private key.
    #[serde(default = "default_tls_key_path")]
    pub tls_key_path: String,

    /// Comma-separated hostnames for a generated fallback certificate.
    #[serde(default = "default_tls_hosts")]
    pub tls_hosts: String,

    /// Minimum TLS protocol version (`"1.0"` .. `"1.3"`, `""` for unset).
    #[serde(default = "default_tls_min_version")]
    pub tls_min_version: String,

    /// Maximum TLS protocol version (`"1.0"` .. `"1.3"`, `""` for unset).
    #[serde(default = "default_tls_max_version")]
    pub tls_max_version: String,

    /// Colon-separated cipher-suite names for TLS ≤ 1.2.
    #[serde(default = "default_tls_cipher_suites")]
    pub tls_cipher_suites: String,

    /// Comma-separated candidate paths for extra trusted CA certificates.
    #[serde(default)]
    pub tls_trusted_ca_paths: String,

    /// Tracing log level (e.g. `"info"`, `"debug"`).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_tls_cert_path() -> String {
    "/app/config/tls/tls.crt".into()
}
fn default_tls_key_path() -> String {
    "/app/config/tls/tls.key".into()
}
fn default_tls_hosts() -> String {
    "localhost".into()
}
fn default_tls_min_version() -> String {
    DEFAULT_TLS_MIN_VERSION.into()
}
fn default_tls_max_version() -> String {
    DEFAULT_TLS_MAX_VERSION.into()
}
fn default_tls_cipher_suites() -> String {
    DEFAULT_TLS_CIPHER_SUITES.into()
}
fn default_log_level() -> String {
    "info".into()
}

impl Config {
    /// Load and validate configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if any variable cannot be parsed or the combined
    /// policy fails validation.
    pub fn from_env() -> Result<Self> {
        let cfg = config::Config::builder()
            .add_source(config::Environment::default())
            .build()
            .context("failed to build configuration from environment")?;

        let c: Config = cfg
            .try_deserialize()
            .context("failed to deserialise configuration")?;

        c.validate()?;
        Ok(c)
    }

    /// Validate all fields, returning a descriptive error on the first failure.
    fn validate(&self) -> Result<()> {
        ensure_non_empty(&self.tls_cert_path, "TLS_CERT_PATH")?;
        ensure_non_empty(&self.tls_key_path, "TLS_KEY_PATH")?;
        if self.hosts().is_empty() {
            anyhow::bail!("TLS_HOSTS must name at least one hostname");
        }

        // The full policy must parse; this catches bad version names, an
        // inverted min/max pair, and unknown cipher suites at startup.
        self.customizer()
            .context("invalid TLS policy configuration")?;
        Ok(())
    }

    /// Hostnames for fallback certificate generation, comma-split and trimmed.
    pub fn hosts(&self) -> Vec<String> {
        split_list(&self.tls_hosts)
    }

    /// Candidate trust-pool paths, comma-split and trimmed.
    pub fn trusted_ca_paths(&self) -> Vec<String> {
        split_list(&self.tls_trusted_ca_paths)
    }

    /// Build the policy customizer from the configured version bounds and
    /// cipher suites.
    ///
    /// # Errors
    ///
    /// Same failure modes as [`policy::config_customizer`].
    pub fn customizer(&self) -> Result<TlsCustomizer, common::TlsError> {
        policy::config_customizer(
            &self.tls_min_version,
            &self.tls_max_version,
            &self.tls_cipher_suites,
        )
    }

    /// Bootstrap the server transport configuration and apply the configured
    /// policy to it.
    ///
    /// # Errors
    ///
    /// Propagates bootstrap and policy failures from
    /// [`server::create_server_config`] and [`Config::customizer`].
    pub fn server_config(&self) -> Result<ServerTlsConfig, common::TlsError> {
        let hosts = self.hosts();
        let mut config = server::create_server_config(
            self.tls_cert_path.as_ref(),
            self.tls_key_path.as_ref(),
            Some(&hosts),
        )?;
        let customize = self.customizer()?;
        customize(&mut config);
        Ok(config)
    }
}

fn ensure_non_empty(value: &str, name: &str) -> Result<()> {
    if value.trim().is_empty() {
        anyhow::bail!("{name} is required and must not be empty");
    }
    Ok(())
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> Config {
        Config {
            tls_cert_path: default_tls_cert_path(),
            tls_key_path: default_tls_key_path(),
            tls_hosts: default_tls_hosts(),
            tls_min_version: default_tls_min_version(),
            tls_max_version: default_tls_max_version(),
            tls_cipher_suites: default_tls_cipher_suites(),
            tls_trusted_ca_paths: String::new(),
            log_level: default_log_level(),
        }
    }

    #[test]
    fn defaults_are_correct() {
        assert_eq!(default_tls_cert_path(), "/app/config/tls/tls.crt");
        assert_eq!(default_tls_key_path(), "/app/config/tls/tls.key");
        assert_eq!(default_tls_hosts(), "localhost");
        assert_eq!(default_tls_min_version(), "1.2");
        assert_eq!(default_tls_max_version(), "1.3");
        assert_eq!(default_log_level(), "info");
    }

    #[test]
    fn validate_accepts_defaults() {
        assert!(config().validate().is_ok());
    }

    #[test]
    fn validate_rejects_empty_cert_path() {
        let mut cfg = config();
        cfg.tls_cert_path = "".into();
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn validate_rejects_empty_hosts() {
        let mut cfg = config();
        cfg.tls_hosts = " , ".into();
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn validate_rejects_inverted_version_bounds() {
        let mut cfg = config();
        cfg.tls_min_version = "1.3".into();
        cfg.tls_max_version = "1.2".into();
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn validate_rejects_unknown_cipher_suite() {
        let mut cfg = config();
        cfg.tls_cipher_suites = "TLS_NOT_A_SUITE".into();
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn lists_are_split_and_trimmed() {
        let mut cfg = config();
        cfg.tls_hosts = "localhost, gateway.internal ,".into();
        cfg.tls_trusted_ca_paths = "/etc/ca/root.pem,/etc/ca/extra.pem".into();
        assert_eq!(cfg.hosts(), vec!["localhost", "gateway.internal"]);
        assert_eq!(
            cfg.trusted_ca_paths(),
            vec!["/etc/ca/root.pem", "/etc/ca/extra.pem"]
        );
    }

    #[test]
    fn empty_ca_paths_yield_empty_list() {
        assert!(config().trusted_ca_paths().is_empty());
    }

    #[test]
    fn server_config_falls_back_when_paths_missing() {
        let dir = tempfile::TempDir::new().unwrap();
        let mut cfg = config();
        cfg.tls_cert_path = dir.path().join("tls.crt").display().to_string();
        cfg.tls_key_path = dir.path().join("tls.key").display().to_string();

        let server = cfg.server_config().unwrap();
        assert_eq!(server.min_version, Some(crate::policy::TlsVersion::Tls12));
        assert_eq!(server.cipher_suites.len(), 3);
    }
}
