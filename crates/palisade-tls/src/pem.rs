//! PEM encoding and decoding for certificate chains and private keys.
//!
//! Certificate material is public and always safe to emit, so certificate
//! encoding never fails. Key material is only emitted when it is verified
//! well-formed; an unsupported or inconsistent key degrades to "no key"
//! instead of aborting the whole encode, letting callers still inspect the
//! certificate half. That partial outcome is first-class: see [`PemBundle`].

use pem::{EncodeConfig, LineEnding, Pem};
use rsa::pkcs1::DecodeRsaPrivateKey;
use rsa::pkcs8::DecodePrivateKey;
use rsa::RsaPrivateKey;
use rustls::pki_types::{CertificateDer, PrivateKeyDer};
use tracing::debug;

use common::TlsError;

use crate::identity::{self, IdentityRequest};

/// The textual form of an identity: certificate chain plus, when the key
/// could be validated and serialised, its private key.
///
/// `key_pem: None` means "certificate produced, key omitted" — a deliberate
/// degraded result, not a failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PemBundle {
    /// Concatenated `CERTIFICATE` blocks, leaf first.
    pub cert_pem: String,
    /// Private-key block, present only for validated key material.
    pub key_pem: Option<String>,
}

/// Generate a self-signed identity and return it PEM-encoded.
///
/// Wraps [`identity::generate`]; validation failures propagate unchanged.
/// On success both halves of the bundle are present.
///
/// # Errors
///
/// Same failure modes as [`identity::generate`].
pub fn generate_pem(req: &IdentityRequest) -> Result<PemBundle, TlsError> {
    let identity = identity::generate(req)?;
    Ok(PemBundle {
        cert_pem: encode_block("CERTIFICATE", identity.cert_der.as_ref()),
        key_pem: Some(encode_block("PRIVATE KEY", identity.key_der.secret_der())),
    })
}

/// Encode an already-constructed chain and key to PEM.
///
/// Every certificate encodes, leaf first, regardless of the key. The key
/// block is emitted only when the key is structurally valid:
/// - PKCS#1 that parses and validates as RSA → `RSA PRIVATE KEY`
/// - PKCS#8 that parses and validates as RSA → `PRIVATE KEY`
/// - SEC1 → `EC PRIVATE KEY`
/// - anything else (including `None`) → omitted
pub fn encode_key_pair(
    certs: &[CertificateDer<'_>],
    key: Option<&PrivateKeyDer<'_>>,
) -> PemBundle {
    let cert_pem: String = certs
        .iter()
        .map(|cert| encode_block("CERTIFICATE", cert.as_ref()))
        .collect();
    let key_pem = key.and_then(encode_private_key);
    if key.is_some() && key_pem.is_none() {
        debug!("private key is not valid serialisable material, omitting from PEM output");
    }
    PemBundle { cert_pem, key_pem }
}

/// Parse zero or more `CERTIFICATE` blocks out of PEM text.
///
/// Order is preserved, so an encode/decode round trip yields byte-identical
/// DER for each certificate in the chain.
///
/// # Errors
///
/// Returns [`TlsError::Validation`] if the input contains a malformed block.
pub fn certificates_from_pem(pem: &[u8]) -> Result<Vec<CertificateDer<'static>>, TlsError> {
    let mut reader = pem;
    rustls_pemfile::certs(&mut reader)
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| TlsError::Validation(format!("invalid PEM certificate data: {e}")))
}

fn encode_block(tag: &str, der: &[u8]) -> String {
    pem::encode_config(
        &Pem::new(tag, der.to_vec()),
        EncodeConfig::new().set_line_ending(LineEnding::LF),
    )
}

fn encode_private_key(key: &PrivateKeyDer<'_>) -> Option<String> {
    match key {
        PrivateKeyDer::Pkcs1(der) => {
            let parsed = RsaPrivateKey::from_pkcs1_der(der.secret_pkcs1_der()).ok()?;
            parsed.validate().ok()?;
            Some(encode_block("RSA PRIVATE KEY", der.secret_pkcs1_der()))
        }
        PrivateKeyDer::Pkcs8(der) => {
            let parsed = RsaPrivateKey::from_pkcs8_der(der.secret_pkcs8_der()).ok()?;
            parsed.validate().ok()?;
            Some(encode_block("PRIVATE KEY", der.secret_pkcs8_der()))
        }
        // SEC1 blobs round-trip at the block level.
        PrivateKeyDer::Sec1(der) => Some(encode_block("EC PRIVATE KEY", der.secret_sec1_der())),
        _ => None,
    }
}
