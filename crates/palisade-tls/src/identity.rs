//! Self-signed X.509 identity generation.
//!
//! An [`IdentityRequest`] describes the certificate to produce; [`generate`]
//! turns it into a fresh key pair plus a self-signed leaf certificate. The
//! result is owned entirely by the caller — nothing is cached, so two calls
//! with the same request yield two unrelated identities.

use std::net::IpAddr;
use std::time::Duration;

use rand::rngs::OsRng;
use rand::RngCore;
use rcgen::{
    CertificateParams, DnType, ExtendedKeyUsagePurpose, IsCa, KeyPair, KeyUsagePurpose, SanType,
    SerialNumber,
};
use rsa::pkcs8::EncodePrivateKey;
use rsa::RsaPrivateKey;
use rustls::pki_types::{CertificateDer, PrivateKeyDer, PrivatePkcs8KeyDer};
use time::OffsetDateTime;
use tracing::debug;

use common::TlsError;

/// RSA modulus size used when no elliptic curve is requested.
pub const DEFAULT_RSA_BITS: usize = 2048;

/// Validity window applied when [`IdentityRequest::valid_for`] is unset.
pub const DEFAULT_VALID_FOR: Duration = Duration::from_secs(60 * 60);

/// Immutable description of the certificate to produce.
///
/// `hosts` holds DNS names and/or literal IP addresses; each entry is
/// classified at generation time and lands in the matching SAN list.
/// `ecdsa_curve: None` selects an RSA key of [`DEFAULT_RSA_BITS`] bits.
#[derive(Debug, Clone, Default)]
pub struct IdentityRequest {
    /// Subject alternative names, order-preserving.
    pub hosts: Vec<String>,
    /// Subject organization. Must be non-empty.
    pub organization: String,
    /// Start of the validity window. Unset means "now".
    pub valid_from: Option<OffsetDateTime>,
    /// Length of the validity window. Unset means [`DEFAULT_VALID_FOR`].
    pub valid_for: Option<Duration>,
    /// Named ECDSA curve (`"P256"` or `"P384"`). Unset means RSA.
    pub ecdsa_curve: Option<String>,
}

/// A freshly generated certificate and its private key.
///
/// The key is PKCS#8-encoded and is meant to be consumed into a transport
/// configuration; it is not retained anywhere else.
#[derive(Debug)]
pub struct GeneratedIdentity {
    /// DER-encoded self-signed leaf certificate.
    pub cert_der: CertificateDer<'static>,
    /// DER-encoded private key (PKCS#8).
    pub key_der: PrivateKeyDer<'static>,
}

/// Produce a self-signed identity satisfying `req`.
///
/// Inputs are validated before any key material is generated: `hosts` and
/// `organization` must be non-empty, and a supplied curve name must be one
/// of the supported set.
///
/// # Errors
///
/// Returns [`TlsError::Validation`] on empty hosts, empty organization, or an
/// unrecognized curve name; [`TlsError::Generation`] if the crypto layer
/// fails.
pub fn generate(req: &IdentityRequest) -> Result<GeneratedIdentity, TlsError> {
    if req.hosts.is_empty() {
        return Err(TlsError::validation("hosts not supplied"));
    }
    if req.organization.is_empty() {
        return Err(TlsError::validation("organization not supplied"));
    }
    let algorithm = match req.ecdsa_curve.as_deref() {
        None | Some("") => None,
        Some(name) => Some(curve_algorithm(name)?),
    };

    let key_pair = match algorithm {
        Some(alg) => KeyPair::generate_for(alg)
            .map_err(|e| TlsError::Generation(format!("ECDSA key generation: {e}")))?,
        None => rsa_key_pair(DEFAULT_RSA_BITS)?,
    };

    let mut params = CertificateParams::default();
    for host in &req.hosts {
        let san = match host.parse::<IpAddr>() {
            Ok(ip) => SanType::IpAddress(ip),
            Err(_) => SanType::DnsName(
                host.as_str()
                    .try_into()
                    .map_err(|_| TlsError::Validation(format!("invalid host name {host:?}")))?,
            ),
        };
        params.subject_alt_names.push(san);
    }
    params
        .distinguished_name
        .push(DnType::OrganizationName, req.organization.clone());

    let not_before = req.valid_from.unwrap_or_else(OffsetDateTime::now_utc);
    params.not_before = not_before;
    params.not_after = not_before + req.valid_for.unwrap_or(DEFAULT_VALID_FOR);
    params.serial_number = Some(random_serial());

    // A leaf for server authentication, never a CA.
    params.is_ca = IsCa::ExplicitNoCa;
    params.key_usages = vec![
        KeyUsagePurpose::DigitalSignature,
        KeyUsagePurpose::KeyEncipherment,
    ];
    params.extended_key_usages = vec![ExtendedKeyUsagePurpose::ServerAuth];

    let cert = params
        .self_signed(&key_pair)
        .map_err(|e| TlsError::Generation(format!("self-signing: {e}")))?;
    debug!(
        hosts = req.hosts.len(),
        organization = %req.organization,
        "generated self-signed certificate"
    );

    Ok(GeneratedIdentity {
        cert_der: cert.der().clone(),
        key_der: PrivateKeyDer::from(PrivatePkcs8KeyDer::from(key_pair.serialize_der())),
    })
}

/// Map a curve name to its rcgen signature algorithm.
///
/// The ring backend signs with P-256 and P-384 only; every other name is a
/// validation error.
fn curve_algorithm(name: &str) -> Result<&'static rcgen::SignatureAlgorithm, TlsError> {
    match name {
        "P256" => Ok(&rcgen::PKCS_ECDSA_P256_SHA256),
        "P384" => Ok(&rcgen::PKCS_ECDSA_P384_SHA384),
        other => Err(TlsError::Validation(format!(
            "unrecognized elliptic curve {other:?}"
        ))),
    }
}

/// Generate an RSA key with the `rsa` crate and import it into rcgen.
///
/// ring can sign with existing RSA keys but cannot generate them, so the key
/// is produced separately and handed over as PKCS#8 DER.
fn rsa_key_pair(bits: usize) -> Result<KeyPair, TlsError> {
    let key = RsaPrivateKey::new(&mut OsRng, bits)
        .map_err(|e| TlsError::Generation(format!("RSA key generation: {e}")))?;
    let pkcs8 = key
        .to_pkcs8_der()
        .map_err(|e| TlsError::Generation(format!("RSA key encoding: {e}")))?;
    KeyPair::try_from(pkcs8.as_bytes())
        .map_err(|e| TlsError::Generation(format!("RSA key import: {e}")))
}

/// Random positive, non-zero serial number.
fn random_serial() -> SerialNumber {
    let mut bytes = [0u8; 8];
    OsRng.fill_bytes(&mut bytes);
    // Clear the sign bit so the DER INTEGER is positive.
    bytes[0] &= 0x7f;
    if bytes.iter().all(|b| *b == 0) {
        bytes[7] = 1;
    }
    SerialNumber::from(bytes.to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;
    use x509_parser::prelude::*;

    fn request(hosts: &[&str]) -> IdentityRequest {
        IdentityRequest {
            hosts: hosts.iter().map(|h| h.to_string()).collect(),
            organization: "Acme".into(),
            ..IdentityRequest::default()
        }
    }

    fn parse(identity: &GeneratedIdentity) -> X509Certificate<'_> {
        let (rest, cert) = X509Certificate::from_der(identity.cert_der.as_ref()).unwrap();
        assert!(rest.is_empty());
        cert
    }

    #[test]
    fn rejects_empty_hosts() {
        let err = generate(&request(&[])).unwrap_err();
        assert!(err.to_string().contains("hosts not supplied"));
    }

    #[test]
    fn rejects_empty_organization() {
        let mut req = request(&["localhost"]);
        req.organization = String::new();
        let err = generate(&req).unwrap_err();
        assert!(err.to_string().contains("organization not supplied"));
    }

    #[test]
    fn rejects_unknown_curve() {
        let mut req = request(&["localhost"]);
        req.ecdsa_curve = Some("Curve?".into());
        let err = generate(&req).unwrap_err();
        assert!(err.to_string().contains("unrecognized elliptic curve"));
    }

    #[test]
    fn supported_curves_generate() {
        for curve in ["P256", "P384"] {
            let mut req = request(&["localhost"]);
            req.ecdsa_curve = Some(curve.into());
            let identity = generate(&req).unwrap();
            parse(&identity);
        }
    }

    #[test]
    fn default_options_produce_rsa_leaf() {
        let identity = generate(&request(&["localhost"])).unwrap();
        let cert = parse(&identity);

        let san = cert.subject_alternative_name().unwrap().unwrap();
        let dns: Vec<_> = san
            .value
            .general_names
            .iter()
            .filter_map(|gn| match gn {
                GeneralName::DNSName(d) => Some(*d),
                _ => None,
            })
            .collect();
        assert_eq!(dns, vec!["localhost"]);

        let is_ca = cert
            .basic_constraints()
            .unwrap()
            .map(|bc| bc.value.ca)
            .unwrap_or(false);
        assert!(!is_ca);

        let now = OffsetDateTime::now_utc().unix_timestamp();
        assert!((now - cert.validity().not_before.timestamp()).abs() <= 10);
    }

    #[test]
    fn hosts_partition_into_dns_and_ip() {
        let identity = generate(&request(&["localhost", "127.0.0.1", "::1"])).unwrap();
        let cert = parse(&identity);

        assert_eq!(
            cert.subject()
                .iter_organization()
                .next()
                .unwrap()
                .as_str()
                .unwrap(),
            "Acme"
        );

        let san = cert.subject_alternative_name().unwrap().unwrap();
        let mut dns = Vec::new();
        let mut ips = Vec::new();
        for gn in &san.value.general_names {
            match gn {
                GeneralName::DNSName(d) => dns.push(d.to_string()),
                GeneralName::IPAddress(bytes) => ips.push(bytes.len()),
                other => panic!("unexpected SAN entry: {other:?}"),
            }
        }
        assert_eq!(dns, vec!["localhost"]);
        // One IPv4 (4 bytes) and one IPv6 (16 bytes) address.
        assert_eq!(ips, vec![4, 16]);
    }

    #[test]
    fn explicit_validity_window_is_exact() {
        for years in [1u64, 2, 3, 10] {
            let valid_from = OffsetDateTime::now_utc();
            let valid_for = Duration::from_secs(years * 365 * 24 * 60 * 60);
            let mut req = request(&["localhost"]);
            req.ecdsa_curve = Some("P256".into());
            req.valid_from = Some(valid_from);
            req.valid_for = Some(valid_for);

            let identity = generate(&req).unwrap();
            let cert = parse(&identity);
            let validity = cert.validity();
            assert_eq!(
                validity.not_after.timestamp() - validity.not_before.timestamp(),
                valid_for.as_secs() as i64
            );
        }
    }

    #[test]
    fn serial_is_positive_and_non_zero() {
        let mut req = request(&["localhost"]);
        req.ecdsa_curve = Some("P256".into());
        let identity = generate(&req).unwrap();
        let cert = parse(&identity);
        let raw = cert.raw_serial();
        assert!(!raw.is_empty());
        assert_eq!(raw[0] & 0x80, 0);
        assert!(raw.iter().any(|b| *b != 0));
    }
}
