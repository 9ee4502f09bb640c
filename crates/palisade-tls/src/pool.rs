//! Trust-pool assembly from candidate certificate files.
//!
//! Two distinct outcomes exist at this boundary and must not be conflated:
//! a candidate file that is absent is skipped (the pool is best-effort over
//! optional inputs), while a file that is present but does not hold exactly
//! one well-formed certificate aborts the whole load. Callers therefore can
//! trust that a returned pool reflects every readable input.

use std::io::ErrorKind;
use std::path::Path;

use rustls::RootCertStore;
use tracing::debug;

use common::TlsError;

/// Build a verification pool from zero or more candidate certificate files.
///
/// Each file must contain exactly one PEM `CERTIFICATE` block holding a
/// well-formed X.509 certificate. Missing files are skipped silently; an
/// empty pool is a valid result when every path was skipped.
///
/// # Errors
///
/// Returns [`TlsError::Read`] for a file that exists but cannot be read, and
/// [`TlsError::Malformed`] for content that is not a single well-formed
/// certificate.
pub fn load_trust_pool<P: AsRef<Path>>(paths: &[P]) -> Result<RootCertStore, TlsError> {
    let mut pool = RootCertStore::empty();
    for path in paths {
        let path = path.as_ref();
        let bytes = match std::fs::read(path) {
            Ok(bytes) => bytes,
            Err(source) if source.kind() == ErrorKind::NotFound => {
                debug!(path = %path.display(), "trust-pool candidate missing, skipping");
                continue;
            }
            Err(source) => {
                return Err(TlsError::Read {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };

        let mut reader = bytes.as_slice();
        let certs = rustls_pemfile::certs(&mut reader)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| TlsError::Malformed {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;
        let count = certs.len();
        let mut certs = certs.into_iter();
        let cert = match (certs.next(), certs.next()) {
            (Some(cert), None) => cert,
            _ => {
                return Err(TlsError::Malformed {
                    path: path.to_path_buf(),
                    reason: format!("expected exactly one certificate, found {count}"),
                })
            }
        };

        // Reject DER that rustls would otherwise accept into the store
        // without being a well-formed certificate.
        let (rest, _) = x509_parser::parse_x509_certificate(cert.as_ref()).map_err(|e| {
            TlsError::Malformed {
                path: path.to_path_buf(),
                reason: e.to_string(),
            }
        })?;
        if !rest.is_empty() {
            return Err(TlsError::Malformed {
                path: path.to_path_buf(),
                reason: "trailing bytes after certificate".into(),
            });
        }

        pool.add(cert).map_err(|e| TlsError::Malformed {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
    }
    Ok(pool)
}

/// Best-effort ambient trust roots; this call never fails.
///
/// The compiled-in Mozilla root set stands in for the platform trust store,
/// so "unavailable" cannot happen; the contract is still "empty pool, not an
/// error" should the source ever yield nothing.
pub fn best_effort_system_pool() -> RootCertStore {
    let mut pool = RootCertStore::empty();
    pool.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());
    pool
}
