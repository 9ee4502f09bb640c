//! TLS identity and trust configuration for the palisade gateway.
//!
//! The crate covers four concerns, each in its own module:
//!
//! - [`identity`] — self-signed X.509 certificate generation
//! - [`pem`] — PEM encoding/decoding of chains and private keys
//! - [`policy`] — version and cipher-suite policy parsing
//! - [`pool`] — trust-pool assembly from candidate certificate files
//!
//! [`server`] ties identity loading and fallback generation together into a
//! transport configuration, and [`config`] binds the whole layer to
//! environment variables.

pub mod config;
pub mod identity;
pub mod pem;
pub mod policy;
pub mod pool;
pub mod server;

pub use common::TlsError;

pub use crate::config::Config;
pub use crate::identity::{generate, GeneratedIdentity, IdentityRequest};
pub use crate::pem::{certificates_from_pem, encode_key_pair, generate_pem, PemBundle};
pub use crate::policy::{config_customizer, TlsCustomizer, TlsVersion};
pub use crate::pool::{best_effort_system_pool, load_trust_pool};
pub use crate::server::{create_server_config, IdentityDefaults, ServerTlsConfig, TlsBootstrap};
