//! Common error types shared across `palisade` crates.

pub mod error;

pub use error::TlsError;
