//! Symmetric encryption round-trip for serial numbers.
//!
//! The pipeline encrypts every serial number and immediately decrypts it
//! again before rendering. A failure in either direction aborts the request.
//!
//! - `key`: the process-wide [`CipherKey`], built once at startup
//! - `round_trip`: [`CipherRoundTrip`], AES-256-GCM with a fresh nonce per call

pub mod key;
pub mod round_trip;

use std::fmt;

use thiserror::Error;

pub use key::{CipherKey, KEY_LEN};
pub use round_trip::CipherRoundTrip;

/// Encrypt/decrypt gate the pipeline runs every serial number through.
///
/// `None` from either direction aborts the request; implementations log the
/// cause themselves.
pub trait RoundTrip: fmt::Debug + Send + Sync {
    fn encrypt(&self, plaintext: &str) -> Option<String>;
    fn decrypt(&self, token: &str) -> Option<String>;
}

/// Errors raised by the cipher layer.
///
/// Messages never include plaintext or ciphertext.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CipherError {
    #[error("Invalid cipher key: {0}")]
    InvalidKey(String),

    #[error("Encryption failed")]
    Encrypt,

    #[error("Decryption failed (wrong key or tampered token)")]
    Decrypt,

    #[error("Malformed token: {0}")]
    MalformedToken(String),

    #[error("Decrypted payload is not valid UTF-8")]
    Utf8,
}
