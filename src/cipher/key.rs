//! Process-wide symmetric key.

use std::fmt;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use rand::RngCore;
use sha2::{Digest, Sha256};
use zeroize::Zeroizing;

use super::CipherError;

/// Key length in bytes (AES-256)
pub const KEY_LEN: usize = 32;

/// A 256-bit key shared by every encrypt/decrypt call in the process.
///
/// Key bytes are wiped on drop and never printed; `Debug` shows a short
/// SHA-256 fingerprint instead.
#[derive(Clone)]
pub struct CipherKey {
    bytes: Zeroizing<[u8; KEY_LEN]>,
}

impl CipherKey {
    /// Generate a fresh random key
    pub fn generate() -> Self {
        let mut bytes = Zeroizing::new([0u8; KEY_LEN]);
        rand::rng().fill_bytes(&mut *bytes);
        Self { bytes }
    }

    /// Wrap raw key bytes
    pub fn from_bytes(bytes: [u8; KEY_LEN]) -> Self {
        Self {
            bytes: Zeroizing::new(bytes),
        }
    }

    /// Parse a key from URL-safe base64 (padding optional)
    pub fn from_encoded(encoded: &str) -> Result<Self, CipherError> {
        let trimmed = encoded.trim().trim_end_matches('=');
        let decoded = Zeroizing::new(
            URL_SAFE_NO_PAD
                .decode(trimmed)
                .map_err(|e| CipherError::InvalidKey(format!("not valid base64: {e}")))?,
        );

        if decoded.len() != KEY_LEN {
            return Err(CipherError::InvalidKey(format!(
                "expected {} bytes, got {}",
                KEY_LEN,
                decoded.len()
            )));
        }

        let mut bytes = Zeroizing::new([0u8; KEY_LEN]);
        bytes.copy_from_slice(&decoded);
        Ok(Self { bytes })
    }

    /// Encode the key as URL-safe base64 without padding
    pub fn encoded(&self) -> String {
        URL_SAFE_NO_PAD.encode(self.bytes.as_slice())
    }

    /// Short identifier for logs: first 8 bytes of SHA256(key), hex
    pub fn fingerprint(&self) -> String {
        let digest = Sha256::digest(self.bytes.as_slice());
        hex::encode(&digest[..8])
    }

    pub(crate) fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.bytes
    }
}

impl fmt::Debug for CipherKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CipherKey")
            .field("fingerprint", &self.fingerprint())
            .finish()
    }
}
