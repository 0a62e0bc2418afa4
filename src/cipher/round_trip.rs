//! AES-256-GCM encrypt/decrypt of text payloads.
//!
//! Token layout: URL-safe base64 (no padding) of `nonce || ciphertext || tag`.

use std::sync::Arc;

use aes_gcm::{
    aead::{generic_array::GenericArray, Aead, KeyInit},
    Aes256Gcm,
};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use rand::RngCore;
use tracing::{error, info};

use super::{CipherError, CipherKey, RoundTrip};

const NONCE_LEN: usize = 12;
const TAG_LEN: usize = 16;

/// Encrypt/decrypt bound to a single injected key.
///
/// `encrypt` and `decrypt` swallow failures: they log the cause and return
/// `None`. Use `try_encrypt`/`try_decrypt` to get the typed error.
#[derive(Debug, Clone)]
pub struct CipherRoundTrip {
    key: Arc<CipherKey>,
}

impl CipherRoundTrip {
    /// Bind to a key
    pub fn new(key: Arc<CipherKey>) -> Self {
        Self { key }
    }

    /// The key this instance uses
    pub fn key(&self) -> &CipherKey {
        &self.key
    }

    fn cipher(&self) -> Result<Aes256Gcm, CipherError> {
        Aes256Gcm::new_from_slice(self.key.as_bytes())
            .map_err(|e| CipherError::InvalidKey(e.to_string()))
    }

    /// Encrypt `plaintext` with a fresh random nonce
    pub fn try_encrypt(&self, plaintext: &str) -> Result<String, CipherError> {
        let mut nonce = [0u8; NONCE_LEN];
        rand::rng().fill_bytes(&mut nonce);

        let ciphertext = self
            .cipher()?
            .encrypt(GenericArray::from_slice(&nonce), plaintext.as_bytes())
            .map_err(|_| CipherError::Encrypt)?;

        let mut token = Vec::with_capacity(NONCE_LEN + ciphertext.len());
        token.extend_from_slice(&nonce);
        token.extend_from_slice(&ciphertext);

        Ok(URL_SAFE_NO_PAD.encode(token))
    }

    /// Decrypt a token produced by [`try_encrypt`](Self::try_encrypt)
    pub fn try_decrypt(&self, token: &str) -> Result<String, CipherError> {
        let raw = URL_SAFE_NO_PAD
            .decode(token.trim())
            .map_err(|e| CipherError::MalformedToken(e.to_string()))?;

        if raw.len() < NONCE_LEN + TAG_LEN {
            return Err(CipherError::MalformedToken(format!(
                "token too short ({} bytes)",
                raw.len()
            )));
        }

        let (nonce, ciphertext) = raw.split_at(NONCE_LEN);
        let plaintext = self
            .cipher()?
            .decrypt(GenericArray::from_slice(nonce), ciphertext)
            .map_err(|_| CipherError::Decrypt)?;

        String::from_utf8(plaintext).map_err(|_| CipherError::Utf8)
    }

    /// Encrypt, logging the outcome. `None` means the pipeline must abort.
    pub fn encrypt(&self, plaintext: &str) -> Option<String> {
        match self.try_encrypt(plaintext) {
            Ok(token) => {
                info!("Data encrypted successfully");
                Some(token)
            }
            Err(e) => {
                error!(error = %e, "Encryption error");
                None
            }
        }
    }

    /// Decrypt, logging the outcome. `None` means the pipeline must abort.
    pub fn decrypt(&self, token: &str) -> Option<String> {
        match self.try_decrypt(token) {
            Ok(plaintext) => {
                info!("Data decrypted successfully");
                Some(plaintext)
            }
            Err(e) => {
                error!(error = %e, "Decryption error");
                None
            }
        }
    }
}

impl RoundTrip for CipherRoundTrip {
    fn encrypt(&self, plaintext: &str) -> Option<String> {
        CipherRoundTrip::encrypt(self, plaintext)
    }

    fn decrypt(&self, token: &str) -> Option<String> {
        CipherRoundTrip::decrypt(self, token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn round_trip() -> CipherRoundTrip {
        CipherRoundTrip::new(Arc::new(CipherKey::generate()))
    }

    #[test]
    fn test_round_trip_restores_plaintext() {
        let cipher = round_trip();
        let token = cipher.try_encrypt("SN001").unwrap();
        assert_eq!(cipher.try_decrypt(&token).unwrap(), "SN001");
    }

    #[test]
    fn test_token_is_url_safe() {
        let cipher = round_trip();
        let token = cipher.try_encrypt("serial/with+chars").unwrap();
        assert!(token
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
    }

    #[test]
    fn test_short_token_rejected() {
        let cipher = round_trip();
        let short = URL_SAFE_NO_PAD.encode([0u8; 10]);
        assert!(matches!(
            cipher.try_decrypt(&short),
            Err(CipherError::MalformedToken(_))
        ));
    }

    #[test]
    fn test_not_base64_rejected() {
        let cipher = round_trip();
        assert!(matches!(
            cipher.try_decrypt("!!!"),
            Err(CipherError::MalformedToken(_))
        ));
        assert_eq!(cipher.decrypt("!!!"), None);
    }

    #[test]
    fn test_tampered_token_rejected() {
        let cipher = round_trip();
        let token = cipher.try_encrypt("SN001").unwrap();
        let mut raw = URL_SAFE_NO_PAD.decode(&token).unwrap();
        let last = raw.len() - 1;
        raw[last] ^= 0x01;
        let tampered = URL_SAFE_NO_PAD.encode(raw);

        assert_eq!(cipher.try_decrypt(&tampered), Err(CipherError::Decrypt));
    }

    #[test]
    fn test_empty_plaintext_round_trips() {
        let cipher = round_trip();
        let token = cipher.encrypt("").unwrap();
        assert_eq!(cipher.decrypt(&token).as_deref(), Some(""));
    }
}
