//! Cipher Round-Trip Integration Tests
//!
//! Round-trip law, nonce freshness and failure handling.

use std::sync::Arc;

use barcoder::cipher::{CipherError, CipherKey, CipherRoundTrip};

fn cipher() -> CipherRoundTrip {
    CipherRoundTrip::new(Arc::new(CipherKey::generate()))
}

#[test]
fn test_round_trip_law() {
    let cipher = cipher();

    let mut samples: Vec<String> = vec![
        "SN001".to_string(),
        "a".to_string(),
        " leading and trailing ".to_string(),
        "!\"#$%&'()*+,-./:;<=>?@[\\]^_`{|}~".to_string(),
        "x".repeat(4096),
    ];
    // Every printable ASCII character on its own
    samples.extend((0x20u8..0x7F).map(|b| (b as char).to_string()));

    for sample in samples {
        let token = cipher.encrypt(&sample).unwrap();
        assert_eq!(cipher.decrypt(&token).unwrap(), sample);
    }
}

#[test]
fn test_encryption_is_not_deterministic() {
    let cipher = cipher();

    let first = cipher.encrypt("SN001").unwrap();
    let second = cipher.encrypt("SN001").unwrap();

    assert_ne!(first, second);
    assert_eq!(cipher.decrypt(&first).unwrap(), "SN001");
    assert_eq!(cipher.decrypt(&second).unwrap(), "SN001");
}

#[test]
fn test_token_does_not_contain_plaintext() {
    let cipher = cipher();
    let token = cipher.encrypt("VISIBLESERIAL").unwrap();
    assert!(!token.contains("VISIBLESERIAL"));
}

#[test]
fn test_other_key_cannot_decrypt() {
    let ours = cipher();
    let theirs = cipher();

    let token = ours.encrypt("SN001").unwrap();
    assert_eq!(theirs.decrypt(&token), None);
    assert_eq!(theirs.try_decrypt(&token), Err(CipherError::Decrypt));
}

#[test]
fn test_shared_key_instance_across_threads() {
    let key = Arc::new(CipherKey::generate());

    let handles: Vec<_> = (0..4)
        .map(|i| {
            let cipher = CipherRoundTrip::new(Arc::clone(&key));
            std::thread::spawn(move || {
                let serial = format!("SN{}", i);
                let token = cipher.encrypt(&serial).unwrap();
                (serial, token)
            })
        })
        .collect();

    let cipher = CipherRoundTrip::new(key);
    for handle in handles {
        let (serial, token) = handle.join().unwrap();
        assert_eq!(cipher.decrypt(&token).unwrap(), serial);
    }
}

#[test]
fn test_garbage_token_is_absent_not_panic() {
    let cipher = cipher();
    assert_eq!(cipher.decrypt(""), None);
    assert_eq!(cipher.decrypt("%%%"), None);
    assert_eq!(cipher.decrypt("AAAA"), None);
}
