//! RSA-OAEP encryption of credentials in transit.
//!
//! The backend hands out its public key in whichever format its deployment
//! produced: PKCS#1 PEM, PKCS#8/SPKI PEM, or bare base64 DER. All three are
//! accepted; detection goes by the PEM header, falling back to DER.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use rsa::pkcs1::DecodeRsaPublicKey;
use rsa::pkcs8::DecodePublicKey;
use rsa::traits::PublicKeyParts;
use rsa::{Oaep, RsaPublicKey};
use sha2::Sha256;
use thiserror::Error;

// OAEP with SHA-256 spends 2 * 32 + 2 bytes of the modulus on padding.
const OAEP_OVERHEAD: usize = 66;

/// Errors from key loading and encryption.
#[derive(Error, Debug)]
pub enum CryptoError {
    #[error("Unsupported or malformed public key: {0}")]
    KeyFormat(String),

    #[error("Encryption failed: {0}")]
    Encryption(String),
}

/// A loaded public key that seals short plaintexts for the backend.
#[derive(Debug, Clone)]
pub struct RsaEnvelope {
    key: RsaPublicKey,
}

impl RsaEnvelope {
    /// Loads a public key from the text the backend's `/key` endpoint
    /// returned.
    pub fn from_key_text(key_text: &str) -> Result<Self, CryptoError> {
        let trimmed = key_text.trim();

        let key = if trimmed.contains("BEGIN RSA PUBLIC KEY") {
            RsaPublicKey::from_pkcs1_pem(trimmed)
                .map_err(|e| CryptoError::KeyFormat(e.to_string()))?
        } else if trimmed.contains("BEGIN PUBLIC KEY") {
            RsaPublicKey::from_public_key_pem(trimmed)
                .map_err(|e| CryptoError::KeyFormat(e.to_string()))?
        } else {
            // Bare base64 DER; tolerate embedded line breaks.
            let compact: String = trimmed.chars().filter(|c| !c.is_whitespace()).collect();
            let der = BASE64
                .decode(compact.as_bytes())
                .map_err(|e| CryptoError::KeyFormat(e.to_string()))?;
            RsaPublicKey::from_public_key_der(&der)
                .map_err(|e| CryptoError::KeyFormat(e.to_string()))?
        };

        Ok(Self { key })
    }

    /// Encrypts a plaintext with OAEP-SHA256 and returns base64 ciphertext.
    ///
    /// A fresh rng is drawn per call, so equal plaintexts never produce
    /// equal ciphertexts.
    pub fn encrypt(&self, plaintext: &str) -> Result<String, CryptoError> {
        let capacity = self.key.size().saturating_sub(OAEP_OVERHEAD);
        if plaintext.len() > capacity {
            return Err(CryptoError::Encryption(format!(
                "plaintext is {} bytes but this key can seal at most {}",
                plaintext.len(),
                capacity
            )));
        }

        let mut rng = rand::thread_rng();
        let ciphertext = self
            .key
            .encrypt(&mut rng, Oaep::new::<Sha256>(), plaintext.as_bytes())
            .map_err(|e| CryptoError::Encryption(e.to_string()))?;

        Ok(BASE64.encode(ciphertext))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rsa::pkcs1::EncodeRsaPublicKey;
    use rsa::pkcs8::{EncodePublicKey, LineEnding};
    use rsa::RsaPrivateKey;
    use std::sync::OnceLock;

    // Key generation dominates test time, so all tests share one key.
    fn test_key() -> &'static RsaPrivateKey {
        static KEY: OnceLock<RsaPrivateKey> = OnceLock::new();
        KEY.get_or_init(|| RsaPrivateKey::new(&mut rand::thread_rng(), 2048).unwrap())
    }

    fn decrypt(ciphertext_b64: &str) -> String {
        let ciphertext = BASE64.decode(ciphertext_b64).unwrap();
        let plaintext = test_key().decrypt(Oaep::new::<Sha256>(), &ciphertext).unwrap();
        String::from_utf8(plaintext).unwrap()
    }

    #[test]
    fn test_loads_pkcs1_pem() {
        let pem = test_key()
            .to_public_key()
            .to_pkcs1_pem(LineEnding::LF)
            .unwrap();
        assert!(pem.contains("BEGIN RSA PUBLIC KEY"));

        let envelope = RsaEnvelope::from_key_text(&pem).unwrap();
        assert_eq!(decrypt(&envelope.encrypt("hello").unwrap()), "hello");
    }

    #[test]
    fn test_loads_pkcs8_pem() {
        let pem = test_key()
            .to_public_key()
            .to_public_key_pem(LineEnding::LF)
            .unwrap();
        assert!(pem.contains("BEGIN PUBLIC KEY"));

        let envelope = RsaEnvelope::from_key_text(&pem).unwrap();
        assert_eq!(decrypt(&envelope.encrypt("hello").unwrap()), "hello");
    }

    #[test]
    fn test_loads_bare_base64_der() {
        let der = test_key().to_public_key().to_public_key_der().unwrap();
        let bare = BASE64.encode(der.as_bytes());

        let envelope = RsaEnvelope::from_key_text(&bare).unwrap();
        assert_eq!(decrypt(&envelope.encrypt("hello").unwrap()), "hello");
    }

    #[test]
    fn test_rejects_garbage_key() {
        let err = RsaEnvelope::from_key_text("definitely not a key").unwrap_err();
        assert!(matches!(err, CryptoError::KeyFormat(_)));

        let err = RsaEnvelope::from_key_text("-----BEGIN PUBLIC KEY-----\nabc\n-----END PUBLIC KEY-----")
            .unwrap_err();
        assert!(matches!(err, CryptoError::KeyFormat(_)));
    }

    #[test]
    fn test_encryption_is_randomized() {
        let pem = test_key()
            .to_public_key()
            .to_public_key_pem(LineEnding::LF)
            .unwrap();
        let envelope = RsaEnvelope::from_key_text(&pem).unwrap();

        let first = envelope.encrypt("user@example.com").unwrap();
        let second = envelope.encrypt("user@example.com").unwrap();

        assert_ne!(first, second);
        assert_eq!(decrypt(&first), "user@example.com");
        assert_eq!(decrypt(&second), "user@example.com");
    }

    #[test]
    fn test_oversized_plaintext_is_rejected_without_encrypting() {
        let pem = test_key()
            .to_public_key()
            .to_public_key_pem(LineEnding::LF)
            .unwrap();
        let envelope = RsaEnvelope::from_key_text(&pem).unwrap();

        // 2048-bit key seals at most 256 - 66 = 190 bytes.
        let oversized = "x".repeat(191);
        let err = envelope.encrypt(&oversized).unwrap_err();
        assert!(matches!(err, CryptoError::Encryption(_)));
    }
}
