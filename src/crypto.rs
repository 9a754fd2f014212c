//! AES-256-GCM sealing of card numbers at rest.
//!
//! A sealed value is `base64(nonce || ciphertext || tag)` with a 12-byte
//! random nonce and a 16-byte tag. The layout is part of the storage format
//! and must not change.
//!
//! Every call to [`CardCipher::encrypt`] draws a fresh nonce from the OS
//! CSPRNG, so sealing the same number twice never yields the same blob.

use crate::error::{CardError, Result};
use aes_gcm::{
    Aes256Gcm, Nonce,
    aead::{Aead, KeyInit},
};
use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use rand::RngCore;
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};
use std::fmt;

pub const KEY_LENGTH: usize = 32;
pub const NONCE_LENGTH: usize = 12;
pub const TAG_LENGTH: usize = 16;

/// The at-rest form of a card number.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EncryptedBlob(String);

impl EncryptedBlob {
    /// Wraps a value loaded from storage. No validation happens until decrypt.
    pub fn from_stored(value: String) -> Self {
        Self(value)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for EncryptedBlob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EncryptedBlob({} chars)", self.0.len())
    }
}

/// Process-wide cipher handle built once from the configured key.
///
/// Shared behind an `Arc`; holds no mutable state.
pub struct CardCipher {
    cipher: Aes256Gcm,
}

impl fmt::Debug for CardCipher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("CardCipher { .. }")
    }
}

impl CardCipher {
    /// Builds the cipher, failing fast unless `key` is exactly 32 bytes.
    pub fn new(key: &[u8]) -> Result<Self> {
        if key.len() != KEY_LENGTH {
            tracing::error!(
                provided = key.len(),
                "Invalid encryption key length, key must be {KEY_LENGTH} bytes"
            );
            return Err(CardError::Configuration(format!(
                "Encryption key must be {KEY_LENGTH} bytes, got {}",
                key.len()
            )));
        }
        let cipher = Aes256Gcm::new_from_slice(key)
            .map_err(|_| CardError::Configuration("Invalid encryption key".to_string()))?;
        Ok(Self { cipher })
    }

    /// Seals `plaintext`. Empty input yields `None` so absent values never
    /// pass through the cipher.
    pub fn encrypt(&self, plaintext: &str) -> Result<Option<EncryptedBlob>> {
        if plaintext.is_empty() {
            return Ok(None);
        }

        let mut nonce_bytes = [0u8; NONCE_LENGTH];
        OsRng.fill_bytes(&mut nonce_bytes);
        let nonce = Nonce::from_slice(&nonce_bytes);

        let sealed = self
            .cipher
            .encrypt(nonce, plaintext.as_bytes())
            .map_err(|_| {
                tracing::error!("Encryption failed");
                CardError::CryptoFailure("encryption failed".to_string())
            })?;

        let mut out = Vec::with_capacity(NONCE_LENGTH + sealed.len());
        out.extend_from_slice(&nonce_bytes);
        out.extend_from_slice(&sealed);
        Ok(Some(EncryptedBlob(BASE64.encode(out))))
    }

    /// Opens a blob produced by [`CardCipher::encrypt`].
    ///
    /// Malformed input, a wrong key or any tampering all fail with
    /// `CryptoFailure`; partial plaintext is never returned.
    pub fn decrypt(&self, blob: &EncryptedBlob) -> Result<String> {
        let data = BASE64.decode(blob.as_str()).map_err(|_| {
            tracing::error!("Encrypted value is not valid base64");
            CardError::CryptoFailure("malformed encrypted value".to_string())
        })?;

        if data.len() < NONCE_LENGTH {
            tracing::error!("Encrypted value is too short");
            return Err(CardError::CryptoFailure(
                "malformed encrypted value".to_string(),
            ));
        }

        let (nonce_bytes, sealed) = data.split_at(NONCE_LENGTH);
        let plaintext = self
            .cipher
            .decrypt(Nonce::from_slice(nonce_bytes), sealed)
            .map_err(|_| {
                tracing::error!("Decryption failed");
                CardError::CryptoFailure("wrong key or corrupted ciphertext".to_string())
            })?;

        String::from_utf8(plaintext)
            .map_err(|_| CardError::CryptoFailure("decrypted value is not UTF-8".to_string()))
    }
}
