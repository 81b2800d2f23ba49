//! AES-256-GCM value encryption
//!
//! Every encryption draws a fresh random 12-byte IV. The stored form is
//! `base64(iv || ciphertext || tag)`. Decryption tries the primary key, then
//! each fallback key in order.

use crate::error::{CredentialsError, CredentialsResult};
use aes_gcm::aead::{Aead, AeadCore, KeyInit, OsRng};
use aes_gcm::{Aes256Gcm, Key, Nonce};
use base64::{engine::general_purpose, Engine as _};
use serde::Deserialize;
use std::fmt;
use std::path::Path;
use tracing::{debug, warn};

/// IV length in bytes
pub const IV_LEN: usize = 12;

/// GCM tag length in bytes
pub const TAG_LEN: usize = 16;

/// AES-256 key length in bytes
pub const KEY_LEN: usize = 32;

/// One AES-256 key
#[derive(Clone, PartialEq, Eq)]
pub struct EncryptionKey([u8; KEY_LEN]);

impl EncryptionKey {
    /// Wrap raw key bytes
    #[inline]
    #[must_use]
    pub fn from_bytes(bytes: [u8; KEY_LEN]) -> Self {
        Self(bytes)
    }

    /// Decode a base64 key
    ///
    /// # Errors
    /// `CredentialsError::InvalidKey` unless it decodes to 32 bytes
    pub fn from_base64(encoded: &str) -> CredentialsResult<Self> {
        let raw = general_purpose::STANDARD
            .decode(encoded.trim())
            .map_err(|e| CredentialsError::invalid_key(e.to_string()))?;
        let bytes: [u8; KEY_LEN] = raw
            .try_into()
            .map_err(|raw: Vec<u8>| CredentialsError::invalid_key(format!("expected {KEY_LEN} bytes, got {}", raw.len())))?;
        Ok(Self(bytes))
    }

    /// Generate a random key
    #[must_use]
    pub fn generate() -> Self {
        let key = Aes256Gcm::generate_key(OsRng);
        let mut bytes = [0u8; KEY_LEN];
        bytes.copy_from_slice(&key);
        Self(bytes)
    }

    /// Base64 form of the key
    #[must_use]
    pub fn to_base64(&self) -> String {
        general_purpose::STANDARD.encode(self.0)
    }

    fn cipher(&self) -> Aes256Gcm {
        Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&self.0))
    }
}

impl fmt::Debug for EncryptionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("EncryptionKey(..)")
    }
}

/// On-disk key file layout
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct KeyFile {
    encryption_key: String,
    #[serde(default)]
    fallback_decryption_keys: Vec<String>,
}

/// Primary key plus fallbacks for rotated keys
#[derive(Debug, Clone)]
pub struct Encrypter {
    primary: EncryptionKey,
    fallbacks: Vec<EncryptionKey>,
}

impl Encrypter {
    /// Create with a primary key only
    #[must_use]
    pub fn new(primary: EncryptionKey) -> Self {
        Self {
            primary,
            fallbacks: Vec::new(),
        }
    }

    /// With a fallback decryption key, tried after those already added
    #[inline]
    #[must_use]
    pub fn with_fallback(mut self, key: EncryptionKey) -> Self {
        self.fallbacks.push(key);
        self
    }

    /// Load from YAML `{encryptionKey, fallbackDecryptionKeys}`
    ///
    /// # Errors
    /// I/O, YAML or key decoding errors
    pub fn from_yaml_file(path: impl AsRef<Path>) -> CredentialsResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| CredentialsError::KeyFileIo {
            path: path.display().to_string(),
            source,
        })?;
        let encrypter = Self::from_yaml_str(&text).map_err(|e| match e {
            CredentialsError::KeyFileFormat { source, .. } => CredentialsError::KeyFileFormat {
                path: path.display().to_string(),
                source,
            },
            other => other,
        })?;
        debug!(path = %path.display(), fallbacks = encrypter.fallbacks.len(), "loaded encryption keys");
        Ok(encrypter)
    }

    /// Parse YAML key file text
    ///
    /// # Errors
    /// YAML or key decoding errors
    pub fn from_yaml_str(text: &str) -> CredentialsResult<Self> {
        let file: KeyFile = serde_yaml::from_str(text).map_err(|source| CredentialsError::KeyFileFormat {
            path: "<inline>".to_string(),
            source,
        })?;
        let mut encrypter = Self::new(EncryptionKey::from_base64(&file.encryption_key)?);
        for fallback in &file.fallback_decryption_keys {
            encrypter = encrypter.with_fallback(EncryptionKey::from_base64(fallback)?);
        }
        Ok(encrypter)
    }

    /// Number of fallback keys
    #[inline]
    #[must_use]
    pub fn fallback_count(&self) -> usize {
        self.fallbacks.len()
    }

    /// Encrypt with the primary key
    ///
    /// # Errors
    /// `CredentialsError::Encrypt` if the cipher fails
    pub fn encrypt(&self, plaintext: &[u8]) -> CredentialsResult<String> {
        let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
        let sealed = self
            .primary
            .cipher()
            .encrypt(&nonce, plaintext)
            .map_err(|_| CredentialsError::Encrypt)?;

        let mut out = Vec::with_capacity(IV_LEN + sealed.len());
        out.extend_from_slice(&nonce);
        out.extend_from_slice(&sealed);
        Ok(general_purpose::STANDARD.encode(out))
    }

    /// Decrypt `base64(iv || ciphertext || tag)`
    ///
    /// # Errors
    /// - `CredentialsError::Base64` for invalid base64
    /// - `CredentialsError::Truncated` if shorter than IV plus tag
    /// - `CredentialsError::Decrypt` if no key authenticates the data
    pub fn decrypt(&self, encoded: &str) -> CredentialsResult<Vec<u8>> {
        let raw = general_purpose::STANDARD.decode(encoded.trim())?;
        if raw.len() < IV_LEN + TAG_LEN {
            return Err(CredentialsError::Truncated { len: raw.len() });
        }
        let (iv, sealed) = raw.split_at(IV_LEN);
        let nonce = Nonce::from_slice(iv);

        if let Ok(plain) = self.primary.cipher().decrypt(nonce, sealed) {
            return Ok(plain);
        }
        for (index, key) in self.fallbacks.iter().enumerate() {
            if let Ok(plain) = key.cipher().decrypt(nonce, sealed) {
                warn!(fallback = index, "value decrypted with a fallback key");
                return Ok(plain);
            }
        }
        Err(CredentialsError::Decrypt {
            fallbacks: self.fallbacks.len(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use voras_test_utils::{TEST_FALLBACK_KEY, TEST_KEY};

    fn primary() -> Encrypter {
        Encrypter::new(EncryptionKey::from_bytes(TEST_KEY))
    }

    #[test]
    fn round_trip_and_fresh_iv() {
        let enc = primary();
        let a = enc.encrypt(b"secret").unwrap();
        let b = enc.encrypt(b"secret").unwrap();
        assert_ne!(a, b);
        assert_eq!(enc.decrypt(&a).unwrap(), b"secret");
        assert_eq!(enc.decrypt(&b).unwrap(), b"secret");
    }

    #[test]
    fn fallback_key_decrypts_rotated_value() {
        let old = Encrypter::new(EncryptionKey::from_bytes(TEST_FALLBACK_KEY));
        let sealed = old.encrypt(b"rotated").unwrap();

        assert!(matches!(primary().decrypt(&sealed), Err(CredentialsError::Decrypt { fallbacks: 0 })));
        let rotated = primary().with_fallback(EncryptionKey::from_bytes(TEST_FALLBACK_KEY));
        assert_eq!(rotated.decrypt(&sealed).unwrap(), b"rotated");
    }

    #[test]
    fn tampered_ciphertext_fails() {
        let enc = primary();
        let mut raw = general_purpose::STANDARD.decode(enc.encrypt(b"secret").unwrap()).unwrap();
        let last = raw.len() - 1;
        raw[last] ^= 1;
        let tampered = general_purpose::STANDARD.encode(raw);
        assert!(enc.decrypt(&tampered).unwrap_err().is_decode_failure());
    }

    #[test]
    fn truncated_input() {
        let short = general_purpose::STANDARD.encode([0u8; 10]);
        assert!(matches!(primary().decrypt(&short), Err(CredentialsError::Truncated { len: 10 })));
    }

    #[test]
    fn yaml_key_file() {
        let primary_b64 = EncryptionKey::from_bytes(TEST_KEY).to_base64();
        let fallback_b64 = EncryptionKey::from_bytes(TEST_FALLBACK_KEY).to_base64();
        let yaml = format!("encryptionKey: {primary_b64}\nfallbackDecryptionKeys:\n  - {fallback_b64}\n");
        let enc = Encrypter::from_yaml_str(&yaml).unwrap();
        assert_eq!(enc.fallback_count(), 1);

        let only_primary = Encrypter::from_yaml_str(&format!("encryptionKey: {primary_b64}\n")).unwrap();
        assert_eq!(only_primary.fallback_count(), 0);
    }

    #[test]
    fn rejects_short_key() {
        let short = general_purpose::STANDARD.encode([1u8; 16]);
        assert!(matches!(
            EncryptionKey::from_base64(&short),
            Err(CredentialsError::InvalidKey { .. })
        ));
    }
}
