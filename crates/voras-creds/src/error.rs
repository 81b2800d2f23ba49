//! Error types for credentials handling

use voras_kvstore::KvStoreError;

/// Errors raised while reading, writing or decoding credentials
#[derive(Debug, thiserror::Error)]
pub enum CredentialsError {
    /// Backing store failed
    #[error("store error: {0}")]
    Store(#[from] KvStoreError),

    /// `aes:` value could not be decrypted with any configured key
    #[error("unable to decrypt value with the primary key or {fallbacks} fallback key(s)")]
    Decrypt { fallbacks: usize },

    /// `aes:` value found but no keys are configured
    #[error("value is encrypted but no encryption keys are configured")]
    NoKeys,

    /// Ciphertext is too short to hold an IV and tag
    #[error("ciphertext is truncated ({len} bytes)")]
    Truncated { len: usize },

    /// Encryption failed
    #[error("encryption failed")]
    Encrypt,

    /// Base64 payload is invalid
    #[error("invalid base64: {0}")]
    Base64(#[from] base64::DecodeError),

    /// Decoded bytes are not UTF-8
    #[error("decoded value is not valid utf-8")]
    Utf8(#[from] std::string::FromUtf8Error),

    /// Encryption key is not a base64 AES-256 key
    #[error("invalid encryption key: {reason}")]
    InvalidKey { reason: String },

    /// Key file could not be read
    #[error("failed to read key file {path}: {source}")]
    KeyFileIo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Key file is not valid YAML
    #[error("malformed key file {path}: {source}")]
    KeyFileFormat {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },

    /// Credentials id is unusable as a key segment
    #[error("invalid credentials id: '{0}'")]
    InvalidId(String),

    /// Stored fields do not form a known credentials type
    #[error("credentials '{id}' are incomplete: {reason}")]
    Incomplete { id: String, reason: String },

    /// Stored timestamp is not RFC 3339
    #[error("credentials '{id}' have an invalid timestamp: {source}")]
    Timestamp {
        id: String,
        #[source]
        source: chrono::ParseError,
    },
}

impl CredentialsError {
    /// Create invalid key error
    pub fn invalid_key(reason: impl Into<String>) -> Self {
        Self::InvalidKey {
            reason: reason.into(),
        }
    }

    /// Create incomplete credentials error
    pub fn incomplete(id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Incomplete {
            id: id.into(),
            reason: reason.into(),
        }
    }

    /// True when the value exists but could not be turned back into plaintext
    #[inline]
    #[must_use]
    pub fn is_decode_failure(&self) -> bool {
        matches!(
            self,
            Self::Decrypt { .. } | Self::NoKeys | Self::Truncated { .. } | Self::Base64(_) | Self::Utf8(_)
        )
    }
}

/// Result alias for credentials operations
pub type CredentialsResult<T> = Result<T, CredentialsError>;
