//! Stored value encodings
//!
//! | Stored form      | Meaning                           |
//! |------------------|-----------------------------------|
//! | `aes:<payload>`  | AES-256-GCM, see [`crate::crypto`] |
//! | `base64:<data>`  | base64 of the UTF-8 value          |
//! | anything else    | the value itself                   |

use crate::crypto::Encrypter;
use crate::error::{CredentialsError, CredentialsResult};
use base64::{engine::general_purpose, Engine as _};

/// Prefix marking an encrypted value
pub const AES_PREFIX: &str = "aes:";

/// Prefix marking a base64 value
pub const BASE64_PREFIX: &str = "base64:";

/// How a stored value is encoded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueEncoding {
    /// `aes:` ciphertext
    Aes,
    /// `base64:` data
    Base64,
    /// Literal
    Plain,
}

impl ValueEncoding {
    /// Encoding of a stored value
    #[must_use]
    pub fn of(raw: &str) -> Self {
        if raw.starts_with(AES_PREFIX) {
            Self::Aes
        } else if raw.starts_with(BASE64_PREFIX) {
            Self::Base64
        } else {
            Self::Plain
        }
    }
}

/// Turn a stored value back into plaintext
///
/// # Errors
/// - `CredentialsError::NoKeys` for an `aes:` value without an encrypter
/// - decryption, base64 or UTF-8 errors
pub fn decode_value(raw: &str, encrypter: Option<&Encrypter>) -> CredentialsResult<String> {
    if let Some(payload) = raw.strip_prefix(AES_PREFIX) {
        let encrypter = encrypter.ok_or(CredentialsError::NoKeys)?;
        return Ok(String::from_utf8(encrypter.decrypt(payload)?)?);
    }
    if let Some(payload) = raw.strip_prefix(BASE64_PREFIX) {
        let bytes = general_purpose::STANDARD.decode(payload.trim())?;
        return Ok(String::from_utf8(bytes)?);
    }
    Ok(raw.to_string())
}

/// Encode a value for storage; `aes:` when keys are available, else `base64:`
///
/// # Errors
/// `CredentialsError::Encrypt` if the cipher fails
pub fn encode_value(plain: &str, encrypter: Option<&Encrypter>) -> CredentialsResult<String> {
    match encrypter {
        Some(enc) => Ok(format!("{AES_PREFIX}{}", enc.encrypt(plain.as_bytes())?)),
        None => Ok(format!(
            "{BASE64_PREFIX}{}",
            general_purpose::STANDARD.encode(plain.as_bytes())
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::EncryptionKey;
    use voras_test_utils::TEST_KEY;

    #[test]
    fn detects_encoding() {
        assert_eq!(ValueEncoding::of("aes:xyz"), ValueEncoding::Aes);
        assert_eq!(ValueEncoding::of("base64:eHl6"), ValueEncoding::Base64);
        assert_eq!(ValueEncoding::of("xyz"), ValueEncoding::Plain);
    }

    #[test]
    fn decodes_each_form() {
        let enc = Encrypter::new(EncryptionKey::from_bytes(TEST_KEY));
        assert_eq!(decode_value("plain", None).unwrap(), "plain");
        assert_eq!(decode_value("base64:aGVsbG8=", None).unwrap(), "hello");

        let sealed = encode_value("hello", Some(&enc)).unwrap();
        assert!(sealed.starts_with(AES_PREFIX));
        assert_eq!(decode_value(&sealed, Some(&enc)).unwrap(), "hello");
        assert!(matches!(decode_value(&sealed, None), Err(CredentialsError::NoKeys)));
    }

    #[test]
    fn encodes_base64_without_keys() {
        let stored = encode_value("hello", None).unwrap();
        assert_eq!(stored, "base64:aGVsbG8=");
    }

    #[test]
    fn bad_base64_is_an_error() {
        assert!(decode_value("base64:!!!", None).unwrap_err().is_decode_failure());
    }
}
