//! Voras Credentials
//!
//! Typed credentials stored in the `secure` namespace, with values kept
//! `aes:`-encrypted, `base64:`-encoded or plain.
//!
//! # Overview
//!
//! - **Credentials**: `Username`, `Token`, `UsernamePassword`, `UsernameToken`
//! - **Encrypter**: AES-256-GCM with a random IV per value and fallback keys
//! - **codec**: stored value prefixes
//! - **CredentialsService**: get/set/delete/list over a property store

#![warn(missing_docs)]

pub mod codec;
pub mod crypto;
pub mod error;
pub mod model;
pub mod service;

// Re-exports
pub use codec::{decode_value, encode_value, ValueEncoding};
pub use crypto::{Encrypter, EncryptionKey};
pub use error::{CredentialsError, CredentialsResult};
pub use model::{Credentials, CredentialsMetadata, StoredCredentials};
pub use service::CredentialsService;

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for credentials users
    pub use crate::{
        Credentials, CredentialsError, CredentialsMetadata, CredentialsResult, CredentialsService,
        Encrypter, EncryptionKey, StoredCredentials,
    };
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
