//! Credential types

use chrono::{DateTime, Utc};
use std::fmt;

/// Stored field names under `secure.credentials.<id>.`
pub mod field {
    /// Username field
    pub const USERNAME: &str = "username";
    /// Password field
    pub const PASSWORD: &str = "password";
    /// Token field
    pub const TOKEN: &str = "token";
    /// Free-text description
    pub const DESCRIPTION: &str = "description";
    /// RFC 3339 time of last update
    pub const LAST_UPDATED_TIME: &str = "lastUpdated.time";
    /// User who last updated
    pub const LAST_UPDATED_USER: &str = "lastUpdated.user";
}

/// Secret material, by kind
#[derive(Clone, PartialEq, Eq)]
pub enum Credentials {
    /// Username only
    Username { username: String },
    /// Bearer token only
    Token { token: String },
    /// Username and password
    UsernamePassword { username: String, password: String },
    /// Username and token
    UsernameToken { username: String, token: String },
}

impl Credentials {
    /// Build from whichever fields are present
    ///
    /// Returns `None` if neither a username nor a token is present.
    /// A password without a username is ignored.
    #[must_use]
    pub fn from_fields(
        username: Option<String>,
        password: Option<String>,
        token: Option<String>,
    ) -> Option<Self> {
        match (username, password, token) {
            (Some(username), Some(password), _) => Some(Self::UsernamePassword { username, password }),
            (Some(username), None, Some(token)) => Some(Self::UsernameToken { username, token }),
            (Some(username), None, None) => Some(Self::Username { username }),
            (None, _, Some(token)) => Some(Self::Token { token }),
            (None, _, None) => None,
        }
    }

    /// Kind name
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Username { .. } => "Username",
            Self::Token { .. } => "Token",
            Self::UsernamePassword { .. } => "UsernamePassword",
            Self::UsernameToken { .. } => "UsernameToken",
        }
    }

    /// Username, if this kind has one
    #[must_use]
    pub fn username(&self) -> Option<&str> {
        match self {
            Self::Username { username }
            | Self::UsernamePassword { username, .. }
            | Self::UsernameToken { username, .. } => Some(username),
            Self::Token { .. } => None,
        }
    }

    /// `(field, plaintext)` pairs to persist
    #[must_use]
    pub fn fields(&self) -> Vec<(&'static str, &str)> {
        match self {
            Self::Username { username } => vec![(field::USERNAME, username.as_str())],
            Self::Token { token } => vec![(field::TOKEN, token.as_str())],
            Self::UsernamePassword { username, password } => {
                vec![(field::USERNAME, username.as_str()), (field::PASSWORD, password.as_str())]
            }
            Self::UsernameToken { username, token } => {
                vec![(field::USERNAME, username.as_str()), (field::TOKEN, token.as_str())]
            }
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct(self.kind())
            .field("username", &self.username())
            .finish_non_exhaustive()
    }
}

/// Bookkeeping stored next to the secret
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CredentialsMetadata {
    /// Free-text description
    pub description: Option<String>,
    /// Time of last update
    pub last_updated_time: Option<DateTime<Utc>>,
    /// User who last updated
    pub last_updated_user: Option<String>,
}

impl CredentialsMetadata {
    /// With description
    #[inline]
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// With last-updated user
    #[inline]
    #[must_use]
    pub fn with_last_updated_user(mut self, user: impl Into<String>) -> Self {
        self.last_updated_user = Some(user.into());
        self
    }

    /// With last-updated time
    #[inline]
    #[must_use]
    pub fn with_last_updated_time(mut self, time: DateTime<Utc>) -> Self {
        self.last_updated_time = Some(time);
        self
    }
}

/// Credentials plus their metadata
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredCredentials {
    /// Credentials id
    pub id: String,
    /// Secret material
    pub credentials: Credentials,
    /// Bookkeeping
    pub metadata: CredentialsMetadata,
}
