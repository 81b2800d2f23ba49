//! Credentials persisted under `secure.credentials.<id>.<field>`

use crate::codec::{decode_value, encode_value};
use crate::crypto::Encrypter;
use crate::error::{CredentialsError, CredentialsResult};
use crate::model::{field, Credentials, CredentialsMetadata, StoredCredentials};
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info};
use voras_cps::PropertyStore;
use voras_kvstore::KvAction;

/// Key prefix for all credentials
pub const CREDENTIALS_PREFIX: &str = "secure.credentials.";

/// Read and write credentials in a property store
#[derive(Clone)]
pub struct CredentialsService {
    store: Arc<dyn PropertyStore>,
    encrypter: Option<Encrypter>,
}

impl fmt::Debug for CredentialsService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialsService")
            .field("encrypted", &self.encrypter.is_some())
            .finish_non_exhaustive()
    }
}

fn validate_id(id: &str) -> CredentialsResult<()> {
    if id.is_empty() || id.contains('.') || id.chars().any(char::is_whitespace) {
        return Err(CredentialsError::InvalidId(id.to_string()));
    }
    Ok(())
}

fn id_prefix(id: &str) -> String {
    format!("{CREDENTIALS_PREFIX}{id}.")
}

impl CredentialsService {
    /// Create without encryption keys; new values are stored as `base64:`
    #[must_use]
    pub fn new(store: Arc<dyn PropertyStore>) -> Self {
        Self {
            store,
            encrypter: None,
        }
    }

    /// With encryption keys; new values are stored as `aes:`
    #[inline]
    #[must_use]
    pub fn with_encrypter(mut self, encrypter: Encrypter) -> Self {
        self.encrypter = Some(encrypter);
        self
    }

    /// Fetch credentials by id
    ///
    /// # Errors
    /// - `CredentialsError::InvalidId` for a bad id
    /// - `CredentialsError::Incomplete` if fields exist but form no known kind
    /// - decode and store errors
    pub fn get(&self, id: &str) -> CredentialsResult<Option<StoredCredentials>> {
        validate_id(id)?;
        let prefix = id_prefix(id);
        let raw: BTreeMap<String, String> = self
            .store
            .get_prefix(&prefix)?
            .into_iter()
            .map(|(k, v)| (k[prefix.len()..].to_string(), v))
            .collect();
        if raw.is_empty() {
            return Ok(None);
        }
        self.assemble(id, &raw).map(Some)
    }

    fn assemble(&self, id: &str, raw: &BTreeMap<String, String>) -> CredentialsResult<StoredCredentials> {
        let decode = |name: &str| -> CredentialsResult<Option<String>> {
            raw.get(name)
                .map(|v| decode_value(v, self.encrypter.as_ref()))
                .transpose()
        };

        let credentials = Credentials::from_fields(
            decode(field::USERNAME)?,
            decode(field::PASSWORD)?,
            decode(field::TOKEN)?,
        )
        .ok_or_else(|| CredentialsError::incomplete(id, "no username or token"))?;

        let last_updated_time = raw
            .get(field::LAST_UPDATED_TIME)
            .map(|t| DateTime::parse_from_rfc3339(t.trim()))
            .transpose()
            .map_err(|source| CredentialsError::Timestamp {
                id: id.to_string(),
                source,
            })?
            .map(|t| t.with_timezone(&Utc));

        Ok(StoredCredentials {
            id: id.to_string(),
            credentials,
            metadata: CredentialsMetadata {
                description: raw.get(field::DESCRIPTION).cloned(),
                last_updated_time,
                last_updated_user: raw.get(field::LAST_UPDATED_USER).cloned(),
            },
        })
    }

    /// Store credentials, replacing the whole entry
    ///
    /// Fields of a previous kind and metadata left out of `metadata` are
    /// removed. The entry changes in one store write, so readers see either
    /// the old entry or the new one.
    ///
    /// # Errors
    /// Invalid id, encryption or store errors
    pub fn set(
        &self,
        id: &str,
        credentials: &Credentials,
        metadata: &CredentialsMetadata,
    ) -> CredentialsResult<()> {
        validate_id(id)?;
        let prefix = id_prefix(id);
        let enc = self.encrypter.as_ref();

        let mut entries: Vec<(&str, String)> = Vec::new();
        for (name, plain) in credentials.fields() {
            entries.push((name, encode_value(plain, enc)?));
        }
        if let Some(description) = &metadata.description {
            entries.push((field::DESCRIPTION, description.clone()));
        }
        if let Some(time) = &metadata.last_updated_time {
            entries.push((field::LAST_UPDATED_TIME, time.to_rfc3339()));
        }
        if let Some(user) = &metadata.last_updated_user {
            entries.push((field::LAST_UPDATED_USER, user.clone()));
        }

        let mut actions = vec![KvAction::delete_prefix(prefix.as_str())];
        actions.extend(
            entries
                .iter()
                .map(|(name, value)| KvAction::update(format!("{prefix}{name}"), value.as_str())),
        );
        self.store.perform_actions(&actions)?;

        info!(id, kind = credentials.kind(), "credentials stored");
        Ok(())
    }

    /// Delete every field of the credentials
    ///
    /// # Errors
    /// Invalid id or store errors
    pub fn delete(&self, id: &str) -> CredentialsResult<()> {
        validate_id(id)?;
        let prefix = id_prefix(id);
        self.store
            .perform_actions(&[KvAction::delete_prefix(prefix.as_str())])?;
        debug!(id, "credentials deleted");
        Ok(())
    }

    /// Every credentials id present
    ///
    /// # Errors
    /// Store errors
    pub fn ids(&self) -> CredentialsResult<BTreeSet<String>> {
        Ok(self
            .store
            .get_prefix(CREDENTIALS_PREFIX)?
            .keys()
            .filter_map(|k| k[CREDENTIALS_PREFIX.len()..].split('.').next())
            .filter(|id| !id.is_empty())
            .map(str::to_string)
            .collect())
    }

    /// Every stored credentials entry, in id order
    ///
    /// # Errors
    /// Decode or store errors for any entry
    pub fn list(&self) -> CredentialsResult<Vec<StoredCredentials>> {
        let mut all = Vec::new();
        for id in self.ids()? {
            if let Some(creds) = self.get(&id)? {
                all.push(creds);
            }
        }
        Ok(all)
    }
}
