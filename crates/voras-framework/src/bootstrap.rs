//! Bootstrap configuration
//!
//! The bootstrap file is `bootstrap.properties` in the Voras home directory
//! and tells the framework where its stores live. Every key is optional;
//! relative paths resolve against the home directory.

use crate::error::{FrameworkError, FrameworkResult};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::debug;
use voras_kvstore::properties;

/// Bootstrap file name inside the home directory
pub const BOOTSTRAP_FILE: &str = "bootstrap.properties";

/// Environment variable naming the home directory
pub const HOME_ENV: &str = "VORAS_HOME";

/// Bootstrap keys
pub mod keys {
    /// CPS backing file
    pub const CONFIG_STORE: &str = "framework.config.store";
    /// DSS backing file
    pub const DSS_STORE: &str = "framework.dynamicstatus.store";
    /// Credentials backing file
    pub const CREDENTIALS_STORE: &str = "framework.credentials.store";
    /// Overrides properties file
    pub const OVERRIDES_FILE: &str = "framework.overrides.file";
    /// Encryption keys YAML file
    pub const ENCRYPTION_KEYS: &str = "framework.encryption.keys";
    /// Fixed run name
    pub const RUN_NAME: &str = "framework.run.name";
}

/// Where the framework finds its stores
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BootstrapConfig {
    /// Home directory
    pub home: PathBuf,
    /// CPS backing file
    pub cps_store: PathBuf,
    /// DSS backing file
    pub dss_store: PathBuf,
    /// Credentials backing file
    pub credentials_store: PathBuf,
    /// Overrides properties file; missing file means no overrides
    pub overrides_file: PathBuf,
    /// Encryption keys file; missing file means no encryption
    pub encryption_keys: PathBuf,
    /// Run name; generated when absent
    pub run_name: Option<String>,
}

impl BootstrapConfig {
    /// Defaults under `home`
    #[must_use]
    pub fn new(home: impl Into<PathBuf>) -> Self {
        let home = home.into();
        Self {
            cps_store: home.join("cps.properties"),
            dss_store: home.join("dss.properties"),
            credentials_store: home.join("credentials.properties"),
            overrides_file: home.join("overrides.properties"),
            encryption_keys: home.join("encryption-keys.yaml"),
            run_name: None,
            home,
        }
    }

    /// Read `bootstrap.properties` under `home`, defaults for anything missing
    ///
    /// # Errors
    /// `FrameworkError::BootstrapIo` if the file exists but cannot be read,
    /// `FrameworkError::Bootstrap` if it is malformed
    pub fn load(home: impl Into<PathBuf>) -> FrameworkResult<Self> {
        let home = home.into();
        let path = home.join(BOOTSTRAP_FILE);
        let values = match std::fs::read_to_string(&path) {
            Ok(text) => properties::parse(&text).map_err(|source| FrameworkError::Bootstrap {
                path: path.clone(),
                source,
            })?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => return Err(FrameworkError::bootstrap_io(path, e)),
        };
        debug!(path = %path.display(), entries = values.len(), "bootstrap loaded");
        Ok(Self::from_properties(home, &values))
    }

    /// Apply bootstrap properties over the defaults
    #[must_use]
    pub fn from_properties(home: impl Into<PathBuf>, values: &BTreeMap<String, String>) -> Self {
        let mut config = Self::new(home);
        let resolve = |home: &Path, key: &str| {
            values
                .get(key)
                .map(|v| v.trim())
                .filter(|v| !v.is_empty())
                .map(|v| home.join(v))
        };
        if let Some(p) = resolve(&config.home, keys::CONFIG_STORE) {
            config.cps_store = p;
        }
        if let Some(p) = resolve(&config.home, keys::DSS_STORE) {
            config.dss_store = p;
        }
        if let Some(p) = resolve(&config.home, keys::CREDENTIALS_STORE) {
            config.credentials_store = p;
        }
        if let Some(p) = resolve(&config.home, keys::OVERRIDES_FILE) {
            config.overrides_file = p;
        }
        if let Some(p) = resolve(&config.home, keys::ENCRYPTION_KEYS) {
            config.encryption_keys = p;
        }
        config.run_name = values
            .get(keys::RUN_NAME)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty());
        config
    }

    /// Set CPS store path
    #[inline]
    #[must_use]
    pub fn with_cps_store(mut self, path: impl Into<PathBuf>) -> Self {
        self.cps_store = path.into();
        self
    }

    /// Set DSS store path
    #[inline]
    #[must_use]
    pub fn with_dss_store(mut self, path: impl Into<PathBuf>) -> Self {
        self.dss_store = path.into();
        self
    }

    /// Set credentials store path
    #[inline]
    #[must_use]
    pub fn with_credentials_store(mut self, path: impl Into<PathBuf>) -> Self {
        self.credentials_store = path.into();
        self
    }

    /// Set overrides file path
    #[inline]
    #[must_use]
    pub fn with_overrides_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.overrides_file = path.into();
        self
    }

    /// Set encryption keys path
    #[inline]
    #[must_use]
    pub fn with_encryption_keys(mut self, path: impl Into<PathBuf>) -> Self {
        self.encryption_keys = path.into();
        self
    }

    /// Set run name
    #[inline]
    #[must_use]
    pub fn with_run_name(mut self, run_name: impl Into<String>) -> Self {
        self.run_name = Some(run_name.into());
        self
    }
}

/// `$VORAS_HOME`, else `$HOME/.voras`, else `./.voras`
#[must_use]
pub fn default_home() -> PathBuf {
    if let Some(home) = std::env::var_os(HOME_ENV).filter(|v| !v.is_empty()) {
        return PathBuf::from(home);
    }
    std::env::var_os("HOME")
        .map_or_else(|| PathBuf::from("."), PathBuf::from)
        .join(".voras")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = BootstrapConfig::load(dir.path()).unwrap();
        assert_eq!(config, BootstrapConfig::new(dir.path()));
        assert_eq!(config.cps_store, dir.path().join("cps.properties"));
        assert_eq!(config.encryption_keys, dir.path().join("encryption-keys.yaml"));
    }

    #[test]
    fn relative_and_absolute_paths() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(BOOTSTRAP_FILE),
            "framework.config.store=conf/cps.props\n\
             framework.dynamicstatus.store=/var/voras/dss.props\n\
             framework.run.name=  U42  \n",
        )
        .unwrap();

        let config = BootstrapConfig::load(dir.path()).unwrap();
        assert_eq!(config.cps_store, dir.path().join("conf/cps.props"));
        assert_eq!(config.dss_store, PathBuf::from("/var/voras/dss.props"));
        assert_eq!(config.run_name.as_deref(), Some("U42"));
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(BOOTSTRAP_FILE), "framework.run.name=\\uZZZZ\n").unwrap();
        let err = BootstrapConfig::load(dir.path()).unwrap_err();
        assert!(matches!(err, FrameworkError::Bootstrap { .. }));
    }

    proptest! {
        #[test]
        fn relative_store_paths_stay_under_home(name in "[a-z]{1,8}(/[a-z]{1,8}){0,2}\\.properties") {
            let home = PathBuf::from("/voras/home");
            let values = BTreeMap::from([(keys::CREDENTIALS_STORE.to_string(), format!(" {name} "))]);
            let config = BootstrapConfig::from_properties(&home, &values);
            prop_assert!(config.credentials_store.starts_with(&home));
            prop_assert_eq!(config.credentials_store, home.join(&name));
            prop_assert_eq!(config.cps_store, home.join("cps.properties"));
        }
    }
}
