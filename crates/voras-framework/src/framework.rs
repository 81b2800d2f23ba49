//! Framework context
//!
//! One [`Framework`] owns the opened stores for a process and hands out
//! CPS, DSS and credentials views. It is passed explicitly to whatever
//! needs it.

use crate::bootstrap::BootstrapConfig;
use crate::error::FrameworkResult;
use crate::lifecycle::RunLifecycle;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;
use voras_cps::{ConfigurationPropertyService, ConfigurationPropertyStore, OverridesLayer};
use voras_creds::{CredentialsService, Encrypter};
use voras_dss::{DynamicRun, DynamicStatusStore};
use voras_kvstore::KeyValueFile;

/// Opened stores for one process
#[derive(Clone)]
pub struct Framework {
    config: BootstrapConfig,
    cps: ConfigurationPropertyStore,
    dss_store: Arc<KeyValueFile>,
    credentials: CredentialsService,
    run_name: String,
}

impl fmt::Debug for Framework {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Framework")
            .field("home", &self.config.home)
            .field("run_name", &self.run_name)
            .finish_non_exhaustive()
    }
}

impl Framework {
    /// Open every store named by `config`
    ///
    /// Overrides and encryption keys are optional: a missing file leaves the
    /// layer empty.
    ///
    /// # Errors
    /// Any store that cannot be opened, a malformed overrides file or a
    /// malformed key file
    pub fn initialise(config: BootstrapConfig) -> FrameworkResult<Self> {
        let cps_store = Arc::new(KeyValueFile::open(&config.cps_store)?);
        let dss_store = if config.dss_store == config.cps_store {
            Arc::clone(&cps_store)
        } else {
            Arc::new(KeyValueFile::open(&config.dss_store)?)
        };
        let creds_store = if config.credentials_store == config.cps_store {
            Arc::clone(&cps_store)
        } else if config.credentials_store == config.dss_store {
            Arc::clone(&dss_store)
        } else {
            Arc::new(KeyValueFile::open(&config.credentials_store)?)
        };

        let overrides = Arc::new(OverridesLayer::from_file(&config.overrides_file)?);
        debug!(count = overrides.len(), "overrides loaded");
        let cps = ConfigurationPropertyStore::new(cps_store).with_overrides(overrides);

        let mut credentials = CredentialsService::new(creds_store);
        if config.encryption_keys.exists() {
            let encrypter = Encrypter::from_yaml_file(&config.encryption_keys)?;
            debug!(fallbacks = encrypter.fallback_count(), "encryption keys loaded");
            credentials = credentials.with_encrypter(encrypter);
        }

        let run_name = config.run_name.clone().unwrap_or_else(generate_run_name);
        info!(home = %config.home.display(), run = %run_name, "framework initialised");

        Ok(Self {
            config,
            cps,
            dss_store,
            credentials,
            run_name,
        })
    }

    /// Bootstrap configuration in use
    #[inline]
    #[must_use]
    pub fn config(&self) -> &BootstrapConfig {
        &self.config
    }

    /// Shared CPS handle
    #[inline]
    #[must_use]
    pub fn cps(&self) -> &ConfigurationPropertyStore {
        &self.cps
    }

    /// CPS view of one namespace
    ///
    /// # Errors
    /// Invalid or reserved namespace
    pub fn cps_namespace(&self, namespace: &str) -> FrameworkResult<ConfigurationPropertyService> {
        Ok(self.cps.namespace(namespace)?)
    }

    /// DSS view of one namespace
    ///
    /// # Errors
    /// Invalid namespace
    pub fn dss(&self, namespace: &str) -> FrameworkResult<DynamicStatusStore> {
        Ok(DynamicStatusStore::new(Arc::clone(&self.dss_store), namespace)?)
    }

    /// Backing DSS file
    #[inline]
    #[must_use]
    pub fn dss_store(&self) -> &Arc<KeyValueFile> {
        &self.dss_store
    }

    /// Credentials service
    #[inline]
    #[must_use]
    pub fn credentials(&self) -> &CredentialsService {
        &self.credentials
    }

    /// Name of this process's run
    #[inline]
    #[must_use]
    pub fn run_name(&self) -> &str {
        &self.run_name
    }

    /// Run view of this process's run
    ///
    /// # Errors
    /// Run name unusable as a key segment
    pub fn run(&self) -> FrameworkResult<DynamicRun> {
        Ok(DynamicRun::new(Arc::clone(&self.dss_store), &self.run_name)?)
    }

    /// Lifecycle of this process's run
    ///
    /// # Errors
    /// Run name unusable as a key segment
    pub fn lifecycle(&self) -> FrameworkResult<RunLifecycle> {
        Ok(RunLifecycle::new(self.run()?))
    }
}

/// `U` followed by eight upper-case hex digits
fn generate_run_name() -> String {
    let id = Uuid::new_v4().simple().to_string().to_uppercase();
    format!("U{}", &id[..8])
}

#[cfg(test)]
mod tests {
    use super::*;
    use voras_dss::DssKeyAccess;

    #[test]
    fn generated_names_are_distinct_segments() {
        let a = generate_run_name();
        let b = generate_run_name();
        assert_ne!(a, b);
        assert_eq!(a.len(), 9);
        assert!(!a.contains('.'));
    }

    #[test]
    fn shared_file_is_opened_once() {
        let dir = tempfile::tempdir().unwrap();
        let one = dir.path().join("all.properties");
        let config = BootstrapConfig::new(dir.path())
            .with_cps_store(&one)
            .with_dss_store(&one)
            .with_credentials_store(&one)
            .with_run_name("R7");

        let fw = Framework::initialise(config).unwrap();
        fw.dss("zos").unwrap().put("state", "up").unwrap();
        assert_eq!(
            fw.cps().store().get("dss.zos.state").unwrap().as_deref(),
            Some("up")
        );
        assert_eq!(fw.run_name(), "R7");
        assert!(fw.credentials().ids().unwrap().is_empty());
    }
}
