//! Respite shared configuration store.
//!
//! Implements [`respite::ConfigStore`] over a TOML file merged with
//! `RESPITE_`-prefixed environment variables.
//!
//! ## File shape
//!
//! ```toml
//! brand = "acme"
//!
//! [services.billing_service]
//! host = "billing.internal.example"
//! port = 8443
//! pass = "shared-secret"
//! namespace = "billing"
//! ```
//!
//! Environment variables use `__` as the nesting separator, e.g.
//! `RESPITE_SERVICES__BILLING_SERVICE__PORT=9443`.
//!
//! ## Architectural Layer
//!
//! **Infrastructure.** File and environment access live here. The
//! [`respite`] crate sees only [`respite::ConfigStore`].

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use figment::providers::{Env, Format, Toml};
use figment::Figment;
use respite::{Brand, ConfigStore, ServiceEntry};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

/// Prefix for environment overrides.
pub const ENV_PREFIX: &str = "RESPITE_";

/// Variable naming the configuration file for [`SharedSettings::discover`].
pub const CONFIG_PATH_ENV: &str = "RESPITE_CONFIG";

/// File used by [`SharedSettings::discover`] when [`CONFIG_PATH_ENV`] is unset.
pub const DEFAULT_CONFIG_FILE: &str = "respite.toml";

/// Errors raised while loading shared configuration.
#[derive(Debug, Error)]
pub enum SettingsError {
    /// The file or environment could not be parsed into [`SharedSettings`].
    #[error("Failed to load shared configuration from {path}: {source}")]
    Load {
        path: PathBuf,
        #[source]
        source: Box<figment::Error>,
    },
}

/// Process-wide service configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SharedSettings {
    /// Brand used when a service entry does not name one.
    pub brand: Option<Brand>,
    /// Service entries keyed by store key (`billing_service`, `billing`, ...).
    pub services: BTreeMap<String, ServiceEntry>,
}

impl SharedSettings {
    /// The provider stack: the TOML file, then environment overrides.
    pub fn figment(path: impl AsRef<Path>) -> Figment {
        Figment::new().merge(Toml::file(path.as_ref())).merge(
            Env::prefixed(ENV_PREFIX)
                .ignore(&["config", "debug_http", "pass"])
                .split("__"),
        )
    }

    /// Loads settings from `path` plus the environment.
    ///
    /// A missing file is not an error; the environment alone may supply every
    /// value.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::Load`] if a value has the wrong shape.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, SettingsError> {
        let path = path.as_ref();
        let settings: Self = Self::figment(path)
            .extract()
            .map_err(|source| SettingsError::Load {
                path: path.to_path_buf(),
                source: Box::new(source),
            })?;
        debug!(
            path = %path.display(),
            services = settings.services.len(),
            "Loaded shared configuration"
        );
        Ok(settings)
    }

    /// Loads from `$RESPITE_CONFIG`, or `./respite.toml` when unset.
    ///
    /// # Errors
    ///
    /// Same as [`SharedSettings::load`].
    pub fn discover() -> Result<Self, SettingsError> {
        let path = std::env::var_os(CONFIG_PATH_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));
        Self::load(path)
    }
}

impl ConfigStore for SharedSettings {
    fn service(&self, key: &str) -> Option<ServiceEntry> {
        self.services.get(key).cloned()
    }

    fn brand(&self) -> Option<Brand> {
        self.brand.clone()
    }
}
