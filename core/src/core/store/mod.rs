//! Durable maintenance record with a write-through read cache.

use crate::core::cache::EphemeralCache;
use crate::core::error::{GateError, StoreError};
use crate::types::{GateSettings, MaintenanceConfig};
use std::sync::Arc;

/// Durable string properties addressed by name.
pub trait PropertyStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;
}

impl<T: PropertyStore + ?Sized> PropertyStore for Arc<T> {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        (**self).set(key, value)
    }
}

/// Reads and writes the single [`MaintenanceConfig`] record.
///
/// Reads never fail: a missing, corrupt or unreachable record yields the
/// default configuration. Only records that came from the store are cached.
/// Writes go to the durable store first and then replace the cached copy, so
/// the next read observes them immediately.
pub struct MaintenanceStore<P, C> {
    properties: P,
    cache: C,
    settings: GateSettings,
}

impl<P: PropertyStore, C: EphemeralCache> MaintenanceStore<P, C> {
    pub fn new(properties: P, cache: C, settings: GateSettings) -> Self {
        Self {
            properties,
            cache,
            settings,
        }
    }

    pub fn settings(&self) -> &GateSettings {
        &self.settings
    }

    /// The record returned when nothing valid is stored.
    pub fn default_config(&self) -> MaintenanceConfig {
        MaintenanceConfig::disabled(
            self.settings.maintenance.default_message.clone(),
            self.settings.maintenance.allow_admins_default,
        )
    }

    pub fn read(&self) -> MaintenanceConfig {
        if let Some(config) = self.cached() {
            return config;
        }

        match self.load() {
            Ok(config) => {
                self.refresh_cache(&config);
                config
            }
            // Not cached: the fallback answers this call only.
            Err(e) => {
                tracing::error!(error = %e, "failed to read maintenance status");
                self.default_config()
            }
        }
    }

    /// Reads the stored record for a read-modify-write, skipping the cache.
    /// Unlike [`read`](Self::read), an unreachable store is an error.
    pub fn read_for_update(&self) -> Result<MaintenanceConfig, StoreError> {
        self.load()
    }

    /// Validates and persists `config` as one record. Nothing is written if
    /// validation fails.
    pub fn write(&self, config: &MaintenanceConfig) -> Result<(), GateError> {
        config.validate()?;

        let json = serde_json::to_string(config).map_err(StoreError::from)?;
        self.properties.set(&self.settings.keys.status_key, &json)?;

        self.refresh_cache(config);
        Ok(())
    }

    fn cached(&self) -> Option<MaintenanceConfig> {
        let json = match self.cache.get(&self.settings.keys.cache_key) {
            Ok(json) => json?,
            Err(e) => {
                tracing::error!(error = %e, "maintenance cache read failed");
                return None;
            }
        };

        match serde_json::from_str::<MaintenanceConfig>(&json) {
            Ok(config) if config.validate().is_ok() => Some(config),
            _ => {
                tracing::warn!("discarding unreadable cached maintenance status");
                None
            }
        }
    }

    /// A missing or unreadable record loads as the default; only a store
    /// failure is an error.
    fn load(&self) -> Result<MaintenanceConfig, StoreError> {
        let Some(json) = self.properties.get(&self.settings.keys.status_key)? else {
            return Ok(self.default_config());
        };

        let config = match serde_json::from_str::<MaintenanceConfig>(&json) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!(error = %e, "stored maintenance status is not valid JSON");
                return Ok(self.default_config());
            }
        };

        if let Err(e) = config.validate() {
            tracing::warn!(error = %e, "stored maintenance status is invalid");
            return Ok(self.default_config());
        }
        Ok(config)
    }

    fn refresh_cache(&self, config: &MaintenanceConfig) {
        let json = match serde_json::to_string(config) {
            Ok(json) => json,
            Err(e) => {
                tracing::error!(error = %e, "failed to serialize maintenance status");
                return;
            }
        };

        if let Err(e) = self.cache.put(
            &self.settings.keys.cache_key,
            &json,
            self.settings.cache.ttl(),
        ) {
            tracing::error!(error = %e, "failed to refresh maintenance cache");
        }
    }
}
