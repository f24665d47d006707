use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Gate settings, persisted as settings.toml.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GateSettings {
    #[serde(default)]
    pub maintenance: MaintenanceSettings,
    #[serde(default)]
    pub cache: CacheSettings,
    #[serde(default)]
    pub keys: KeySettings,
}

impl GateSettings {
    /// Loads settings from a TOML file. Returns defaults if the file doesn't exist.
    pub fn load(path: &Path) -> Result<Self, SettingsError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        let settings = toml::from_str(&content)?;
        Ok(settings)
    }

    /// Saves settings to a TOML file.
    pub fn save(&self, path: &Path) -> Result<(), SettingsError> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Validates settings values and returns list of validation errors.
    /// Returns empty vec if settings are valid.
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.cache.ttl_secs == 0 {
            errors.push("cache.ttl_secs must be at least 1".to_string());
        }

        if self.maintenance.default_message.trim().is_empty() {
            errors.push("maintenance.default_message must not be empty".to_string());
        }

        if self.maintenance.read_only_message.trim().is_empty() {
            errors.push("maintenance.read_only_message must not be empty".to_string());
        }

        for (name, key) in [
            ("keys.status_key", &self.keys.status_key),
            ("keys.cache_key", &self.keys.cache_key),
            ("keys.admin_emails_key", &self.keys.admin_emails_key),
        ] {
            if key.trim().is_empty() {
                errors.push(format!("{name} must not be empty"));
            }
        }

        errors
    }

    /// Returns validated settings, replacing invalid values with defaults.
    pub fn with_defaults_for_invalid(&self) -> Self {
        let defaults = Self::default();
        let or_default = |value: &String, default: String| {
            if value.trim().is_empty() {
                default
            } else {
                value.clone()
            }
        };

        Self {
            maintenance: MaintenanceSettings {
                default_message: or_default(
                    &self.maintenance.default_message,
                    defaults.maintenance.default_message,
                ),
                read_only_message: or_default(
                    &self.maintenance.read_only_message,
                    defaults.maintenance.read_only_message,
                ),
                allow_admins_default: self.maintenance.allow_admins_default,
            },
            cache: CacheSettings {
                ttl_secs: if self.cache.ttl_secs == 0 {
                    defaults.cache.ttl_secs
                } else {
                    self.cache.ttl_secs
                },
            },
            keys: KeySettings {
                status_key: or_default(&self.keys.status_key, defaults.keys.status_key),
                cache_key: or_default(&self.keys.cache_key, defaults.keys.cache_key),
                admin_emails_key: or_default(
                    &self.keys.admin_emails_key,
                    defaults.keys.admin_emails_key,
                ),
            },
        }
    }
}

/// Messages and defaults used when building maintenance records.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaintenanceSettings {
    #[serde(default = "default_message")]
    pub default_message: String,
    #[serde(default = "default_read_only_message")]
    pub read_only_message: String,
    #[serde(default)]
    pub allow_admins_default: bool,
}

impl Default for MaintenanceSettings {
    fn default() -> Self {
        Self {
            default_message: default_message(),
            read_only_message: default_read_only_message(),
            allow_admins_default: false,
        }
    }
}

fn default_message() -> String {
    "System under maintenance. Please try again later.".to_string()
}

fn default_read_only_message() -> String {
    "System is in read-only mode. Write operations are temporarily disabled.".to_string()
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheSettings {
    #[serde(default = "default_ttl_secs")]
    pub ttl_secs: u64,
}

impl CacheSettings {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            ttl_secs: default_ttl_secs(),
        }
    }
}

fn default_ttl_secs() -> u64 {
    300
}

/// Names under which the gate's values are stored.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeySettings {
    #[serde(default = "default_status_key")]
    pub status_key: String,
    #[serde(default = "default_cache_key")]
    pub cache_key: String,
    #[serde(default = "default_admin_emails_key")]
    pub admin_emails_key: String,
}

impl Default for KeySettings {
    fn default() -> Self {
        Self {
            status_key: default_status_key(),
            cache_key: default_cache_key(),
            admin_emails_key: default_admin_emails_key(),
        }
    }
}

fn default_status_key() -> String {
    "MAINTENANCE_STATUS".to_string()
}

fn default_cache_key() -> String {
    "maintenance_status_cache".to_string()
}

fn default_admin_emails_key() -> String {
    "ADMIN_EMAILS".to_string()
}

/// Errors that can occur when loading or saving settings.
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("parse error: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),
}
