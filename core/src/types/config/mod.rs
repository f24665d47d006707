mod core;
mod settings;

pub use self::core::Config;
pub use settings::{CacheSettings, GateSettings, KeySettings, MaintenanceSettings, SettingsError};
