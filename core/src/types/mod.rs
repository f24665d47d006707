pub(crate) mod config;
pub use config::{
    CacheSettings, Config, GateSettings, KeySettings, MaintenanceSettings, SettingsError,
};

pub(crate) mod email;
pub use email::{Email, EmailError, MAX_EMAIL_LENGTH};

pub(crate) mod maintenance;
pub use maintenance::{
    MaintenanceConfig, MaintenanceMode, MaintenancePatch, OperationKind, ValidationError,
};
