pub mod api;
pub mod core;
pub mod types;

pub use crate::core::cache::{EphemeralCache, MokaCache};
pub use crate::core::db::Database;
pub use crate::core::error::{GateError, MaintenanceDenied, PermissionError, StoreError};
pub use crate::core::roster::AdminRoster;
pub use crate::core::store::{MaintenanceStore, PropertyStore};
pub use crate::core::{AUDIT_TARGET, Decision, MaintenanceGate, decide};
