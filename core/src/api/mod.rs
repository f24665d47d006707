//! Entry points for the request-handling layer.
//!
//! Each function takes the acting identity from a [`Session`], stamps
//! mutations with the current time, and turns gate errors into an
//! [`ApiError`] the front end can render.

use crate::core::cache::EphemeralCache;
use crate::core::error::{GateError, MaintenanceDenied};
use crate::core::store::PropertyStore;
use crate::core::MaintenanceGate;
use crate::types::{MaintenanceConfig, MaintenanceMode, MaintenancePatch, OperationKind};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// The authenticated caller of a request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Session {
    email: String,
}

impl Session {
    pub fn new(email: impl Into<String>) -> Self {
        Self {
            email: email.into(),
        }
    }

    pub fn email(&self) -> &str {
        &self.email
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApiErrorKind {
    Validation,
    Forbidden,
    Unavailable,
    Denied,
}

/// Error shape returned to the front end. `message` is safe to display.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiError {
    pub kind: ApiErrorKind,
    pub message: String,
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for ApiError {}

impl From<GateError> for ApiError {
    fn from(err: GateError) -> Self {
        match err {
            GateError::Validation(e) => ApiError {
                kind: ApiErrorKind::Validation,
                message: e.to_string(),
            },
            GateError::Permission(e) => ApiError {
                kind: ApiErrorKind::Forbidden,
                message: e.to_string(),
            },
            GateError::Store(_) => ApiError {
                kind: ApiErrorKind::Unavailable,
                message: "maintenance status could not be saved".to_string(),
            },
        }
    }
}

impl From<MaintenanceDenied> for ApiError {
    fn from(denied: MaintenanceDenied) -> Self {
        ApiError {
            kind: ApiErrorKind::Denied,
            message: denied.to_string(),
        }
    }
}

/// What the front end shows to a user who cannot bypass the gate.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusView {
    pub show_banner: bool,
    pub show_overlay: bool,
    pub writes_disabled: bool,
    pub banner_message: Option<String>,
}

impl From<&MaintenanceConfig> for StatusView {
    fn from(config: &MaintenanceConfig) -> Self {
        if !config.enabled {
            return StatusView {
                show_banner: false,
                show_overlay: false,
                writes_disabled: false,
                banner_message: None,
            };
        }

        StatusView {
            show_banner: true,
            show_overlay: config.mode == MaintenanceMode::Full,
            writes_disabled: true,
            banner_message: Some(config.denial_message()),
        }
    }
}

pub fn get_maintenance_status<P, C, R>(gate: &MaintenanceGate<P, C, R>) -> MaintenanceConfig
where
    P: PropertyStore,
    C: EphemeralCache,
    R: PropertyStore,
{
    gate.get_status()
}

pub fn status_view<P, C, R>(gate: &MaintenanceGate<P, C, R>) -> StatusView
where
    P: PropertyStore,
    C: EphemeralCache,
    R: PropertyStore,
{
    StatusView::from(&gate.get_status())
}

/// `body` is the untrusted JSON object sent by the control panel.
pub fn enable_maintenance<P, C, R>(
    gate: &MaintenanceGate<P, C, R>,
    session: &Session,
    body: &Value,
) -> Result<MaintenanceConfig, ApiError>
where
    P: PropertyStore,
    C: EphemeralCache,
    R: PropertyStore,
{
    let result = MaintenancePatch::from_json(body)
        .map_err(GateError::from)
        .and_then(|patch| gate.enable(&patch, session.email(), Utc::now()));
    reported("enable_maintenance", result)
}

pub fn update_maintenance<P, C, R>(
    gate: &MaintenanceGate<P, C, R>,
    session: &Session,
    body: &Value,
) -> Result<MaintenanceConfig, ApiError>
where
    P: PropertyStore,
    C: EphemeralCache,
    R: PropertyStore,
{
    let result = MaintenancePatch::from_json(body)
        .map_err(GateError::from)
        .and_then(|patch| gate.update_status(&patch, session.email(), Utc::now()));
    reported("update_maintenance", result)
}

pub fn disable_maintenance<P, C, R>(
    gate: &MaintenanceGate<P, C, R>,
    session: &Session,
) -> Result<MaintenanceConfig, ApiError>
where
    P: PropertyStore,
    C: EphemeralCache,
    R: PropertyStore,
{
    reported(
        "disable_maintenance",
        gate.disable(session.email(), Utc::now()),
    )
}

/// Runs `action` only if the gate lets `session` perform `operation`.
pub fn guarded<P, C, R, T>(
    gate: &MaintenanceGate<P, C, R>,
    session: &Session,
    operation: OperationKind,
    action: impl FnOnce(&Session) -> T,
) -> Result<T, ApiError>
where
    P: PropertyStore,
    C: EphemeralCache,
    R: PropertyStore,
{
    gate.assert_operation_allowed(session.email(), operation)?;
    Ok(action(session))
}

fn reported(
    endpoint: &'static str,
    result: Result<MaintenanceConfig, GateError>,
) -> Result<MaintenanceConfig, ApiError> {
    result.map_err(|e| {
        tracing::error!(endpoint, error = %e, "maintenance endpoint failed");
        ApiError::from(e)
    })
}
