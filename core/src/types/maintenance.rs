//! Maintenance configuration record and the partial updates applied to it.

use crate::types::Email;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// What a gated operation does, as seen by the maintenance gate.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationKind {
    Login,
    Write,
    Read,
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OperationKind::Login => write!(f, "login"),
            OperationKind::Write => write!(f, "write"),
            OperationKind::Read => write!(f, "read"),
        }
    }
}

impl FromStr for OperationKind {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "login" => Ok(OperationKind::Login),
            "write" => Ok(OperationKind::Write),
            "read" => Ok(OperationKind::Read),
            _ => Err(ValidationError::InvalidOperation(s.to_string())),
        }
    }
}

/// `Full` blocks everything for non-bypassing users; `ReadOnly` blocks only
/// writes and logins.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum MaintenanceMode {
    #[default]
    #[serde(rename = "full")]
    Full,
    #[serde(rename = "read-only")]
    ReadOnly,
}

impl fmt::Display for MaintenanceMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MaintenanceMode::Full => write!(f, "full"),
            MaintenanceMode::ReadOnly => write!(f, "read-only"),
        }
    }
}

impl FromStr for MaintenanceMode {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "full" => Ok(MaintenanceMode::Full),
            "read-only" | "read_only" | "readonly" => Ok(MaintenanceMode::ReadOnly),
            _ => Err(ValidationError::InvalidMode(s.to_string())),
        }
    }
}

/// Reasons a configuration or patch is rejected. Nothing is persisted when
/// one of these is returned.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("invalid maintenance mode: {0:?} (expected \"full\" or \"read-only\")")]
    InvalidMode(String),

    #[error("maintenance message must not be empty")]
    EmptyMessage,

    #[error("invalid `until` timestamp: {0:?} (expected an ISO-8601 instant)")]
    InvalidUntil(String),

    #[error("`{0}` must be a boolean")]
    NotABoolean(&'static str),

    #[error("`{0}` must be a string")]
    NotAString(&'static str),

    #[error("maintenance update must be a JSON object")]
    NotAnObject,

    #[error("invalid operation kind: {0:?}")]
    InvalidOperation(String),
}

/// The persisted maintenance record. One per deployment.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MaintenanceConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub mode: MaintenanceMode,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub allow_admins: bool,
    /// Shown next to the denial message. Never disables the gate by itself.
    #[serde(default)]
    pub until: Option<DateTime<Utc>>,
    #[serde(default = "never_updated")]
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub updated_by: Option<Email>,
}

fn never_updated() -> DateTime<Utc> {
    DateTime::<Utc>::UNIX_EPOCH
}

impl MaintenanceConfig {
    /// The record used when nothing valid is stored: gate off, never updated.
    pub fn disabled(message: impl Into<String>, allow_admins: bool) -> Self {
        Self {
            enabled: false,
            mode: MaintenanceMode::Full,
            message: message.into(),
            allow_admins,
            until: None,
            updated_at: never_updated(),
            updated_by: None,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.message.trim().is_empty() {
            return Err(ValidationError::EmptyMessage);
        }
        Ok(())
    }

    /// Applies every field present in `patch`. Audit fields are left alone.
    pub fn apply(&mut self, patch: &MaintenancePatch) -> Result<(), ValidationError> {
        if let Some(enabled) = patch.enabled {
            self.enabled = enabled;
        }
        if let Some(mode) = &patch.mode {
            self.mode = mode.parse()?;
        }
        if let Some(message) = &patch.message {
            self.message = message.clone();
        }
        if let Some(allow_admins) = patch.allow_admins {
            self.allow_admins = allow_admins;
        }
        // A blank `until` clears the hint, like `null`.
        if let Some(until) = &patch.until {
            self.until = until
                .as_deref()
                .filter(|raw| !raw.trim().is_empty())
                .map(parse_until)
                .transpose()?;
        }
        Ok(())
    }

    pub fn stamp(&mut self, actor: &Email, now: DateTime<Utc>) {
        self.updated_at = now;
        self.updated_by = Some(actor.clone());
    }

    /// `message`, plus the `until` hint when one is set.
    pub fn denial_message(&self) -> String {
        with_until(&self.message, self.until)
    }
}

pub(crate) fn with_until(message: &str, until: Option<DateTime<Utc>>) -> String {
    match until {
        Some(until) => format!("{message} (until {})", until.format("%Y-%m-%d %H:%M UTC")),
        None => message.to_string(),
    }
}

fn parse_until(raw: &str) -> Result<DateTime<Utc>, ValidationError> {
    DateTime::parse_from_rfc3339(raw.trim())
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| ValidationError::InvalidUntil(raw.to_string()))
}

/// Partial configuration sent by an administrator.
///
/// Values are kept raw until applied so that a bad mode or timestamp is
/// reported as a [`ValidationError`] rather than a decoding failure.
/// For `until`, `Some(None)` clears the hint and `None` leaves it untouched.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MaintenancePatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allow_admins: Option<bool>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "explicit_null"
    )]
    pub until: Option<Option<String>>,
}

fn explicit_null<'de, D>(deserializer: D) -> Result<Option<Option<String>>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer).map(Some)
}

impl MaintenancePatch {
    /// Type-checks an untrusted JSON body. Unknown keys are ignored.
    pub fn from_json(value: &Value) -> Result<Self, ValidationError> {
        let Value::Object(map) = value else {
            return Err(ValidationError::NotAnObject);
        };

        Ok(Self {
            enabled: bool_field(map, "enabled")?,
            mode: string_field(map, "mode")?,
            message: string_field(map, "message")?,
            allow_admins: bool_field(map, "allowAdmins")?,
            until: match map.get("until") {
                None => None,
                Some(Value::Null) => Some(None),
                Some(Value::String(s)) => Some(Some(s.clone())),
                Some(_) => return Err(ValidationError::NotAString("until")),
            },
        })
    }

    pub fn mode(mut self, mode: MaintenanceMode) -> Self {
        self.mode = Some(mode.to_string());
        self
    }

    pub fn message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn allow_admins(mut self, allow_admins: bool) -> Self {
        self.allow_admins = Some(allow_admins);
        self
    }

    pub fn until(mut self, until: DateTime<Utc>) -> Self {
        self.until = Some(Some(until.to_rfc3339()));
        self
    }
}

fn bool_field(map: &Map<String, Value>, name: &'static str) -> Result<Option<bool>, ValidationError> {
    match map.get(name) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Bool(b)) => Ok(Some(*b)),
        Some(_) => Err(ValidationError::NotABoolean(name)),
    }
}

fn string_field(
    map: &Map<String, Value>,
    name: &'static str,
) -> Result<Option<String>, ValidationError> {
    match map.get(name) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(_) => Err(ValidationError::NotAString(name)),
    }
}
