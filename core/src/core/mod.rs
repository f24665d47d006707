//! The maintenance gate: decides whether an operation may proceed and
//! mediates administrator changes to the maintenance record.

use crate::core::cache::EphemeralCache;
use crate::core::roster::AdminRoster;
use crate::core::store::{MaintenanceStore, PropertyStore};
use crate::types::{Email, MaintenanceConfig, MaintenanceMode, MaintenancePatch, OperationKind};
use chrono::{DateTime, Utc};
use error::{GateAction, GateError, MaintenanceDenied, PermissionError};

pub mod cache;
pub mod db;
pub mod roster;
pub mod store;

#[cfg(test)]
pub(crate) mod test_support;

/// Target of the audit trail: mutations, permission failures, denials and bypasses.
pub const AUDIT_TARGET: &str = "tollgate::audit";

pub mod error {
    use crate::core::db::error::DatabaseError;
    use crate::types::{ValidationError, maintenance::with_until};
    use chrono::{DateTime, Utc};
    use std::fmt;
    use thiserror::Error;

    /// A durable store or cache could not be reached.
    #[derive(Debug, Error)]
    pub enum StoreError {
        #[error("Database error: {0}")]
        Database(#[from] DatabaseError),

        #[error("Serialization error: {0}")]
        Serialize(#[from] serde_json::Error),

        #[error("Store unavailable: {0}")]
        Unavailable(String),
    }

    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub enum GateAction {
        Enable,
        Disable,
        Update,
    }

    impl fmt::Display for GateAction {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            match self {
                GateAction::Enable => write!(f, "enable"),
                GateAction::Disable => write!(f, "disable"),
                GateAction::Update => write!(f, "update"),
            }
        }
    }

    /// A non-administrator tried to change the maintenance record.
    #[derive(Debug, Error, Clone, PartialEq, Eq)]
    #[error("not authorized to change maintenance mode")]
    pub struct PermissionError {
        pub actor: String,
        pub action: GateAction,
    }

    /// The gate blocked an operation. Routine, not a fault: the message is
    /// meant to be shown to the end user verbatim.
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct MaintenanceDenied {
        pub message: String,
        pub until: Option<DateTime<Utc>>,
    }

    impl fmt::Display for MaintenanceDenied {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str(&with_until(&self.message, self.until))
        }
    }

    impl std::error::Error for MaintenanceDenied {}

    #[derive(Debug, Error)]
    pub enum GateError {
        #[error("Validation error: {0}")]
        Validation(#[from] ValidationError),

        #[error(transparent)]
        Permission(#[from] PermissionError),

        #[error("Store error: {0}")]
        Store(#[from] StoreError),
    }
}

/// Outcome of evaluating the gate for one operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// The gate is off or the operation isn't blocked by the current mode.
    Allow,
    /// The gate would block, but the identity is an admin and admins may pass.
    Bypass,
    Deny(MaintenanceDenied),
}

/// Evaluates the decision table in order. `is_admin` is consulted only when
/// the gate is enabled and admins are allowed through.
pub fn decide(
    config: &MaintenanceConfig,
    operation: OperationKind,
    is_admin: impl FnOnce() -> bool,
    read_only_message: &str,
) -> Decision {
    if !config.enabled {
        return Decision::Allow;
    }
    if config.allow_admins && is_admin() {
        return Decision::Bypass;
    }

    let full_denial = || {
        Decision::Deny(MaintenanceDenied {
            message: config.message.clone(),
            until: config.until,
        })
    };

    match (operation, config.mode) {
        (OperationKind::Login, _) => full_denial(),
        (_, MaintenanceMode::Full) => full_denial(),
        (OperationKind::Write, MaintenanceMode::ReadOnly) => Decision::Deny(MaintenanceDenied {
            message: read_only_message.to_string(),
            until: None,
        }),
        (OperationKind::Read, MaintenanceMode::ReadOnly) => Decision::Allow,
    }
}

pub struct MaintenanceGate<P, C, R> {
    store: MaintenanceStore<P, C>,
    roster: AdminRoster<R>,
}

impl<P, C, R> MaintenanceGate<P, C, R>
where
    P: PropertyStore,
    C: EphemeralCache,
    R: PropertyStore,
{
    pub fn new(store: MaintenanceStore<P, C>, roster: AdminRoster<R>) -> Self {
        Self { store, roster }
    }

    pub fn store(&self) -> &MaintenanceStore<P, C> {
        &self.store
    }

    pub fn roster(&self) -> &AdminRoster<R> {
        &self.roster
    }
}

/// Read operations.
impl<P, C, R> MaintenanceGate<P, C, R>
where
    P: PropertyStore,
    C: EphemeralCache,
    R: PropertyStore,
{
    /// Current record, or the default when storage is unreadable.
    pub fn get_status(&self) -> MaintenanceConfig {
        self.store.read()
    }

    pub fn is_admin(&self, identity: &str) -> bool {
        self.roster.is_admin(identity)
    }

    /// True when the gate is off, or when admins may pass and `identity` is one.
    pub fn can_bypass(&self, identity: &str) -> bool {
        let config = self.store.read();
        !config.enabled || (config.allow_admins && self.is_admin(identity))
    }

    pub fn evaluate(&self, identity: &str, operation: OperationKind) -> Decision {
        let config = self.store.read();
        decide(
            &config,
            operation,
            || self.is_admin(identity),
            &self.store.settings().maintenance.read_only_message,
        )
    }

    /// Returns `Err` with the user-facing denial when the gate blocks
    /// `operation` for `identity`.
    pub fn assert_operation_allowed(
        &self,
        identity: &str,
        operation: OperationKind,
    ) -> Result<(), MaintenanceDenied> {
        match self.evaluate(identity, operation) {
            Decision::Allow => Ok(()),
            Decision::Bypass => {
                tracing::debug!(
                    target: AUDIT_TARGET,
                    actor = %identity,
                    %operation,
                    "maintenance bypassed by admin"
                );
                Ok(())
            }
            Decision::Deny(denied) => {
                tracing::warn!(
                    target: AUDIT_TARGET,
                    actor = %identity,
                    %operation,
                    reason = %denied,
                    "operation denied by maintenance"
                );
                Err(denied)
            }
        }
    }
}

/// Administrative operations. Each requires `requester` to be on the roster.
impl<P, C, R> MaintenanceGate<P, C, R>
where
    P: PropertyStore,
    C: EphemeralCache,
    R: PropertyStore,
{
    /// Turns the gate on with `patch` applied over the defaults. `enabled` is
    /// always forced on.
    pub fn enable(
        &self,
        patch: &MaintenancePatch,
        requester: &str,
        now: DateTime<Utc>,
    ) -> Result<MaintenanceConfig, GateError> {
        let actor = self.require_admin(requester, GateAction::Enable)?;

        let mut config = self.store.default_config();
        config.apply(patch)?;
        config.enabled = true;

        self.commit(config, &actor, now, GateAction::Enable)
    }

    /// Turns the gate off, keeping mode, message and `until` for the record.
    /// Fails without writing if the stored record can't be read.
    pub fn disable(
        &self,
        requester: &str,
        now: DateTime<Utc>,
    ) -> Result<MaintenanceConfig, GateError> {
        let actor = self.require_admin(requester, GateAction::Disable)?;

        let mut config = self.store.read_for_update()?;
        config.enabled = false;

        self.commit(config, &actor, now, GateAction::Disable)
    }

    /// Applies `patch` over the stored record, read past the cache. Fails
    /// without writing if that record can't be read.
    pub fn update_status(
        &self,
        patch: &MaintenancePatch,
        requester: &str,
        now: DateTime<Utc>,
    ) -> Result<MaintenanceConfig, GateError> {
        let actor = self.require_admin(requester, GateAction::Update)?;

        let mut config = self.store.read_for_update()?;
        config.apply(patch)?;

        self.commit(config, &actor, now, GateAction::Update)
    }

    fn require_admin(&self, requester: &str, action: GateAction) -> Result<Email, PermissionError> {
        let denied = || {
            tracing::warn!(
                target: AUDIT_TARGET,
                actor = %requester,
                %action,
                "maintenance change rejected: not an admin"
            );
            PermissionError {
                actor: requester.to_string(),
                action,
            }
        };

        let actor = Email::try_from(requester).map_err(|_| denied())?;
        if !self.is_admin(actor.as_str()) {
            return Err(denied());
        }
        Ok(actor)
    }

    fn commit(
        &self,
        mut config: MaintenanceConfig,
        actor: &Email,
        now: DateTime<Utc>,
        action: GateAction,
    ) -> Result<MaintenanceConfig, GateError> {
        config.stamp(actor, now);
        self.store.write(&config)?;

        tracing::info!(
            target: AUDIT_TARGET,
            actor = %actor,
            %action,
            enabled = config.enabled,
            mode = %config.mode,
            allow_admins = config.allow_admins,
            "maintenance status changed"
        );
        Ok(config)
    }
}
