use serde_json::json;
use std::sync::Arc;
use tempfile::TempDir;
use tollgate_core::api::{self, ApiErrorKind, Session};
use tollgate_core::types::{Config, Email, GateSettings, MaintenanceMode, OperationKind};
use tollgate_core::{AdminRoster, Database, MaintenanceGate, MaintenanceStore};

const ADMIN: &str = "admin@empresa.com";
const USER: &str = "vendedor@empresa.com";

type LocalGate = MaintenanceGate<Arc<Database>, Arc<Database>, Arc<Database>>;

fn open(temp: &TempDir) -> LocalGate {
    let config = Config {
        base_path: temp.path().to_path_buf(),
    };
    let settings = GateSettings::default();
    let db = Arc::new(Database::new(&config).unwrap());
    let roster = AdminRoster::new(Arc::clone(&db), settings.keys.admin_emails_key.clone());
    let store = MaintenanceStore::new(Arc::clone(&db), db, settings);
    MaintenanceGate::new(store, roster)
}

fn setup() -> (TempDir, LocalGate) {
    let temp = TempDir::new().unwrap();
    let gate = open(&temp);
    gate.roster()
        .set_admin_emails(&[Email::try_from(ADMIN).unwrap()])
        .unwrap();
    (temp, gate)
}

/// Verify a fresh data directory lets every operation through.
#[test]
fn test_fresh_directory_allows_everything() {
    let (_temp, gate) = setup();

    for op in [OperationKind::Login, OperationKind::Write, OperationKind::Read] {
        gate.assert_operation_allowed(USER, op).unwrap();
    }
    assert!(!api::get_maintenance_status(&gate).enabled);
}

/// Verify enable, check and disable against the redb-backed store and cache.
#[test]
fn test_enable_check_disable() {
    let (_temp, gate) = setup();
    let admin = Session::new(ADMIN);

    api::enable_maintenance(
        &gate,
        &admin,
        &json!({ "mode": "read-only", "message": "Updating database." }),
    )
    .unwrap();

    gate.assert_operation_allowed(USER, OperationKind::Read).unwrap();
    gate.assert_operation_allowed(USER, OperationKind::Write).unwrap_err();
    let denied = gate
        .assert_operation_allowed(USER, OperationKind::Login)
        .unwrap_err();
    assert_eq!(denied.message, "Updating database.");

    api::disable_maintenance(&gate, &admin).unwrap();

    gate.assert_operation_allowed(USER, OperationKind::Write).unwrap();
    let status = api::get_maintenance_status(&gate);
    assert!(!status.enabled);
    assert_eq!(status.mode, MaintenanceMode::ReadOnly);
    assert_eq!(status.message, "Updating database.");
}

/// Verify the record survives closing and reopening the data directory.
#[test]
fn test_status_persists_across_reopen() {
    let (temp, gate) = setup();
    api::enable_maintenance(
        &gate,
        &Session::new(ADMIN),
        &json!({ "allowAdmins": true, "until": "2024-01-15T14:00:00Z" }),
    )
    .unwrap();
    drop(gate);

    let gate = open(&temp);
    let status = api::get_maintenance_status(&gate);

    assert!(status.enabled);
    assert!(status.allow_admins);
    assert_eq!(
        status.updated_by.as_ref().map(|e| e.as_str()),
        Some(ADMIN)
    );
    assert!(gate.can_bypass(ADMIN));
    assert!(!gate.can_bypass(USER));
}

/// Verify only roster members can change the record, whatever their spelling.
#[test]
fn test_only_admins_change_status() {
    let (_temp, gate) = setup();

    let err = api::enable_maintenance(&gate, &Session::new(USER), &json!({})).unwrap_err();
    assert_eq!(err.kind, ApiErrorKind::Forbidden);
    assert!(!api::get_maintenance_status(&gate).enabled);

    api::enable_maintenance(&gate, &Session::new("  Admin@Empresa.COM "), &json!({})).unwrap();
    assert!(api::get_maintenance_status(&gate).enabled);
}

/// Verify an unset roster locks everyone out of administration.
#[test]
fn test_unset_roster_has_no_admins() {
    let temp = TempDir::new().unwrap();
    let gate = open(&temp);

    assert!(!gate.is_admin(ADMIN));
    let err = api::disable_maintenance(&gate, &Session::new(ADMIN)).unwrap_err();
    assert_eq!(err.kind, ApiErrorKind::Forbidden);
}

/// Verify the roster round-trips through the properties table.
#[test]
fn test_roster_replaced() {
    let (_temp, gate) = setup();
    let other = Email::try_from("ops@empresa.com").unwrap();

    gate.roster().set_admin_emails(&[other.clone()]).unwrap();

    assert_eq!(gate.roster().admin_emails().unwrap(), vec![other]);
    assert!(!gate.is_admin(ADMIN));
}
