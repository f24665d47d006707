//! In-memory stand-ins for the durable store and cache.

use crate::core::MaintenanceGate;
use crate::core::cache::EphemeralCache;
use crate::core::error::StoreError;
use crate::core::roster::AdminRoster;
use crate::core::store::{MaintenanceStore, PropertyStore};
use crate::types::GateSettings;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub(crate) const ADMIN: &str = "admin@empresa.com";
pub(crate) const USER: &str = "vendedor@empresa.com";

#[derive(Default)]
pub(crate) struct MemoryProperties {
    values: Mutex<HashMap<String, String>>,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
    reads: AtomicUsize,
}

impl MemoryProperties {
    pub(crate) fn with(self, key: &str, value: &str) -> Self {
        self.values
            .lock()
            .unwrap()
            .insert(key.to_string(), value.to_string());
        self
    }

    pub(crate) fn raw(&self, key: &str) -> Option<String> {
        self.values.lock().unwrap().get(key).cloned()
    }

    pub(crate) fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    pub(crate) fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    pub(crate) fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }
}

impl PropertyStore for MemoryProperties {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("reads disabled".to_string()));
        }
        Ok(self.raw(key))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("writes disabled".to_string()));
        }
        self.values
            .lock()
            .unwrap()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Cache whose entries live until [`ManualCache::expire_all`] is called.
#[derive(Default)]
pub(crate) struct ManualCache {
    entries: Mutex<HashMap<String, String>>,
    last_ttl: Mutex<Option<Duration>>,
    fail: AtomicBool,
}

impl ManualCache {
    pub(crate) fn expire_all(&self) {
        self.entries.lock().unwrap().clear();
    }

    pub(crate) fn raw(&self, key: &str) -> Option<String> {
        self.entries.lock().unwrap().get(key).cloned()
    }

    pub(crate) fn insert_raw(&self, key: &str, value: &str) {
        self.entries
            .lock()
            .unwrap()
            .insert(key.to_string(), value.to_string());
    }

    pub(crate) fn last_ttl(&self) -> Option<Duration> {
        *self.last_ttl.lock().unwrap()
    }

    pub(crate) fn fail(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }
}

impl EphemeralCache for ManualCache {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("cache down".to_string()));
        }
        Ok(self.raw(key))
    }

    fn put(&self, key: &str, value: &str, ttl: Duration) -> Result<(), StoreError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("cache down".to_string()));
        }
        *self.last_ttl.lock().unwrap() = Some(ttl);
        self.insert_raw(key, value);
        Ok(())
    }
}

pub(crate) type TestStore = MaintenanceStore<Arc<MemoryProperties>, Arc<ManualCache>>;
pub(crate) type TestGate =
    MaintenanceGate<Arc<MemoryProperties>, Arc<ManualCache>, Arc<MemoryProperties>>;

pub(crate) struct Fixture {
    pub(crate) gate: TestGate,
    pub(crate) properties: Arc<MemoryProperties>,
    pub(crate) cache: Arc<ManualCache>,
}

pub(crate) fn create_test_store(
    properties: MemoryProperties,
) -> (TestStore, Arc<MemoryProperties>, Arc<ManualCache>) {
    let properties = Arc::new(properties);
    let cache = Arc::new(ManualCache::default());
    let store = MaintenanceStore::new(
        Arc::clone(&properties),
        Arc::clone(&cache),
        GateSettings::default(),
    );
    (store, properties, cache)
}

/// Gate whose roster holds `admins` (comma-separated); `None` leaves it unset.
pub(crate) fn create_test_gate(admins: Option<&str>) -> Fixture {
    let settings = GateSettings::default();
    let mut properties = MemoryProperties::default();
    if let Some(admins) = admins {
        properties = properties.with(&settings.keys.admin_emails_key, admins);
    }
    let properties = Arc::new(properties);
    build_gate(settings, Arc::clone(&properties), properties)
}

/// Like [`create_test_gate`], but the roster lives in its own store so status
/// reads can fail while admin checks still succeed.
pub(crate) fn create_test_gate_with_separate_roster(admins: &str) -> Fixture {
    let settings = GateSettings::default();
    let roster = Arc::new(MemoryProperties::default().with(&settings.keys.admin_emails_key, admins));
    build_gate(settings, Arc::new(MemoryProperties::default()), roster)
}

fn build_gate(
    settings: GateSettings,
    properties: Arc<MemoryProperties>,
    roster_source: Arc<MemoryProperties>,
) -> Fixture {
    let cache = Arc::new(ManualCache::default());
    let roster = AdminRoster::new(roster_source, settings.keys.admin_emails_key.clone());
    let store = MaintenanceStore::new(Arc::clone(&properties), Arc::clone(&cache), settings);

    Fixture {
        gate: MaintenanceGate::new(store, roster),
        properties,
        cache,
    }
}
