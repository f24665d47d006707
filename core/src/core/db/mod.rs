//! Database layer for tollgate storage.
//!
//! This module handles all redb operations:
//! - Durable properties (name → string, the maintenance record is JSON)
//! - Ephemeral cache entries with an absolute expiry, shared between
//!   processes that open the same data directory

use crate::core::cache::EphemeralCache;
use crate::core::error::StoreError;
use crate::core::store::PropertyStore;
use crate::types::Config;
use error::DatabaseError;
use redb::{ReadableDatabase, ReadableTable, TableDefinition};
use std::time::{Duration, SystemTime};

pub mod error {
    use thiserror::Error;

    #[derive(Debug, Error)]
    pub enum DatabaseError {
        #[error("Database error: {0}")]
        Redb(#[from] redb::DatabaseError),

        #[error("Table error: {0}")]
        TableError(#[from] redb::TableError),

        #[error("Storage error: {0}")]
        StorageError(#[from] redb::StorageError),

        #[error("Transaction error: {0}")]
        TransactionError(#[from] redb::TransactionError),

        #[error("Commit error: {0}")]
        CommitError(#[from] redb::CommitError),

        #[error("IO error: {0}")]
        Io(#[from] std::io::Error),
    }
}

/// Properties table: &str → string value
const PROPERTIES_TABLE: TableDefinition<&str, &str> = TableDefinition::new("properties");

/// Cache table: &str → (string value, expires-at as nanoseconds since the epoch)
const CACHE_TABLE: TableDefinition<&str, (&str, u64)> = TableDefinition::new("cache");

/// The main database struct wrapping redb.
pub struct Database {
    db: redb::Database,
}

impl Database {
    /// Creates or opens a database at the path given by the config.
    pub fn new(config: &Config) -> Result<Self, DatabaseError> {
        std::fs::create_dir_all(&config.base_path)?;

        let db = redb::Database::create(config.db_path())?;

        // Initialize tables
        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(PROPERTIES_TABLE)?;
            let _ = write_txn.open_table(CACHE_TABLE)?;
        }
        write_txn.commit()?;

        Ok(Self { db })
    }
}

/// Property operations.
impl Database {
    pub fn property(&self, name: &str) -> Result<Option<String>, DatabaseError> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(PROPERTIES_TABLE)?;

        Ok(table.get(name)?.map(|guard| guard.value().to_string()))
    }

    pub fn set_property(&self, name: &str, value: &str) -> Result<(), DatabaseError> {
        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(PROPERTIES_TABLE)?;
            table.insert(name, value)?;
        }
        write_txn.commit()?;
        Ok(())
    }
}

/// Cache operations. Expiry is evaluated at query time against `now`.
impl Database {
    pub fn cache_get(&self, key: &str, now: SystemTime) -> Result<Option<String>, DatabaseError> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(CACHE_TABLE)?;

        let Some(guard) = table.get(key)? else {
            return Ok(None);
        };
        let (value, expires_at) = guard.value();
        if expires_at <= to_nanos(now) {
            return Ok(None);
        }
        Ok(Some(value.to_string()))
    }

    pub fn cache_put(
        &self,
        key: &str,
        value: &str,
        ttl: Duration,
        now: SystemTime,
    ) -> Result<(), DatabaseError> {
        let ttl = u64::try_from(ttl.as_nanos()).unwrap_or(u64::MAX);
        let expires_at = to_nanos(now).saturating_add(ttl);

        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(CACHE_TABLE)?;
            table.insert(key, (value, expires_at))?;
        }
        write_txn.commit()?;
        Ok(())
    }
}

fn to_nanos(time: SystemTime) -> u64 {
    let since_epoch = time
        .duration_since(SystemTime::UNIX_EPOCH)
        .unwrap_or_default();
    u64::try_from(since_epoch.as_nanos()).unwrap_or(u64::MAX)
}

impl PropertyStore for Database {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.property(key)?)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        Ok(self.set_property(key, value)?)
    }
}

impl EphemeralCache for Database {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.cache_get(key, SystemTime::now())?)
    }

    fn put(&self, key: &str, value: &str, ttl: Duration) -> Result<(), StoreError> {
        Ok(self.cache_put(key, value, ttl, SystemTime::now())?)
    }
}
