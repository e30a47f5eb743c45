//! In-memory storage backend.
//!
//! Behaves like a versioned store: every write bumps a counter that serves as
//! the record's revision, and writes against a stale revision are rejected.
//! Clones share the same underlying map.

use crate::domain::{CustomerRecord, Revision, StoredRecord};
use crate::error::StorageError;
use crate::ports::{BillRepository, Result};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Debug, Clone)]
enum Slot {
    Record { record: CustomerRecord, version: u64 },
    Corrupt(String),
}

#[derive(Debug, Clone, Default)]
pub struct InMemoryRepository {
    slots: Arc<Mutex<BTreeMap<String, Slot>>>,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores content under `key` that fails to load, as a damaged file would.
    pub fn insert_corrupt(&self, key: &str, reason: &str) -> Result<()> {
        self.lock()?
            .insert(key.to_string(), Slot::Corrupt(reason.to_string()));
        Ok(())
    }

    fn lock(&self) -> Result<MutexGuard<'_, BTreeMap<String, Slot>>> {
        self.slots
            .lock()
            .map_err(|_| StorageError::Unavailable("in-memory store poisoned".to_string()))
    }
}

impl BillRepository for InMemoryRepository {
    fn load(&self, key: &str) -> Result<Option<StoredRecord>> {
        match self.lock()?.get(key) {
            None => Ok(None),
            Some(Slot::Corrupt(reason)) => Err(StorageError::malformed(key, reason)),
            Some(Slot::Record { record, version }) => Ok(Some(StoredRecord {
                record: record.clone(),
                revision: Some(Revision(version.to_string())),
            })),
        }
    }

    fn save(
        &self,
        key: &str,
        record: &CustomerRecord,
        expected_revision: Option<&Revision>,
    ) -> Result<()> {
        let mut slots = self.lock()?;
        let current = match slots.get(key) {
            Some(Slot::Record { version, .. }) => Some(*version),
            Some(Slot::Corrupt(_)) | None => None,
        };

        let matches = match (current, expected_revision) {
            (None, None) => true,
            (Some(version), Some(expected)) => version.to_string() == expected.as_str(),
            _ => false,
        };
        if !matches {
            return Err(StorageError::conflict(key));
        }

        let version = current.map_or(1, |v| v + 1);
        slots.insert(
            key.to_string(),
            Slot::Record {
                record: record.clone(),
                version,
            },
        );
        Ok(())
    }

    fn list_keys(&self) -> Result<Vec<String>> {
        Ok(self.lock()?.keys().cloned().collect())
    }
}
