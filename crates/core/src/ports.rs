use crate::domain::{CustomerRecord, Revision, StoredRecord};
use crate::error::StorageError;

pub type Result<T> = std::result::Result<T, StorageError>;

/// Port every storage backend implements. The record store only ever talks
/// to this trait; which backend sits behind it is decided at startup.
pub trait BillRepository {
    /// Loads the record stored under `key`, or `None` if there is none yet.
    fn load(&self, key: &str) -> Result<Option<StoredRecord>>;

    /// Writes `record` under `key`. When `expected_revision` is given, a
    /// versioned backend must fail with `StorageError::Conflict` if the
    /// stored record is no longer at that revision. `None` means the caller
    /// saw no record.
    fn save(
        &self,
        key: &str,
        record: &CustomerRecord,
        expected_revision: Option<&Revision>,
    ) -> Result<()>;

    /// Keys of every stored record.
    fn list_keys(&self) -> Result<Vec<String>>;
}
