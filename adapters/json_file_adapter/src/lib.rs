use bills_core::domain::{CustomerRecord, Revision, StoredRecord};
use bills_core::error::StorageError;
use bills_core::ports::{BillRepository, Result};
use bills_core::utils::{decode_key, encode_key};
use serde::Deserialize;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

const EXTENSION: &str = "json";

/// Settings for the local filesystem backend.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct LocalConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("data/bills")
}

impl Default for LocalConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
        }
    }
}

/// Filesystem implementation of the BillRepository trait.
///
/// One pretty-printed JSON file per customer, named after the percent-encoded
/// key.
/// Writes overwrite the whole file in place; there is no versioning, so
/// revisions are never handed out and expected revisions are ignored.
pub struct JsonFileRepository {
    data_dir: PathBuf,
}

impl JsonFileRepository {
    /// Creates the repository, creating the data directory if it doesn't exist
    pub fn new(config: &LocalConfig) -> Result<Self> {
        fs::create_dir_all(&config.data_dir)?;
        Ok(Self {
            data_dir: config.data_dir.clone(),
        })
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    fn file_path(&self, key: &str) -> PathBuf {
        self.data_dir
            .join(format!("{}.{}", encode_key(key), EXTENSION))
    }
}

impl BillRepository for JsonFileRepository {
    fn load(&self, key: &str) -> Result<Option<StoredRecord>> {
        let path = self.file_path(key);
        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let record: CustomerRecord =
            serde_json::from_slice(&bytes).map_err(|e| StorageError::malformed(key, e))?;
        debug!(key, path = %path.display(), "loaded record file");

        Ok(Some(StoredRecord {
            record,
            revision: None,
        }))
    }

    fn save(
        &self,
        key: &str,
        record: &CustomerRecord,
        _expected_revision: Option<&Revision>,
    ) -> Result<()> {
        let path = self.file_path(key);
        fs::write(&path, record.to_pretty_json()?)?;
        debug!(key, path = %path.display(), "wrote record file");
        Ok(())
    }

    fn list_keys(&self) -> Result<Vec<String>> {
        let mut keys = Vec::new();
        for entry in fs::read_dir(&self.data_dir)? {
            let path = entry?.path();
            if !path.is_file() || path.extension().and_then(|e| e.to_str()) != Some(EXTENSION) {
                continue;
            }
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            match decode_key(stem) {
                Some(key) => keys.push(key),
                None => warn!(path = %path.display(), "skipping file with undecodable name"),
            }
        }
        keys.sort();
        Ok(keys)
    }
}
