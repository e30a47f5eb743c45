//! Remote storage backend: one JSON blob per customer in a versioned content
//! store, written with the revision read at load time so concurrent edits are
//! detected instead of overwritten.

pub mod content_api;
pub mod envelope;
pub mod http;

use bills_core::domain::{CustomerRecord, Revision, StoredRecord};
use bills_core::error::StorageError;
use bills_core::ports::{BillRepository, Result};
use bills_core::utils::{decode_key, encode_key};
use content_api::{ContentApi, PutFileRequest};
use envelope::{decode_record, encode_record};
use serde::Deserialize;
use tracing::{debug, warn};

pub use http::HttpContentApi;

const EXTENSION: &str = ".json";

/// Settings for the remote backend.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct RemoteConfig {
    pub api_url: String,
    pub owner: String,
    pub repo: String,
    pub branch: Option<String>,
    /// Directory inside the repository holding the record blobs.
    pub base_path: String,
    pub token: String,
    pub timeout_secs: u64,
    pub commit_prefix: String,
    pub user_agent: String,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            api_url: "https://api.github.com".to_string(),
            owner: String::new(),
            repo: String::new(),
            branch: None,
            base_path: "data/bills".to_string(),
            token: String::new(),
            timeout_secs: 30,
            commit_prefix: "Update bill for".to_string(),
            user_agent: concat!("water-bills/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

/// Remote implementation of the BillRepository trait.
pub struct RemoteJsonRepository<C> {
    api: C,
    base_path: String,
    commit_prefix: String,
    branch: Option<String>,
}

impl RemoteJsonRepository<HttpContentApi> {
    /// Connects to the content API described by `config`.
    pub fn connect(config: &RemoteConfig) -> Result<Self> {
        Ok(Self::new(HttpContentApi::new(config)?, config))
    }
}

impl<C: ContentApi> RemoteJsonRepository<C> {
    pub fn new(api: C, config: &RemoteConfig) -> Self {
        Self {
            api,
            base_path: config.base_path.trim_matches('/').to_string(),
            commit_prefix: config.commit_prefix.clone(),
            branch: config.branch.clone(),
        }
    }

    fn blob_path(&self, key: &str) -> String {
        let file_name = format!("{}{}", encode_key(key), EXTENSION);
        if self.base_path.is_empty() {
            file_name
        } else {
            format!("{}/{}", self.base_path, file_name)
        }
    }
}

impl<C: ContentApi> BillRepository for RemoteJsonRepository<C> {
    fn load(&self, key: &str) -> Result<Option<StoredRecord>> {
        let Some(file) = self.api.get_file(&self.blob_path(key))? else {
            return Ok(None);
        };

        let record = decode_record(key, &file)?;
        debug!(key, sha = %file.sha, "loaded remote record");
        Ok(Some(StoredRecord {
            record,
            revision: Some(Revision(file.sha)),
        }))
    }

    fn save(
        &self,
        key: &str,
        record: &CustomerRecord,
        expected_revision: Option<&Revision>,
    ) -> Result<()> {
        let request = PutFileRequest {
            message: format!("{} {}", self.commit_prefix, key),
            content: encode_record(record)?,
            sha: expected_revision.map(|r| r.as_str().to_string()),
            branch: self.branch.clone(),
        };

        self.api
            .put_file(&self.blob_path(key), &request)
            .map_err(|e| match e {
                StorageError::Conflict { .. } => StorageError::conflict(key),
                other => other,
            })?;
        debug!(key, "wrote remote record");
        Ok(())
    }

    fn list_keys(&self) -> Result<Vec<String>> {
        let mut keys: Vec<String> = self
            .api
            .list_dir(&self.base_path)?
            .into_iter()
            .filter(|entry| entry.is_file())
            .filter_map(|entry| {
                let stem = entry.name.strip_suffix(EXTENSION)?;
                let key = decode_key(stem);
                if key.is_none() {
                    warn!(name = %entry.name, "skipping blob with undecodable name");
                }
                key
            })
            .collect();
        keys.sort();
        Ok(keys)
    }
}
