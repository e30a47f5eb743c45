//! Port to a versioned content store addressed by path.
//!
//! Mirrors the shape of a repository contents API: files come back with their
//! content base64-encoded and a `sha` identifying the version, and writes carry
//! the `sha` they expect to replace.

use bills_core::ports::Result;
use serde::{Deserialize, Serialize};

/// A file as returned by the content store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentFile {
    /// Base64 text, possibly wrapped across lines.
    pub content: String,
    pub sha: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encoding: Option<String>,
}

/// Body of a conditional write.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PutFileRequest {
    pub message: String,
    pub content: String,
    /// Version being replaced; absent when creating the file.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sha: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DirEntry {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
}

impl DirEntry {
    pub fn is_file(&self) -> bool {
        self.kind == "file"
    }
}

pub trait ContentApi {
    /// Fetches the file at `path`; `None` if it does not exist.
    fn get_file(&self, path: &str) -> Result<Option<ContentFile>>;

    /// Creates or replaces the file at `path`. Fails with
    /// `StorageError::Conflict` when `request.sha` no longer matches.
    fn put_file(&self, path: &str, request: &PutFileRequest) -> Result<()>;

    /// Lists a directory; a missing directory lists as empty.
    fn list_dir(&self, path: &str) -> Result<Vec<DirEntry>>;
}
