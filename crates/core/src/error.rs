use thiserror::Error;

/// Failures a storage backend can report to the record store.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// The stored content for a key exists but is not a valid record.
    #[error("record for {key} is malformed: {message}")]
    Malformed { key: String, message: String },

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A conditional write was rejected because the record changed since it
    /// was read. Callers must reload and merge again.
    #[error("record for {key} was changed by someone else; reload and try again")]
    Conflict { key: String },

    #[error("could not reach storage: {0}")]
    Transport(String),

    #[error("storage responded with status {status}: {message}")]
    Remote { status: u16, message: String },

    #[error("content encoding error: {0}")]
    Encoding(String),

    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

impl StorageError {
    pub fn malformed(key: &str, message: impl ToString) -> Self {
        Self::Malformed {
            key: key.to_string(),
            message: message.to_string(),
        }
    }

    pub fn conflict(key: &str) -> Self {
        Self::Conflict {
            key: key.to_string(),
        }
    }
}
