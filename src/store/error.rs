// Store error types

use std::io;
use std::path::PathBuf;

/// Errors returned by article store operations
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Title or content missing or empty
    #[error("{0}")]
    InvalidInput(String),

    /// No article with the given id
    #[error("article {0} not found")]
    NotFound(u64),

    /// The highest stored id leaves no room for another article
    #[error("no id left after {0}")]
    IdsExhausted(u64),

    /// The storage file exists but is not a JSON array of articles
    #[error("failed to parse {}: {source}", path.display())]
    StorageCorrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// The storage file exists but could not be read
    #[error("failed to read {}: {source}", path.display())]
    StorageRead {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The collection could not be persisted
    #[error("failed to write {}: {source}", path.display())]
    StorageWrite {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}
