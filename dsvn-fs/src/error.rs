//! Error taxonomy for the versioned filesystem

use crate::id::NodeRevId;

/// Result type for filesystem operations
pub type Result<T> = std::result::Result<T, FsError>;

/// Result type for record store operations
pub type StoreResult<T> = std::result::Result<T, StorageError>;

/// Failures of the backing record store
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Storage backend error: {0}")]
    Backend(String),
}

/// Errors returned by DAG, transaction and filesystem operations
#[derive(Debug, thiserror::Error)]
pub enum FsError {
    #[error("node-revision {0} is not mutable")]
    NotMutable(NodeRevId),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("entry '{0}' already exists")]
    AlreadyExists(String),

    #[error("node-revision {0} is not a directory")]
    NotDirectory(NodeRevId),

    #[error("node-revision {0} is not a file")]
    NotFile(NodeRevId),

    #[error("cannot delete non-empty directory '{0}'")]
    DirNotEmpty(String),

    #[error("no entry named '{0}' in parent directory")]
    NoSuchEntry(String),

    #[error("malformed skel: {0}")]
    MalformedSkel(String),

    #[error("filesystem corrupt: {0}")]
    Corrupt(String),

    #[error("transaction '{txn}' is based on r{base} but youngest is r{youngest}")]
    TxnOutOfDate { txn: String, base: u64, youngest: u64 },

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl FsError {
    pub(crate) fn corrupt(msg: impl Into<String>) -> Self {
        FsError::Corrupt(msg.into())
    }

    pub(crate) fn malformed(msg: impl Into<String>) -> Self {
        FsError::MalformedSkel(msg.into())
    }
}
