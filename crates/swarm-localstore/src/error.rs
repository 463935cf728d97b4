use thiserror::Error;

/// Error taxonomy from `spec.md` §7, realized over `redb`'s error surface.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("chunk invalid: address does not match BMT(data), or payload size out of range")]
    ChunkInvalid,

    #[error("address not found in store")]
    NotFound,

    #[error("invalid mode combination: {0}")]
    InvalidMode(String),

    #[error("store corrupt: {0}")]
    StoreCorrupt(String),

    #[error("operation cancelled")]
    Cancelled,

    #[error("database error: {0}")]
    Database(#[from] redb::DatabaseError),

    #[error("transaction error: {0}")]
    Transaction(#[from] redb::TransactionError),

    #[error("table error: {0}")]
    Table(#[from] redb::TableError),

    #[error("storage error: {0}")]
    Storage(#[from] redb::StorageError),

    #[error("commit error: {0}")]
    Commit(#[from] redb::CommitError),
}

pub type Result<T> = std::result::Result<T, StoreError>;
