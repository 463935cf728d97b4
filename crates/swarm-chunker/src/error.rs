use thiserror::Error;

#[derive(Error, Debug)]
pub enum ChunkerError {
    #[error("operation cancelled")]
    Cancelled,

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("bmt hashing failed: {0}")]
    Bmt(#[from] swarm_bmt::BmtError),

    #[error("sink rejected chunk: {0}")]
    Sink(String),

    #[error("source lookup failed: {0}")]
    Source(String),

    #[error("chunk {0} missing from source")]
    MissingChunk(swarm_primitives::Address),
}

pub type Result<T> = std::result::Result<T, ChunkerError>;
