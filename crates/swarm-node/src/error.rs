use thiserror::Error;

/// Aggregates every subsystem's error type behind the binary-facing
/// surface, following this lineage's own per-crate-error-aggregated-by-
/// the-binary-crate convention (`ClientError::Core(#[from] inspire_core::Error)`).
#[derive(Error, Debug)]
pub enum NodeError {
    #[error("bmt error: {0}")]
    Bmt(#[from] swarm_bmt::BmtError),

    #[error("chunker error: {0}")]
    Chunker(#[from] swarm_chunker::ChunkerError),

    #[error("store error: {0}")]
    Store(#[from] swarm_localstore::StoreError),

    #[error("kademlia error: {0}")]
    Kademlia(#[from] swarm_kademlia::KademliaError),
}

pub type Result<T> = std::result::Result<T, NodeError>;
