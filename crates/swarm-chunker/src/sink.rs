use swarm_primitives::Chunk;

use crate::error::ChunkerError;

/// Receives chunks produced by [`crate::split::split`]. The store is the
/// production implementation; tests use an in-memory map.
///
/// `put` must be idempotent: a chunk re-put after a cancelled split (whose
/// chunks may already have been sunk) must not corrupt the sink's state.
pub trait ChunkSink: Send + Sync {
    /// Store `chunk`, returning whether it already existed.
    fn put(
        &self,
        chunk: Chunk,
    ) -> impl std::future::Future<Output = Result<bool, ChunkerError>> + Send;
}
