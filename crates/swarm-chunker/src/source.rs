use swarm_primitives::{Address, Chunk};

use crate::error::ChunkerError;

/// Supplies chunks by address to [`crate::join::join`]. The store's `Get`
/// implements this; tests use an in-memory map.
pub trait ChunkSource: Send + Sync {
    /// Fetch the chunk at `address`, or [`ChunkerError::MissingChunk`] if
    /// absent.
    fn get(
        &self,
        address: Address,
    ) -> impl std::future::Future<Output = Result<Chunk, ChunkerError>> + Send;
}
