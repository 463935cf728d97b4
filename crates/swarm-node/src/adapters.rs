//! Bridges `swarm-localstore`'s `Put(Upload)`/`Get(Request)` onto
//! `swarm-chunker`'s `ChunkSink`/`ChunkSource` traits, so `Split`/`Join`
//! can drive the node's own store directly.

use std::sync::Arc;

use swarm_chunker::{ChunkSink, ChunkSource, ChunkerError};
use swarm_localstore::{GetMode, LocalStore, PutMode, StoreError};
use swarm_primitives::{Address, Chunk};

pub struct StoreSink {
    pub store: Arc<LocalStore>,
}

impl ChunkSink for StoreSink {
    async fn put(&self, chunk: Chunk) -> Result<bool, ChunkerError> {
        self.store
            .put(PutMode::Upload, chunk)
            .await
            .map_err(|e| ChunkerError::Sink(e.to_string()))
    }
}

pub struct StoreSource {
    pub store: Arc<LocalStore>,
}

impl ChunkSource for StoreSource {
    async fn get(&self, address: Address) -> Result<Chunk, ChunkerError> {
        self.store
            .get(GetMode::Request, address)
            .await
            .map_err(|e| match e {
                StoreError::NotFound => ChunkerError::MissingChunk(address),
                other => ChunkerError::Source(other.to_string()),
            })
    }
}
