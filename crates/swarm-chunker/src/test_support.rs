//! In-memory sink/source double shared by `split`/`join` unit tests,
//! mirroring the in-memory chunk-store test double used elsewhere in this
//! lineage instead of standing up a real `swarm-localstore`.

use std::collections::HashMap;
use std::sync::Mutex;

use swarm_primitives::{Address, Chunk};

use crate::error::ChunkerError;
use crate::sink::ChunkSink;
use crate::source::ChunkSource;

#[derive(Default)]
pub struct MapSink {
    chunks: Mutex<HashMap<Address, Chunk>>,
}

impl MapSink {
    pub fn len(&self) -> usize {
        self.chunks.lock().unwrap().len()
    }

    pub fn get_sync(&self, address: Address) -> Option<Chunk> {
        self.chunks.lock().unwrap().get(&address).cloned()
    }
}

impl ChunkSink for MapSink {
    async fn put(&self, chunk: Chunk) -> Result<bool, ChunkerError> {
        let mut guard = self.chunks.lock().unwrap();
        Ok(guard.insert(chunk.address(), chunk).is_some())
    }
}

impl ChunkSource for MapSink {
    async fn get(&self, address: Address) -> Result<Chunk, ChunkerError> {
        self.chunks
            .lock()
            .unwrap()
            .get(&address)
            .cloned()
            .ok_or(ChunkerError::MissingChunk(address))
    }
}
