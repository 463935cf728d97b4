use std::sync::Arc;

use bytes::Bytes;
use futures::{Stream, StreamExt};
use tokio::io::AsyncRead;
use tokio_util::sync::CancellationToken;

use swarm_chunker::{ChunkerError, Tag};
use swarm_kademlia::{PeerEntry, Pot};
use swarm_localstore::{GetMode, LocalStore};
use swarm_primitives::Address;

use crate::adapters::{StoreSink, StoreSource};
use crate::config::Config;
use crate::error::Result;

/// Wires addressing (`swarm-bmt`/`swarm-chunker`), the local chunk store,
/// and the proximity tree behind one handle. Data flow follows `spec.md`
/// §2: upload splits bytes into chunks and puts them through the store;
/// download looks the root up locally, falling back to the caller's own
/// network retrieval for chunks `Get` reports missing.
pub struct Node {
    config: Config,
    store: Arc<LocalStore>,
    peers: Arc<Pot>,
    cancel: CancellationToken,
}

impl Node {
    pub fn open(path: impl AsRef<std::path::Path>, config: Config) -> Result<Self> {
        let store = LocalStore::open(path, config.store.clone())?;
        tracing::info!(
            base_address = %config.store.base_address,
            neighbourhood_size = config.neighbourhood_size,
            "node opened"
        );
        Ok(Self {
            config,
            store: Arc::new(store),
            peers: Arc::new(Pot::new()),
            cancel: CancellationToken::new(),
        })
    }

    pub fn store(&self) -> &LocalStore {
        &self.store
    }

    pub fn peers(&self) -> &Pot {
        &self.peers
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Split `reader` into chunks and upload each to the local store,
    /// returning the root reference.
    pub async fn upload<R>(&self, reader: R, length: u64, tag: Option<Arc<Tag>>) -> Result<Address>
    where
        R: AsyncRead + Unpin,
    {
        let sink = StoreSink {
            store: self.store.clone(),
        };
        let root = swarm_chunker::split(reader, length, &sink, tag, self.cancel.child_token()).await?;
        Ok(root)
    }

    /// Reassemble the stream rooted at `root`. Individual chunk fetches
    /// that miss locally surface as `ChunkerError::MissingChunk`, the
    /// caller's signal to retrieve them from peers via [`Node::peers`]
    /// and re-`Put` before retrying.
    pub fn download(
        &self,
        root: Address,
        range: Option<(u64, u64)>,
    ) -> impl Stream<Item = std::result::Result<Bytes, ChunkerError>> + 'static {
        let source = StoreSource {
            store: self.store.clone(),
        };
        let cancel = self.cancel.child_token();
        async_stream::try_stream! {
            let stream = swarm_chunker::join(&source, root, range, cancel);
            futures::pin_mut!(stream);
            while let Some(item) = stream.next().await {
                yield item?;
            }
        }
    }

    pub fn neighbourhood_depth(&self) -> u32 {
        swarm_kademlia::neighbourhood_depth(
            &self.peers,
            self.config.store.base_address,
            self.config.neighbourhood_size,
        )
    }

    pub fn healthy(&self) -> bool {
        swarm_kademlia::healthy(
            &self.peers,
            self.config.store.base_address,
            self.config.neighbourhood_size,
        )
    }

    /// The peers this node would ship a just-uploaded chunk to: nearest
    /// neighbours of its address, per `spec.md` §2's upload data flow.
    pub fn sync_targets(&self, address: Address, n: usize) -> Vec<PeerEntry> {
        let mut targets = Vec::with_capacity(n);
        self.peers.each_neighbour(address, |entry| {
            if !entry.connected {
                return true;
            }
            targets.push(entry.clone());
            targets.len() < n
        });
        targets
    }

    /// Cancel every in-flight `upload`/`download` started from this node.
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }

    /// Fetch a chunk already addressed locally without going through the
    /// chunker (e.g. answering a peer's retrieve request for one chunk).
    pub async fn get_chunk(&self, address: Address, mode: GetMode) -> Result<swarm_primitives::Chunk> {
        Ok(self.store.get(mode, address).await?)
    }
}
