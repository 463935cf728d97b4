//! Opens a node over a temporary store, uploads a small buffer, then
//! downloads it back and checks the round trip — the minimal wiring a
//! real binary (daemon, test harness) would build on top of.

use futures::StreamExt;
use swarm_localstore::StoreConfig;
use swarm_node::{Config, Node};
use swarm_primitives::Address;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let dir = tempfile::tempdir()?;
    let store_config = StoreConfig::new(10_000, Address::zero());
    let config = Config::new(store_config, 4, 256);
    let node = Node::open(dir.path().join("store.redb"), config)?;

    let payload = b"swarm-node wiring demo payload".repeat(200);
    let root = node
        .upload(std::io::Cursor::new(payload.clone()), payload.len() as u64, None)
        .await?;
    tracing::info!(%root, bytes = payload.len(), "uploaded");

    let mut downloaded = Vec::new();
    let mut stream = Box::pin(node.download(root, None));
    while let Some(chunk) = stream.next().await {
        downloaded.extend_from_slice(&chunk?);
    }

    assert_eq!(downloaded, payload, "round trip must reproduce the upload");
    tracing::info!(depth = node.neighbourhood_depth(), healthy = node.healthy(), "node status");
    println!("round trip ok: {} bytes", downloaded.len());
    Ok(())
}
