use std::collections::HashMap;
use std::time::Duration;

use futures::StreamExt;
use swarm_localstore::{GetMode, LocalStore, PutMode, StoreConfig};
use swarm_primitives::chunk::build_data;
use swarm_primitives::{Address, Chunk};

fn chunk_for(seed: u16) -> Chunk {
    let mut payload = vec![0u8; 64];
    payload[0] = (seed & 0xff) as u8;
    payload[1] = (seed >> 8) as u8;
    let data = build_data(payload.len() as u64, &payload).unwrap();
    let address = swarm_bmt::hash(payload.len() as u64, &payload).unwrap();
    Chunk::new_unchecked(address, data)
}

/// Search a small range of synthetic chunks for `count` addresses sharing
/// one proximity order relative to `base` — used so pull-subscription
/// tests can target one concrete bin without depending on exact hash
/// output values.
fn chunks_sharing_po(base: Address, count: usize) -> (u32, Vec<Chunk>) {
    let mut by_po: HashMap<u32, Vec<Chunk>> = HashMap::new();
    for seed in 0u16..4000 {
        let chunk = chunk_for(seed);
        let po = base.proximity_order(&chunk.address());
        let bucket = by_po.entry(po).or_default();
        bucket.push(chunk);
        if bucket.len() >= count {
            return (po, by_po.remove(&po).unwrap());
        }
    }
    panic!("did not find {count} chunks sharing a proximity order within search budget");
}

fn open_store(capacity: u64) -> (tempfile::TempDir, LocalStore) {
    let dir = tempfile::tempdir().unwrap();
    let config = StoreConfig::new(capacity, Address::zero());
    let store = LocalStore::open(dir.path().join("store.redb"), config).unwrap();
    (dir, store)
}

#[tokio::test]
async fn upload_then_get_round_trips_and_duplicate_put_is_unchanged() {
    let (_dir, store) = open_store(1000);
    let chunk = chunk_for(7);

    let existed = store.put(PutMode::Upload, chunk.clone()).await.unwrap();
    assert!(!existed);

    let fetched = store.get(GetMode::Lookup, chunk.address()).await.unwrap();
    assert_eq!(fetched.payload(), chunk.payload());

    let existed_again = store.put(PutMode::Upload, chunk.clone()).await.unwrap();
    assert!(existed_again);

    let still_there = store.get(GetMode::Lookup, chunk.address()).await.unwrap();
    assert_eq!(still_there.payload(), chunk.payload());
}

#[tokio::test]
async fn gc_evicts_the_oldest_entries_once_over_capacity() {
    let (_dir, store) = open_store(10);
    let mut chunks = Vec::new();
    for seed in 0..12u16 {
        let chunk = chunk_for(seed);
        store.put(PutMode::Request, chunk.clone()).await.unwrap();
        chunks.push(chunk);
    }

    // capacity=10, target_collect_size defaults to capacity/10=1: the two
    // oldest (lowest accessTs) entries are evicted once the 11th put pushes
    // gc_size past capacity.
    assert!(store
        .get(GetMode::Lookup, chunks[0].address())
        .await
        .is_err());
    assert!(store
        .get(GetMode::Lookup, chunks[1].address())
        .await
        .is_err());
    for chunk in &chunks[2..] {
        assert!(store.get(GetMode::Lookup, chunk.address()).await.is_ok());
    }
}

#[tokio::test]
async fn pull_subscription_delivers_backlog_then_resumes_from_a_cursor() {
    let (_dir, store) = open_store(1000);
    let (po, first_batch) = chunks_sharing_po(Address::zero(), 5);

    for chunk in &first_batch {
        store.put(PutMode::Sync, chunk.clone()).await.unwrap();
    }

    let mut seen = Vec::new();
    {
        let mut stream = Box::pin(store.subscribe_pull(po, 0));
        for _ in 0..first_batch.len() {
            let (_, bin_id) = tokio::time::timeout(Duration::from_secs(2), stream.next())
                .await
                .expect("backlog did not arrive in time")
                .expect("stream ended early")
                .unwrap();
            seen.push(bin_id);
        }
    }
    seen.sort_unstable();
    assert_eq!(seen, vec![1, 2, 3, 4, 5]);

    let (_, second_batch) = {
        let mut by_po: HashMap<u32, Vec<Chunk>> = HashMap::new();
        for seed in 4000u16..8000 {
            let chunk = chunk_for(seed);
            let this_po = Address::zero().proximity_order(&chunk.address());
            if this_po == po {
                by_po.entry(this_po).or_default().push(chunk);
                if by_po[&this_po].len() >= 3 {
                    break;
                }
            }
        }
        (po, by_po.remove(&po).unwrap())
    };

    for chunk in &second_batch {
        store.put(PutMode::Sync, chunk.clone()).await.unwrap();
    }

    let mut resumed = Box::pin(store.subscribe_pull(po, 5));
    let mut more = Vec::new();
    for _ in 0..second_batch.len() {
        let (_, bin_id) = tokio::time::timeout(Duration::from_secs(2), resumed.next())
            .await
            .expect("new entries did not arrive in time")
            .expect("stream ended early")
            .unwrap();
        more.push(bin_id);
    }
    more.sort_unstable();
    assert_eq!(more, vec![6, 7, 8]);
}
