use swarm_primitives::{Address, Chunk};

/// The internal per-chunk bookkeeping record from `spec.md` §3
/// "StoreItem", reconstructed from the `retrievalData`/`retrievalAccess`
/// table rows rather than stored as a single blob (the indexes already
/// hold every field at the byte layout the schema table specifies).
#[derive(Debug, Clone)]
pub struct StoreItem {
    pub address: Address,
    pub chunk: Chunk,
    pub store_timestamp: u64,
    pub access_timestamp: Option<u64>,
    pub bin_id: u64,
    pub proximity_order: u32,
}
