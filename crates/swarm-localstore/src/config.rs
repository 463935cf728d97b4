use swarm_primitives::Address;

/// `spec.md` §6 configuration table, the `LocalStore`-scoped subset.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct StoreConfig {
    /// Maximum gc-index cardinality before eviction.
    pub capacity: u64,
    /// How many entries to evict in one GC round. Not pinned by the
    /// original source (`spec.md` §9 open question); this workspace
    /// defaults it to `capacity / 10` (minimum 1) so amortised eviction
    /// cost per `Put` stays O(1) without a GC round on every write once
    /// the store sits at capacity.
    pub target_collect_size: u64,
    /// This node's own address, used to compute `po` for stored chunks.
    pub base_address: Address,
}

impl StoreConfig {
    pub fn new(capacity: u64, base_address: Address) -> Self {
        Self {
            capacity,
            target_collect_size: default_target_collect_size(capacity),
            base_address,
        }
    }
}

pub fn default_target_collect_size(capacity: u64) -> u64 {
    (capacity / 10).max(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_target_collect_size_has_a_floor_of_one() {
        assert_eq!(default_target_collect_size(5), 1);
        assert_eq!(default_target_collect_size(1000), 100);
    }
}
