use swarm_localstore::StoreConfig;

/// `spec.md` §6 configuration table, assembled into one value the
/// embedding binary constructs directly (e.g. from a config file it
/// reads) — no CLI surface is in scope.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Config {
    pub store: StoreConfig,
    /// Peer count defining the "near" bin for health/depth queries.
    pub neighbourhood_size: usize,
    /// Maximum `po` value pull subscriptions cover.
    pub pull_sync_bins: u32,
}

impl Config {
    pub fn new(store: StoreConfig, neighbourhood_size: usize, pull_sync_bins: u32) -> Self {
        Self {
            store,
            neighbourhood_size,
            pull_sync_bins,
        }
    }
}
