use swarm_primitives::Address;

/// An entry held in the proximity tree (`spec.md` §3 `PeerEntry`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeerEntry {
    pub address: Address,
    pub capabilities: Vec<String>,
    pub connected: bool,
    /// Assigned by `Pot::add` on an entry's first insertion and carried
    /// through every later update of the same address; `each_neighbour`
    /// ties PO ties by this value so callers cannot reorder by poking it.
    pub(crate) seq: u64,
}

impl PeerEntry {
    pub fn new(address: Address, capabilities: Vec<String>) -> Self {
        Self {
            address,
            capabilities,
            connected: false,
            seq: 0,
        }
    }
}
