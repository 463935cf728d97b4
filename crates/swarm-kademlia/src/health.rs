//! Health queries over a [`crate::pot::Pot`] (`spec.md` §4.4 "Health").

use swarm_primitives::Address;

use crate::pot::Pot;

/// The largest `po` at which the tree has at least `neighbourhood_size`
/// connected peers with `po(peer, base) >= po` — the deepest proximity
/// radius this node can still claim enough near-coverage for.
pub fn neighbourhood_depth(pot: &Pot, base: Address, neighbourhood_size: usize) -> u32 {
    let histogram = pot.connected_po_histogram(base);
    let mut running = 0usize;
    for po in (0..=256u32).rev() {
        running += histogram[po as usize];
        if running >= neighbourhood_size {
            return po;
        }
    }
    0
}

/// `true` iff every `po` from `0` up to [`neighbourhood_depth`] has at
/// least one connected peer.
///
/// `spec.md`'s full health definition also requires the nearest-neighbour
/// set to match that of an "oracle peer-pot map" — a network-wide
/// property no single node's tree can check against itself. That half is
/// the caller's responsibility (typically a test harness comparing two
/// nodes' trees directly); this function only checks local PO coverage.
pub fn healthy(pot: &Pot, base: Address, neighbourhood_size: usize) -> bool {
    let histogram = pot.connected_po_histogram(base);
    let total: usize = histogram.iter().sum();
    if total < neighbourhood_size {
        return false;
    }
    let depth = neighbourhood_depth(pot, base, neighbourhood_size);
    (0..=depth as usize).all(|po| histogram[po] > 0)
}
