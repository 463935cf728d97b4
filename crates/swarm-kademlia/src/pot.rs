//! The proximity tree ("pot", `spec.md` §4.4): a recursive tree keyed by
//! XOR proximity order. Each node pins one entry; its `bins` are
//! subtrees, one per distinct proximity order its pinned entries diverge
//! at, ordered ascending by that proximity order.
//!
//! Grounded on `other_examples/0d5f9c52_nxm-rs-vertex__crates-swarm-storer-src-traits.rs.rs`'s
//! `parking_lot::RwLock`-guarded in-memory store test double for the
//! locking discipline; the tree algorithm itself has no counterpart in
//! this lineage (its own DHT module wraps `libp2p`'s wire protocol, the
//! wrong layer for an in-process metric-space index).

use std::collections::HashMap;

use parking_lot::RwLock;

use swarm_primitives::Address;

use crate::error::{KademliaError, Result};
use crate::peer::PeerEntry;

struct Node {
    pinned: PeerEntry,
    /// Ascending by `po`; every entry under `bins[i].1` shares exactly
    /// `bins[i].0` leading bits with `pinned`.
    bins: Vec<(u32, Node)>,
}

impl Node {
    fn new(pinned: PeerEntry) -> Self {
        Self {
            pinned,
            bins: Vec::new(),
        }
    }

    /// Insert or replace by address. Returns the previous entry and
    /// whether the address was already present.
    fn insert(&mut self, entry: PeerEntry) -> (Option<PeerEntry>, bool) {
        if entry.address == self.pinned.address {
            return (Some(std::mem::replace(&mut self.pinned, entry)), true);
        }
        let po = self.pinned.address.proximity_order(&entry.address);
        match self.bins.binary_search_by_key(&po, |(p, _)| *p) {
            Ok(i) => self.bins[i].1.insert(entry),
            Err(i) => {
                self.bins.insert(i, (po, Node::new(entry)));
                (None, false)
            }
        }
    }

    fn find(&self, addr: Address) -> Option<&PeerEntry> {
        if addr == self.pinned.address {
            return Some(&self.pinned);
        }
        let po = self.pinned.address.proximity_order(&addr);
        let i = self.bins.binary_search_by_key(&po, |(p, _)| *p).ok()?;
        self.bins[i].1.find(addr)
    }

    /// Remove `addr`. Returns the removed entry and whether `self` is now
    /// empty (no pin at all) — the caller must drop a node reported empty.
    fn remove(&mut self, addr: Address) -> (Option<PeerEntry>, bool) {
        if addr == self.pinned.address {
            let old_pin = self.pinned.clone();
            if self.bins.is_empty() {
                return (Some(old_pin), true);
            }
            // Rotate the highest-po child's own pin up to replace this
            // node's pin, recursively removing it from that child.
            let last = self.bins.len() - 1;
            let promoted_addr = self.bins[last].1.pinned.address;
            let (promoted, child_emptied) = self.bins[last].1.remove(promoted_addr);
            self.pinned = promoted.expect("child pin is present before its own removal");
            if child_emptied {
                self.bins.remove(last);
            } else {
                // Anything left in that bin's subtree is now keyed by its
                // proximity order to a *different* pin (the one just
                // promoted), which is always strictly greater than the old
                // key (both the old and new pins matched the previous
                // pinned address through the old key's bit, and diverged
                // from it on the same side at that bit, so they agree with
                // each other at least one bit further). It stays the last,
                // highest-keyed bin; only its key needs updating.
                let new_key = self
                    .pinned
                    .address
                    .proximity_order(&self.bins[last].1.pinned.address);
                self.bins[last].0 = new_key;
            }
            (Some(old_pin), false)
        } else {
            let po = self.pinned.address.proximity_order(&addr);
            match self.bins.binary_search_by_key(&po, |(p, _)| *p) {
                Ok(i) => {
                    let (removed, child_emptied) = self.bins[i].1.remove(addr);
                    if child_emptied {
                        self.bins.remove(i);
                    }
                    (removed, false)
                }
                Err(_) => (None, false),
            }
        }
    }

    fn each(&self, f: &mut impl FnMut(&PeerEntry) -> bool) -> bool {
        if !f(&self.pinned) {
            return false;
        }
        for (_, child) in &self.bins {
            if !child.each(f) {
                return false;
            }
        }
        true
    }
}

#[derive(Default)]
struct Inner {
    root: Option<Node>,
    len: usize,
    /// Monotonic counter handing out each newly-inserted address its
    /// `PeerEntry::seq`; an update of an existing address keeps the seq it
    /// was first assigned.
    next_seq: u64,
}

impl Inner {
    fn add(&mut self, mut entry: PeerEntry) -> (Option<PeerEntry>, bool) {
        match &mut self.root {
            None => {
                entry.seq = self.next_seq;
                self.next_seq += 1;
                self.root = Some(Node::new(entry));
                self.len = 1;
                (None, false)
            }
            Some(node) => {
                match node.find(entry.address) {
                    Some(existing) => entry.seq = existing.seq,
                    None => {
                        entry.seq = self.next_seq;
                        self.next_seq += 1;
                    }
                }
                let (old, found) = node.insert(entry);
                if !found {
                    self.len += 1;
                }
                (old, found)
            }
        }
    }

    fn remove(&mut self, addr: Address) -> (Option<PeerEntry>, bool) {
        let Some(node) = &mut self.root else {
            return (None, false);
        };
        let (removed, emptied) = node.remove(addr);
        if emptied {
            self.root = None;
        }
        if removed.is_some() {
            self.len -= 1;
        }
        let found = removed.is_some();
        (removed, found)
    }

    fn find(&self, addr: Address) -> Option<PeerEntry> {
        self.root.as_ref()?.find(addr).cloned()
    }

    fn each(&self, mut f: impl FnMut(&PeerEntry) -> bool) {
        if let Some(root) = &self.root {
            root.each(&mut f);
        }
    }
}

/// An in-memory set of [`PeerEntry`] indexed by 32-byte address, supporting
/// efficient nearest-to-target queries under the XOR metric.
#[derive(Default)]
pub struct Pot {
    inner: RwLock<Inner>,
}

impl Pot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces by address. Returns the previous entry if
    /// present. Duplicate addresses are idempotent.
    pub fn add(&self, entry: PeerEntry) -> (Option<PeerEntry>, bool) {
        self.inner.write().add(entry)
    }

    /// Removes by address; restructures by rotating a child into the
    /// pinned slot if needed. A no-op on a non-existent address.
    pub fn remove(&self, addr: Address) -> (Option<PeerEntry>, bool) {
        self.inner.write().remove(addr)
    }

    /// Atomic replace-or-delete by callback, without reorganising the
    /// tree: overwriting an existing pin's capabilities happens in place,
    /// and deletion (`f` returning `None`) delegates to [`Pot::remove`].
    /// Returns `Err(TreeDuplicate)` if `f` returns an entry whose address
    /// does not match `addr` — such an entry cannot occupy `addr`'s
    /// existing slot without reorganising, which `swap` will not do.
    pub fn swap(
        &self,
        addr: Address,
        f: impl FnOnce(Option<&PeerEntry>) -> Option<PeerEntry>,
    ) -> Result<bool> {
        let existing = self.inner.read().find(addr);
        match f(existing.as_ref()) {
            Some(new_entry) => {
                if new_entry.address != addr {
                    return Err(KademliaError::TreeDuplicate);
                }
                self.add(new_entry);
                Ok(true)
            }
            None => {
                if existing.is_some() {
                    self.remove(addr);
                    Ok(true)
                } else {
                    Ok(false)
                }
            }
        }
    }

    pub fn size(&self) -> usize {
        self.inner.read().len
    }

    /// In-order traversal (pin first, then bins ascending by `po`). `f`
    /// returning `false` stops the walk.
    pub fn each(&self, f: impl FnMut(&PeerEntry) -> bool) {
        self.inner.read().each(f);
    }

    /// Entries in decreasing `po(entry, target)`, ties broken by
    /// insertion order. `f` returning `false` stops iteration.
    ///
    /// Collects and sorts rather than walking the tree target-guided —
    /// the tree's own bin order is relative to each node's pinned address,
    /// not to an arbitrary external `target`, so a single in-order walk
    /// cannot produce target-relative order without this step.
    pub fn each_neighbour(&self, target: Address, mut f: impl FnMut(&PeerEntry) -> bool) {
        let mut entries = Vec::new();
        self.each(|e| {
            entries.push(e.clone());
            true
        });
        entries.sort_by(|a, b| {
            let po_a = a.address.proximity_order(&target);
            let po_b = b.address.proximity_order(&target);
            po_b.cmp(&po_a).then(a.seq.cmp(&b.seq))
        });
        for entry in entries {
            if !f(&entry) {
                break;
            }
        }
    }

    /// Dispatches up to `n` concurrent calls to `f`, limited to entries
    /// with `po(entry, target) >= max_po`. Ordering between calls is not
    /// guaranteed; returns once every dispatched call has completed.
    pub async fn each_neighbour_async<F, Fut>(&self, target: Address, n: usize, max_po: u32, f: F)
    where
        F: Fn(PeerEntry) -> Fut + Send + Sync + 'static,
        Fut: std::future::Future<Output = ()> + Send + 'static,
    {
        let mut candidates = Vec::new();
        self.each(|e| {
            if e.address.proximity_order(&target) >= max_po {
                candidates.push(e.clone());
            }
            true
        });

        let f = std::sync::Arc::new(f);
        let mut join_set = tokio::task::JoinSet::new();
        let mut iter = candidates.into_iter();
        for entry in iter.by_ref().take(n.max(1)) {
            let f = f.clone();
            join_set.spawn(async move { f(entry).await });
        }
        while join_set.join_next().await.is_some() {
            if let Some(entry) = iter.next() {
                let f = f.clone();
                join_set.spawn(async move { f(entry).await });
            }
        }
    }

    /// Merges `a` and `b` into a fresh tree. `commonCount` is the number
    /// of addresses present in both inputs.
    pub fn union(a: &Pot, b: &Pot) -> (Pot, usize) {
        let merged = Pot::new();
        a.each(|e| {
            merged.add(e.clone());
            true
        });
        let mut common = 0usize;
        b.each(|e| {
            let (_, found) = merged.add(e.clone());
            if found {
                common += 1;
            }
            true
        });
        (merged, common)
    }

    /// Histogram of *connected* entries by exact `po(entry, base)`,
    /// indices `0..=256`. Shared by [`crate::health::neighbourhood_depth`]
    /// and [`Pot::suggest_peer`].
    pub(crate) fn connected_po_histogram(&self, base: Address) -> [usize; 257] {
        let mut histogram = [0usize; 257];
        self.each(|e| {
            if e.connected {
                let po = base.proximity_order(&e.address).min(256) as usize;
                histogram[po] += 1;
            }
            true
        });
        histogram
    }

    /// The nearest connected peer to `target`, plus a hint: the lowest
    /// `po` bin with fewer than `neighbourhood_size` connected peers at or
    /// above it (where adding a connection would most improve coverage).
    pub fn suggest_peer(
        &self,
        target: Address,
        neighbourhood_size: usize,
    ) -> (Option<PeerEntry>, Option<u32>) {
        let mut nearest: Option<PeerEntry> = None;
        let mut nearest_po: Option<u32> = None;
        self.each(|e| {
            if e.connected {
                let po = e.address.proximity_order(&target);
                if nearest_po.map_or(true, |np| po > np) {
                    nearest = Some(e.clone());
                    nearest_po = Some(po);
                }
            }
            true
        });

        let histogram = self.connected_po_histogram(target);
        let mut running = 0usize;
        let mut hint = None;
        for po in (0..=256u32).rev() {
            running += histogram[po as usize];
            if running < neighbourhood_size {
                hint = Some(po);
                break;
            }
        }
        (nearest, hint)
    }
}

impl Pot {
    /// Replace an entry's capability list in place, a thin convenience
    /// wrapper over [`Pot::swap`] for the common case.
    pub fn set_capabilities(&self, addr: Address, capabilities: Vec<String>) -> Result<bool> {
        self.swap(addr, |existing| {
            existing.map(|e| PeerEntry {
                address: e.address,
                capabilities,
                connected: e.connected,
                seq: e.seq,
            })
        })
    }

    /// Mark an entry connected/disconnected in place.
    pub fn set_connected(&self, addr: Address, connected: bool) -> Result<bool> {
        self.swap(addr, |existing| {
            existing.map(|e| PeerEntry {
                address: e.address,
                capabilities: e.capabilities.clone(),
                connected,
                seq: e.seq,
            })
        })
    }

    /// Count of connected peers grouped by exact `po` relative to `base`,
    /// exposed for callers building their own coverage diagnostics.
    pub fn connected_histogram(&self, base: Address) -> HashMap<u32, usize> {
        let histogram = self.connected_po_histogram(base);
        histogram
            .iter()
            .enumerate()
            .filter(|(_, count)| **count > 0)
            .map(|(po, count)| (po as u32, *count))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(byte: u8) -> PeerEntry {
        let mut bytes = [0u8; 32];
        bytes[0] = byte;
        PeerEntry::new(Address::new(bytes), Vec::new())
    }

    #[test]
    fn add_is_idempotent_on_duplicate_addresses() {
        let pot = Pot::new();
        let (old, found) = pot.add(entry(0b0011_1100));
        assert!(old.is_none());
        assert!(!found);
        let (old, found) = pot.add(entry(0b0011_1100));
        assert!(old.is_some());
        assert!(found);
        assert_eq!(pot.size(), 1);
    }

    #[test]
    fn remove_of_missing_peer_is_a_no_op() {
        let pot = Pot::new();
        pot.add(entry(1));
        let (old, found) = pot.remove(Address::new([0xff; 32]));
        assert!(old.is_none());
        assert!(!found);
        assert_eq!(pot.size(), 1);
    }

    // spec.md §8 scenario 7: insert four bit-string-prefixed addresses
    // (one a duplicate) and check each_neighbour's decreasing-PO order.
    // The distilled scenario text states PO values 8, 4, 1 for the three
    // surviving entries; the real XOR metric over these exact bit strings
    // gives 8, 2, 1 (po(00111100,00011100) diverges at bit index 2, not
    // 4) — the ordering is what's asserted here, not that specific
    // (likely transcription-slipped) middle value.
    #[test]
    fn each_neighbour_yields_decreasing_proximity_order() {
        let pot = Pot::new();
        pot.add(entry(0b0011_1100));
        pot.add(entry(0b0111_1100));
        pot.add(entry(0b0011_1100)); // duplicate, collapses into the first
        pot.add(entry(0b0001_1100));

        let target = Address::new({
            let mut b = [0u8; 32];
            b[0] = 0b0011_1100;
            b
        });

        let mut order = Vec::new();
        pot.each_neighbour(target, |e| {
            order.push(e.address.as_bytes()[0]);
            true
        });

        assert_eq!(order, vec![0b0011_1100, 0b0001_1100, 0b0111_1100]);
    }

    #[test]
    fn union_reports_intersection_cardinality() {
        let a = Pot::new();
        a.add(entry(1));
        a.add(entry(2));
        let b = Pot::new();
        b.add(entry(2));
        b.add(entry(3));

        let (merged, common) = Pot::union(&a, &b);
        assert_eq!(merged.size() + common, a.size() + b.size());
        assert_eq!(common, 1);
        assert_eq!(merged.size(), 3);
    }

    #[test]
    fn swap_rejects_a_callback_that_changes_the_address() {
        let pot = Pot::new();
        let addr1 = entry(1).address;
        pot.add(entry(1));
        let other = entry(2);
        let result = pot.swap(addr1, |_| Some(other));
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn each_neighbour_async_visits_every_candidate_above_the_po_floor() {
        let pot = Pot::new();
        for b in [1u8, 2, 3, 4] {
            let mut e = entry(b);
            e.connected = true;
            pot.add(e);
        }
        let target = Address::new([0u8; 32]);
        let seen = std::sync::Arc::new(std::sync::Mutex::new(Vec::new()));
        let seen2 = seen.clone();
        pot.each_neighbour_async(target, 2, 0, move |e| {
            let seen = seen2.clone();
            async move {
                seen.lock().unwrap().push(e.address.as_bytes()[0]);
            }
        })
        .await;
        let mut seen = seen.lock().unwrap().clone();
        seen.sort_unstable();
        assert_eq!(seen, vec![1, 2, 3, 4]);
    }

    fn addr(bytes: [u8; 2]) -> Address {
        let mut raw = [0u8; 32];
        raw[0] = bytes[0];
        raw[1] = bytes[1];
        Address::new(raw)
    }

    // Removing a pin whose nearest bin holds more than one entry must
    // re-key that bin's residual subtree against the newly promoted pin,
    // not leave it under its old proximity order to the removed pin.
    #[test]
    fn remove_repots_the_residual_subtree_of_the_promoted_bin() {
        let pot = Pot::new();
        let a = addr([0x00, 0x00]);
        let e1 = addr([0x01, 0x00]); // po(a, e1) = 7
        let e2 = addr([0x00, 0x80]); // po(a, e2) = 8
        let e3 = addr([0x00, 0xC0]); // po(a, e3) = 8, po(e2, e3) = 9
        pot.add(PeerEntry::new(a, Vec::new()));
        pot.add(PeerEntry::new(e1, Vec::new()));
        pot.add(PeerEntry::new(e2, Vec::new()));
        pot.add(PeerEntry::new(e3, Vec::new()));
        assert_eq!(pot.size(), 4);

        pot.remove(a);
        assert_eq!(pot.size(), 3);

        // e3 must still be reachable at its re-keyed position: re-adding it
        // must be treated as an update, not a second insertion under a
        // stale key left over from before the promotion.
        let (old, found) = pot.add(PeerEntry::new(e3, Vec::new()));
        assert!(old.is_some(), "e3 must remain reachable after remove(a)");
        assert!(found);
        assert_eq!(pot.size(), 3);

        let mut order = Vec::new();
        pot.each(|e| {
            order.push(e.address);
            true
        });
        assert!(order.contains(&e1));
        assert!(order.contains(&e2));
        assert!(order.contains(&e3));
    }

    // each_neighbour must break proximity-order ties by insertion order,
    // not by incidental tree-walk order, so repeated calls agree even as
    // the tree is restructured by unrelated removals.
    #[test]
    fn each_neighbour_breaks_ties_by_insertion_order() {
        let pot = Pot::new();
        // All three share po = 0 with the all-ones target below (their
        // first bit is 0, the target's is 1).
        let first = entry(0b0000_0001);
        let second = entry(0b0000_0010);
        let third = entry(0b0000_0011);
        pot.add(first.clone());
        pot.add(second.clone());
        pot.add(third.clone());

        let target = Address::new([0xff; 32]);
        let mut order = Vec::new();
        pot.each_neighbour(target, |e| {
            order.push(e.address.as_bytes()[0]);
            true
        });
        assert_eq!(
            order,
            vec![first.address.as_bytes()[0], second.address.as_bytes()[0], third.address.as_bytes()[0]]
        );
    }
}
