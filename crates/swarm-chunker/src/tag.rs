use std::sync::atomic::{AtomicU64, Ordering};

/// Upload-session progress counters (`spec.md` §3 "Tag"). Counters are
/// plain atomics behind a shared `Arc` so a progress poller never blocks
/// the splitter task that is incrementing them.
///
/// Invariant: `0 <= split <= stored <= sent <= synced <= total` at every
/// observed instant (the splitter only ever increments in that order).
#[derive(Debug)]
pub struct Tag {
    pub uid: u64,
    pub name: String,
    total: AtomicU64,
    split: AtomicU64,
    stored: AtomicU64,
    sent: AtomicU64,
    synced: AtomicU64,
    start_time_unix: u64,
}

impl Tag {
    pub fn new(uid: u64, name: impl Into<String>, start_time_unix: u64) -> Self {
        Self {
            uid,
            name: name.into(),
            total: AtomicU64::new(0),
            split: AtomicU64::new(0),
            stored: AtomicU64::new(0),
            sent: AtomicU64::new(0),
            synced: AtomicU64::new(0),
            start_time_unix,
        }
    }

    pub fn set_total(&self, total: u64) {
        self.total.store(total, Ordering::Release);
    }

    pub fn inc_split(&self) {
        self.split.fetch_add(1, Ordering::AcqRel);
    }

    pub fn inc_stored(&self) {
        self.stored.fetch_add(1, Ordering::AcqRel);
    }

    pub fn inc_sent(&self) {
        self.sent.fetch_add(1, Ordering::AcqRel);
    }

    pub fn inc_synced(&self) {
        self.synced.fetch_add(1, Ordering::AcqRel);
    }

    pub fn snapshot(&self) -> TagSnapshot {
        TagSnapshot {
            uid: self.uid,
            name: self.name.clone(),
            total: self.total.load(Ordering::Acquire),
            split: self.split.load(Ordering::Acquire),
            stored: self.stored.load(Ordering::Acquire),
            sent: self.sent.load(Ordering::Acquire),
            synced: self.synced.load(Ordering::Acquire),
            start_time_unix: self.start_time_unix,
        }
    }
}

/// A point-in-time, plain-data copy of a [`Tag`]'s counters, safe to hand
/// to a caller without holding any reference into the live tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagSnapshot {
    pub uid: u64,
    pub name: String,
    pub total: u64,
    pub split: u64,
    pub stored: u64,
    pub sent: u64,
    pub synced: u64,
    pub start_time_unix: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_start_at_zero_and_increment_independently() {
        let tag = Tag::new(1, "upload-1", 0);
        tag.set_total(3);
        tag.inc_split();
        tag.inc_split();
        let snap = tag.snapshot();
        assert_eq!(snap.total, 3);
        assert_eq!(snap.split, 2);
        assert_eq!(snap.stored, 0);
    }
}
