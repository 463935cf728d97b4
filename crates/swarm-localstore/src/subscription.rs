//! Pull/push feed signalling, grounded directly on this lineage's own
//! `BucketBroadcast` (`tokio::sync::broadcast` wrapped in a small struct
//! with `subscribe()`/`trigger()`/`subscriber_count()`) — keyed by
//! proximity bin for pull, global for push.

use std::collections::HashMap;
use std::sync::Mutex;

use tokio::sync::broadcast;

const FEED_CAPACITY: usize = 64;

/// One broadcast channel per `po`, created lazily. Sends the latest
/// `binID` that became available in that bin; subscribers use it only as
/// a wake-up signal and always re-scan the index for their own cursor.
#[derive(Default)]
pub struct PullFeeds {
    channels: Mutex<HashMap<u8, broadcast::Sender<u64>>>,
}

impl PullFeeds {
    fn sender_for(&self, po: u8) -> broadcast::Sender<u64> {
        self.channels
            .lock()
            .unwrap()
            .entry(po)
            .or_insert_with(|| broadcast::channel(FEED_CAPACITY).0)
            .clone()
    }

    pub fn trigger(&self, po: u8, bin_id: u64) {
        let sender = self.sender_for(po);
        let receivers = sender.send(bin_id).unwrap_or(0);
        tracing::debug!(po, bin_id, receivers, "triggered pull feed");
    }

    pub fn subscribe(&self, po: u8) -> broadcast::Receiver<u64> {
        self.sender_for(po).subscribe()
    }
}

/// A single global wake-up channel for the push-sync feed.
pub struct PushFeed {
    sender: broadcast::Sender<()>,
}

impl Default for PushFeed {
    fn default() -> Self {
        let (sender, _) = broadcast::channel(FEED_CAPACITY);
        Self { sender }
    }
}

impl PushFeed {
    pub fn trigger(&self) {
        let receivers = self.sender.send(()).unwrap_or(0);
        tracing::debug!(receivers, "triggered push feed");
    }

    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.sender.subscribe()
    }
}
