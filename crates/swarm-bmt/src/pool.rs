use tokio::sync::mpsc;

use swarm_primitives::CHUNK_SIZE;

/// A pool of pre-allocated, zeroed scratch buffers sized for one chunk each.
/// Amortises the cost of repeatedly allocating a 4096-byte buffer per
/// in-flight hash.
///
/// Bounded by a `tokio::sync::mpsc` channel pre-filled at construction, the
/// same shape as a resource pool backed by a bounded channel elsewhere in
/// this lineage: acquire blocks until a buffer is returned, and returning a
/// buffer is just a channel send, so it happens even if the holder panics
/// mid-hash (the `PooledBuffer` guard's `Drop` impl still runs).
pub struct Pool {
    sender: mpsc::Sender<Box<[u8; CHUNK_SIZE]>>,
    receiver: tokio::sync::Mutex<mpsc::Receiver<Box<[u8; CHUNK_SIZE]>>>,
}

impl Pool {
    /// Build a pool with `capacity` pre-allocated buffers — one tree per
    /// inflight hash, per `spec.md` §4.1.
    pub async fn new(capacity: usize) -> Self {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        for _ in 0..capacity {
            // The channel was sized for `capacity` sends above, so this
            // cannot block.
            sender
                .send(Box::new([0u8; CHUNK_SIZE]))
                .await
                .expect("pool channel just created");
        }
        Self {
            sender,
            receiver: tokio::sync::Mutex::new(receiver),
        }
    }

    /// Borrow a buffer from the pool, waiting if none is currently free.
    pub async fn acquire(&self) -> PooledBuffer {
        let mut buf = self
            .receiver
            .lock()
            .await
            .recv()
            .await
            .expect("pool sender outlives its receivers");
        buf.fill(0);
        PooledBuffer {
            buf: Some(buf),
            sender: self.sender.clone(),
        }
    }
}

/// A buffer on loan from a [`Pool`]. Returned to the pool automatically when
/// dropped, whether that happens after a normal `hash()` call or because the
/// holding task was cancelled.
pub struct PooledBuffer {
    buf: Option<Box<[u8; CHUNK_SIZE]>>,
    sender: mpsc::Sender<Box<[u8; CHUNK_SIZE]>>,
}

impl std::ops::Deref for PooledBuffer {
    type Target = [u8; CHUNK_SIZE];

    fn deref(&self) -> &Self::Target {
        self.buf.as_ref().expect("buffer taken only by Drop")
    }
}

impl std::ops::DerefMut for PooledBuffer {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.buf.as_mut().expect("buffer taken only by Drop")
    }
}

impl Drop for PooledBuffer {
    fn drop(&mut self) {
        if let Some(buf) = self.buf.take() {
            // A full channel here means the pool shrank (a prior buffer was
            // dropped without a receiver draining it); dropping the buffer
            // instead of blocking is the correct fallback.
            let _ = self.sender.try_send(buf);
        }
    }
}
