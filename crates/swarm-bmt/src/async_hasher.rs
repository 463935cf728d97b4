use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use tokio::sync::Notify;

use swarm_primitives::{Address, BRANCHES, SECTION_SIZE};

use crate::error::{BmtError, Result};

/// Accepts a chunk's 32-byte sections in any order and completes once every
/// section has arrived, overlapping with I/O the way `spec.md` §4.1
/// describes for the chunker: a producer can hand sections to `write` as
/// they're read off disk/network without waiting for the others.
pub struct AsyncHasher {
    sections: Mutex<Vec<[u8; SECTION_SIZE]>>,
    filled: Mutex<Vec<bool>>,
    remaining: AtomicUsize,
    notify: Notify,
}

impl AsyncHasher {
    pub fn new() -> Self {
        Self {
            sections: Mutex::new(vec![[0u8; SECTION_SIZE]; BRANCHES]),
            filled: Mutex::new(vec![false; BRANCHES]),
            remaining: AtomicUsize::new(BRANCHES),
            notify: Notify::new(),
        }
    }

    /// Write one section. Writing the same index twice overwrites the
    /// previous value without double-counting `remaining`.
    pub fn write_section(&self, index: usize, data: &[u8; SECTION_SIZE]) -> Result<()> {
        if index >= BRANCHES {
            return Err(BmtError::SectionIndexOutOfRange {
                index,
                max: BRANCHES - 1,
            });
        }
        self.sections.lock().unwrap()[index] = *data;
        let mut filled = self.filled.lock().unwrap();
        if !filled[index] {
            filled[index] = true;
            if self.remaining.fetch_sub(1, Ordering::AcqRel) == 1 {
                self.notify.notify_waiters();
            }
        }
        Ok(())
    }

    /// Wait for every section to have arrived, then fold them into the BMT
    /// root and finalize with `span`.
    pub async fn sum(&self, span: u64) -> Address {
        while self.remaining.load(Ordering::Acquire) != 0 {
            self.notify.notified().await;
        }
        let buf: Vec<u8> = self
            .sections
            .lock()
            .unwrap()
            .iter()
            .flat_map(|s| s.iter().copied())
            .collect();
        // `buf` is always exactly BRANCHES * SECTION_SIZE == CHUNK_SIZE bytes
        // here, so this can never hit the oversized-payload error path.
        crate::hasher::hash(span, &buf).expect("section buffer is exactly CHUNK_SIZE")
    }
}

impl Default for AsyncHasher {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn out_of_order_sections_still_complete() {
        let hasher = AsyncHasher::new();
        let mut expected_payload = vec![0u8; BRANCHES * SECTION_SIZE];
        for i in 0..BRANCHES {
            let mut section = [0u8; SECTION_SIZE];
            section[0] = i as u8;
            expected_payload[i * SECTION_SIZE] = i as u8;
            hasher.write_section(BRANCHES - 1 - i, &section).unwrap();
        }
        let got = hasher.sum(expected_payload.len() as u64).await;
        let want = crate::hasher::hash(expected_payload.len() as u64, &expected_payload).unwrap();
        assert_eq!(got, want);
    }

    #[test]
    fn out_of_range_section_is_rejected() {
        let hasher = AsyncHasher::new();
        assert!(hasher.write_section(BRANCHES, &[0u8; SECTION_SIZE]).is_err());
    }
}
