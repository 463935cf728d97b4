use bytes::Bytes;
use futures::Stream;
use swarm_primitives::{Address, BRANCHES, CHUNK_SIZE, SECTION_SIZE};
use tokio_util::sync::CancellationToken;

use crate::error::ChunkerError;
use crate::source::ChunkSource;

/// Smallest tree level whose capacity (`CHUNK_SIZE * BRANCHES^level`) can
/// hold `span` bytes. Level 0 is a leaf; level `k` intermediate chunks
/// hold up to `BRANCHES` level-`(k-1)` children.
fn level_for_span(span: u64) -> u32 {
    let mut level = 0u32;
    let mut capacity: u128 = CHUNK_SIZE as u128;
    while capacity < span as u128 {
        capacity *= BRANCHES as u128;
        level += 1;
    }
    level
}

/// Byte capacity of one child of a level-`level` intermediate chunk.
fn child_capacity(level: u32) -> u64 {
    let mut capacity: u128 = CHUNK_SIZE as u128;
    for _ in 1..level {
        capacity *= BRANCHES as u128;
    }
    capacity as u64
}

/// Reassembles the byte stream addressed by `root`, optionally restricted
/// to `[offset, offset + length)` — `spec.md` §4.2's Join contract. Walks
/// the tree top-down, skipping any subtree that falls entirely outside
/// the requested range without fetching it.
pub fn join<'a, S>(
    source: &'a S,
    root: Address,
    range: Option<(u64, u64)>,
    cancel: CancellationToken,
) -> impl Stream<Item = Result<Bytes, ChunkerError>> + 'a
where
    S: ChunkSource + 'a,
{
    async_stream::try_stream! {
        let root_chunk = source.get(root).await?;
        let total_span = root_chunk.span();
        let (want_start, want_end) = match range {
            Some((offset, length)) => (offset.min(total_span), offset.saturating_add(length).min(total_span)),
            None => (0, total_span),
        };
        tracing::debug!(%root, total_span, want_start, want_end, "join start");

        let root_level = level_for_span(total_span);
        let mut stack = vec![(root_chunk, root_level, 0u64)];

        while let Some((chunk, level, node_start)) = stack.pop() {
            if cancel.is_cancelled() {
                Err(ChunkerError::Cancelled)?;
            }
            let node_span = chunk.span();
            let node_end = node_start + node_span;
            if node_end <= want_start || node_start >= want_end {
                continue;
            }

            if level == 0 {
                let payload = chunk.payload();
                let lo = want_start.saturating_sub(node_start) as usize;
                let hi = (want_end.saturating_sub(node_start)).min(node_span) as usize;
                if lo < hi {
                    yield Bytes::copy_from_slice(&payload[lo..hi]);
                }
                continue;
            }

            let child_cap = child_capacity(level);
            let addresses = chunk.payload();
            let mut to_visit = Vec::new();
            for (i, raw) in addresses.chunks_exact(SECTION_SIZE).enumerate() {
                let child_start = node_start + (i as u64) * child_cap;
                let child_span = child_cap.min(node_span.saturating_sub((i as u64) * child_cap));
                let child_end = child_start + child_span;
                if child_end <= want_start || child_start >= want_end {
                    continue;
                }
                let mut raw_addr = [0u8; SECTION_SIZE];
                raw_addr.copy_from_slice(raw);
                let child_address = Address::new(raw_addr);
                let child_chunk = source.get(child_address).await?;
                to_visit.push((child_chunk, level - 1, child_start));
            }
            for child in to_visit.into_iter().rev() {
                stack.push(child);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::split::split;
    use crate::test_support::MapSink;
    use futures::StreamExt;

    async fn collect(sink: &MapSink, root: Address, range: Option<(u64, u64)>) -> Vec<u8> {
        let stream = join(sink, root, range, CancellationToken::new());
        tokio::pin!(stream);
        let mut out = Vec::new();
        while let Some(chunk) = stream.next().await {
            out.extend_from_slice(&chunk.unwrap());
        }
        out
    }

    #[tokio::test]
    async fn round_trip_single_chunk() {
        let payload = vec![0xabu8; 100];
        let sink = MapSink::default();
        let root = split(
            std::io::Cursor::new(payload.clone()),
            payload.len() as u64,
            &sink,
            None,
            CancellationToken::new(),
        )
        .await
        .unwrap();
        let got = collect(&sink, root, None).await;
        assert_eq!(got, payload);
    }

    #[tokio::test]
    async fn round_trip_two_level_tree() {
        let total = CHUNK_SIZE * BRANCHES + 777;
        let payload: Vec<u8> = (0..total).map(|i| (i % 251) as u8).collect();
        let sink = MapSink::default();
        let root = split(
            std::io::Cursor::new(payload.clone()),
            payload.len() as u64,
            &sink,
            None,
            CancellationToken::new(),
        )
        .await
        .unwrap();
        let got = collect(&sink, root, None).await;
        assert_eq!(got, payload);
    }

    #[tokio::test]
    async fn ranged_join_returns_the_requested_slice() {
        let total = CHUNK_SIZE * 3 + 10;
        let payload: Vec<u8> = (0..total).map(|i| (i % 256) as u8).collect();
        let sink = MapSink::default();
        let root = split(
            std::io::Cursor::new(payload.clone()),
            payload.len() as u64,
            &sink,
            None,
            CancellationToken::new(),
        )
        .await
        .unwrap();

        let offset = CHUNK_SIZE as u64 - 5;
        let length = 20u64;
        let got = collect(&sink, root, Some((offset, length))).await;
        assert_eq!(got, payload[offset as usize..(offset + length) as usize]);
    }
}
