use std::sync::Arc;

use swarm_primitives::{chunk::build_data, Address, Chunk, BRANCHES, CHUNK_SIZE, SECTION_SIZE};
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio_util::sync::CancellationToken;

use crate::error::{ChunkerError, Result};
use crate::sink::ChunkSink;
use crate::tag::Tag;

/// In-progress children of a not-yet-finalized chunk one level above the
/// children: `addresses` is the concatenation of child addresses
/// (`spec.md` §4.2's "level-1 accumulator"), `span` the sum of their
/// subtree byte counts.
#[derive(Default)]
struct ParentAcc {
    addresses: Vec<u8>,
    span: u64,
    count: usize,
}

impl ParentAcc {
    fn push(&mut self, address: Address, child_span: u64) {
        self.addresses.extend_from_slice(address.as_bytes());
        self.span += child_span;
        self.count += 1;
    }

    fn is_full(&self) -> bool {
        self.count == BRANCHES
    }

    fn sole_address(&self) -> Address {
        debug_assert_eq!(self.count, 1);
        let mut raw = [0u8; SECTION_SIZE];
        raw.copy_from_slice(&self.addresses[..SECTION_SIZE]);
        Address::new(raw)
    }

    fn take(&mut self) -> (Vec<u8>, u64) {
        self.count = 0;
        (std::mem::take(&mut self.addresses), std::mem::take(&mut self.span))
    }
}

/// Splits `reader` (exactly `length` bytes) into a tree of chunks, sinking
/// every chunk as it completes and returning the root [`Address`] —
/// `spec.md` §4.2's Split contract.
///
/// `tag`, if given, receives progress counters as chunks are produced.
/// `cancel` is checked between each 4096-byte window; on cancellation the
/// chunks already sunk are left in place (the sink is required to be
/// idempotent on re-`put`, per §5 "Cancellation").
pub async fn split<R, S>(
    mut reader: R,
    length: u64,
    sink: &S,
    tag: Option<Arc<Tag>>,
    cancel: CancellationToken,
) -> Result<Address>
where
    R: AsyncRead + Unpin,
    S: ChunkSink,
{
    tracing::debug!(length, "split start");
    if let Some(t) = &tag {
        t.set_total(length);
    }

    if length == 0 {
        // Edge case (`spec.md` §4.2): empty input hashes to the zero-length
        // chunk's address. There is no data to sink.
        let root = swarm_bmt::hash(0, &[])?;
        tracing::debug!(%root, "split complete (empty input)");
        return Ok(root);
    }

    let mut parents: Vec<ParentAcc> = vec![ParentAcc::default()];
    let mut remaining = length;

    while remaining > 0 {
        if cancel.is_cancelled() {
            return Err(ChunkerError::Cancelled);
        }
        let take = remaining.min(CHUNK_SIZE as u64) as usize;
        let mut buf = vec![0u8; take];
        reader.read_exact(&mut buf).await?;
        remaining -= take as u64;

        let span = take as u64;
        let address = swarm_bmt::hash(span, &buf)?;
        sink_chunk(sink, &tag, address, span, &buf).await?;

        let mut level = 0;
        parents[level].push(address, span);
        while parents[level].is_full() {
            let (payload, child_span) = parents[level].take();
            let (parent_address, _) =
                wrap_level(sink, &tag, child_span, &payload).await?;
            if level + 1 == parents.len() {
                parents.push(ParentAcc::default());
            }
            parents[level + 1].push(parent_address, child_span);
            level += 1;
        }
    }

    let root = flush(sink, &tag, &mut parents, &cancel).await?;
    tracing::debug!(%root, length, "split complete");
    Ok(root)
}

/// Hash and sink one already-read chunk (leaf or, via [`wrap_level`],
/// intermediate).
async fn sink_chunk<S: ChunkSink>(
    sink: &S,
    tag: &Option<Arc<Tag>>,
    address: Address,
    span: u64,
    payload: &[u8],
) -> Result<()> {
    let data = build_data(span, payload)?;
    sink.put(Chunk::new_unchecked(address, data))
        .await
        .map_err(|e| ChunkerError::Sink(e.to_string()))?;
    if let Some(t) = tag {
        t.inc_stored();
    }
    Ok(())
}

/// Hash a full or partial accumulator into a parent chunk and sink it.
async fn wrap_level<S: ChunkSink>(
    sink: &S,
    tag: &Option<Arc<Tag>>,
    span: u64,
    payload: &[u8],
) -> Result<(Address, u64)> {
    let address = swarm_bmt::hash(span, payload)?;
    sink_chunk(sink, tag, address, span, payload).await?;
    Ok((address, span))
}

/// Flush every partial accumulator upward at EOF. The root is whichever
/// chunk ends up alone at the top — if the entire stream fit in a single
/// leaf, or a single already-finalized child is left with no siblings,
/// that chunk's own address is the root with no further wrapping
/// (`spec.md` §8 scenario 2: "no intermediate chunk emitted").
async fn flush<S: ChunkSink>(
    sink: &S,
    tag: &Option<Arc<Tag>>,
    parents: &mut Vec<ParentAcc>,
    cancel: &CancellationToken,
) -> Result<Address> {
    let mut level = 0;
    loop {
        if cancel.is_cancelled() {
            return Err(ChunkerError::Cancelled);
        }
        if parents[level].count == 0 {
            level += 1;
            continue;
        }
        let is_last = parents[(level + 1)..].iter().all(|p| p.count == 0);
        if is_last && parents[level].count == 1 {
            return Ok(parents[level].sole_address());
        }
        let (payload, span) = parents[level].take();
        let (address, _) = wrap_level(sink, tag, span, &payload).await?;
        if level + 1 == parents.len() {
            parents.push(ParentAcc::default());
        }
        parents[level + 1].push(address, span);
        level += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::MapSink;

    #[tokio::test]
    async fn one_level_exactly_one_chunk_has_no_wrapper() {
        // spec.md §8 scenario 2.
        let payload: Vec<u8> = (0..CHUNK_SIZE).map(|i| (i % 256) as u8).collect();
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

        let expected = swarm_bmt::hash(payload.len() as u64, &payload).unwrap();
        assert_eq!(root, expected);
        assert_eq!(sink.len(), 1, "exactly one chunk, no intermediate wrapper");
    }

    #[tokio::test]
    async fn two_level_tree_emits_branches_plus_one_chunks() {
        // spec.md §8 scenario 3: 4096 * 128 bytes -> 128 leaves + 1 root.
        let total = CHUNK_SIZE * BRANCHES;
        let payload = vec![0x5au8; total];
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

        assert_eq!(sink.len(), BRANCHES + 1);
        let root_chunk = sink.get_sync(root).unwrap();
        assert_eq!(root_chunk.payload().len(), BRANCHES * SECTION_SIZE);
        assert_eq!(root_chunk.span(), total as u64);
    }

    #[tokio::test]
    async fn empty_input_has_no_sunk_chunks() {
        let sink = MapSink::default();
        let root = split(
            std::io::Cursor::new(Vec::new()),
            0,
            &sink,
            None,
            CancellationToken::new(),
        )
        .await
        .unwrap();
        assert_eq!(root, swarm_bmt::hash(0, &[]).unwrap());
        assert_eq!(sink.len(), 0);
    }

    #[tokio::test]
    async fn cancellation_before_any_progress_is_reported() {
        let sink = MapSink::default();
        let cancel = CancellationToken::new();
        cancel.cancel();
        let err = split(std::io::Cursor::new(vec![0u8; 100]), 100, &sink, None, cancel)
            .await
            .unwrap_err();
        assert!(matches!(err, ChunkerError::Cancelled));
    }
}
