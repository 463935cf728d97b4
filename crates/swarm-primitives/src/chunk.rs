use bytes::Bytes;

use crate::address::Address;
use crate::{PrimitivesError, CHUNK_SIZE};

/// Length in bytes of the little-endian span prefix.
pub const SPAN_LEN: usize = 8;

/// A content-addressed chunk: `address` is the BMT hash of `span ‖ payload`.
///
/// `data` holds the wire representation (`span ‖ payload`), not just the
/// payload, so that re-deriving the address never needs to re-assemble the
/// span. Leaf ("content") chunks carry user bytes in `payload`; intermediate
/// chunks carry a concatenation of child addresses. Both are represented
/// identically here — the distinction lives in how `swarm-chunker`
/// interprets the payload, not in the type.
#[derive(Clone, PartialEq, Eq)]
pub struct Chunk {
    address: Address,
    data: Bytes,
}

impl Chunk {
    /// Build a chunk from an address already known to be correct for
    /// `data` (e.g. one just computed by `swarm-bmt`). Does not
    /// re-validate; use `swarm_bmt::hash` first if `address` is untrusted.
    pub fn new_unchecked(address: Address, data: Bytes) -> Self {
        Self { address, data }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    /// The full wire representation: `span ‖ payload`.
    pub fn data(&self) -> &Bytes {
        &self.data
    }

    pub fn span(&self) -> u64 {
        decode_span(&self.data[..SPAN_LEN])
    }

    pub fn payload(&self) -> &[u8] {
        &self.data[SPAN_LEN..]
    }

    /// `true` if the payload fits within a single chunk and the span
    /// matches the local payload length — i.e. this chunk is a leaf rather
    /// than an intermediate chunk whose span covers a larger subtree.
    pub fn is_leaf(&self) -> bool {
        self.span() == self.payload().len() as u64
    }
}

impl std::fmt::Debug for Chunk {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Chunk")
            .field("address", &self.address)
            .field("span", &self.span())
            .field("payload_len", &self.payload().len())
            .finish()
    }
}

/// Encode `span` as the 8-byte little-endian prefix used on the wire.
pub fn encode_span(span: u64) -> [u8; SPAN_LEN] {
    span.to_le_bytes()
}

/// Decode an 8-byte little-endian span prefix. Panics if `bytes` is not
/// exactly `SPAN_LEN` long; callers validate chunk length first.
pub fn decode_span(bytes: &[u8]) -> u64 {
    let mut buf = [0u8; SPAN_LEN];
    buf.copy_from_slice(&bytes[..SPAN_LEN]);
    u64::from_le_bytes(buf)
}

/// Assemble `span ‖ payload` and check the payload length invariant
/// (`0 < |payload| <= CHUNK_SIZE`) from `spec.md` §4.3. Does not check the
/// address; that requires the BMT hasher (see `swarm_bmt::validate`).
pub fn build_data(span: u64, payload: &[u8]) -> crate::Result<Bytes> {
    if payload.is_empty() || payload.len() > CHUNK_SIZE {
        return Err(PrimitivesError::PayloadLength(payload.len()));
    }
    let mut buf = Vec::with_capacity(SPAN_LEN + payload.len());
    buf.extend_from_slice(&encode_span(span));
    buf.extend_from_slice(payload);
    Ok(Bytes::from(buf))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn span_round_trips() {
        assert_eq!(decode_span(&encode_span(3200)), 3200);
        assert_eq!(decode_span(&encode_span(0)), 0);
        assert_eq!(decode_span(&encode_span(u64::MAX)), u64::MAX);
    }

    #[test]
    fn build_data_rejects_oversized_payload() {
        let payload = vec![0u8; CHUNK_SIZE + 1];
        assert!(build_data(CHUNK_SIZE as u64 + 1, &payload).is_err());
    }

    #[test]
    fn build_data_rejects_empty_payload() {
        assert!(build_data(0, &[]).is_err());
    }

    #[test]
    fn chunk_exposes_span_and_payload() {
        let payload = vec![0xffu8; 3200];
        let data = build_data(3200, &payload).unwrap();
        let chunk = Chunk::new_unchecked(Address::zero(), data);
        assert_eq!(chunk.span(), 3200);
        assert_eq!(chunk.payload(), payload.as_slice());
        assert!(chunk.is_leaf());
    }
}
