use tiny_keccak::{Hasher as _, Keccak};

use swarm_primitives::{Address, CHUNK_SIZE};

use crate::constants::SEGMENT_PAIR_LENGTH;
use crate::error::{BmtError, Result};

/// Compute `keccak256(data)`.
fn keccak256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Keccak::v256();
    hasher.update(data);
    let mut out = [0u8; 32];
    hasher.finalize(&mut out);
    out
}

/// Fold `left || right` through Keccak-256 one level up the tree.
fn hash_pair(left: &[u8; 32], right: &[u8; 32]) -> [u8; 32] {
    let mut buf = [0u8; 64];
    buf[..32].copy_from_slice(left);
    buf[32..].copy_from_slice(right);
    keccak256(&buf)
}

/// Recursively hash `data` (a power-of-two-sized, zero-padded byte slice)
/// down to 64-byte leaf pairs, fanning sibling subtrees out across the
/// Rayon thread pool. Mirrors the reference BMT hasher's parallel/sequential
/// split, minus the WASM fallback (this crate does not target wasm32).
fn hash_level(data: &[u8]) -> [u8; 32] {
    if data.len() == SEGMENT_PAIR_LENGTH {
        return keccak256(data);
    }
    let half = data.len() / 2;
    let (left, right) = data.split_at(half);
    let (left_hash, right_hash) = rayon::join(|| hash_level(left), || hash_level(right));
    hash_pair(&left_hash, &right_hash)
}

/// Zero-pad `payload` up to `CHUNK_SIZE` bytes into a fresh buffer.
fn padded_buffer(payload: &[u8]) -> [u8; CHUNK_SIZE] {
    let mut buf = [0u8; CHUNK_SIZE];
    buf[..payload.len()].copy_from_slice(payload);
    buf
}

/// Compute the BMT address of a chunk: zero-pad `payload` to `CHUNK_SIZE`,
/// fold it through the binary tree down to the root, then fold the span in
/// front of the root (`spec.md` §4.1: `base-hash(span ‖ tree_root)`).
///
/// `span` is independent of `payload.len()` for intermediate chunks, whose
/// span covers an entire subtree rather than just the local payload, so it
/// is taken as an explicit argument rather than derived.
pub fn hash(span: u64, payload: &[u8]) -> Result<Address> {
    if payload.len() > CHUNK_SIZE {
        return Err(BmtError::PayloadTooLarge {
            len: payload.len(),
            max: CHUNK_SIZE,
        });
    }
    let buf = padded_buffer(payload);
    let root = hash_level(&buf);

    let mut final_hasher = Keccak::v256();
    final_hasher.update(&span.to_le_bytes());
    final_hasher.update(&root);
    let mut out = [0u8; 32];
    final_hasher.finalize(&mut out);

    tracing::trace!(span, payload_len = payload.len(), "bmt hash computed");
    Ok(Address::new(out))
}

/// Check that `BMT(span, payload) == address`, the validation every
/// incoming chunk must pass (`spec.md` §4.3, §6).
pub fn validate(address: Address, span: u64, payload: &[u8]) -> bool {
    match hash(span, payload) {
        Ok(computed) => computed == address,
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // spec.md §8 scenario 1: BMT of 3200 bytes of 0xff is deterministic.
    #[test]
    fn hash_is_deterministic() {
        let payload = vec![0xffu8; 3200];
        let a = hash(3200, &payload).unwrap();
        let b = hash(3200, &payload).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn different_spans_give_different_hashes() {
        let payload = vec![0xffu8; 3200];
        let a = hash(3200, &payload).unwrap();
        let b = hash(3201, &payload).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn oversized_payload_is_rejected() {
        let payload = vec![0u8; CHUNK_SIZE + 1];
        assert!(hash(CHUNK_SIZE as u64 + 1, &payload).is_err());
    }

    #[test]
    fn empty_payload_hashes_the_zero_chunk() {
        // spec.md §4.2 edge case: empty input produces the hash of the
        // zero-length chunk rather than erroring.
        let h = hash(0, &[]).unwrap();
        let h2 = hash(0, &[]).unwrap();
        assert_eq!(h, h2);
    }

    #[test]
    fn validate_accepts_correct_pair_and_rejects_tamper() {
        let payload = vec![0x11u8; 100];
        let addr = hash(100, &payload).unwrap();
        assert!(validate(addr, 100, &payload));
        assert!(!validate(addr, 101, &payload));
        let mut tampered = payload.clone();
        tampered[0] ^= 0xff;
        assert!(!validate(addr, 100, &tampered));
    }

    #[test]
    fn full_chunk_and_max_minus_one_differ() {
        let full = vec![0xabu8; CHUNK_SIZE];
        let almost = vec![0xabu8; CHUNK_SIZE - 1];
        let a = hash(CHUNK_SIZE as u64, &full).unwrap();
        let b = hash((CHUNK_SIZE - 1) as u64, &almost).unwrap();
        assert_ne!(a, b);
    }
}
