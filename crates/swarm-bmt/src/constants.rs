pub use swarm_primitives::{BRANCHES, CHUNK_SIZE, SECTION_SIZE};

/// Two adjacent 32-byte segments, the smallest unit Keccak-256 is applied to
/// directly (the leaves of the recursion bottom out here rather than at a
/// single segment).
pub const SEGMENT_PAIR_LENGTH: usize = SECTION_SIZE * 2;

/// `log2(BRANCHES)`: number of Keccak-256 applications from the leaf pairs
/// up to the tree root.
pub const DEPTH: usize = BRANCHES.ilog2() as usize;
