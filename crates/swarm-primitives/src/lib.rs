//! swarm-primitives: addresses, chunks, and wire-format constants shared by
//! every other crate in this workspace.
//!
//! Nothing in this crate performs hashing or I/O; it only defines the types
//! the rest of the node agrees on, so that `swarm-bmt`, `swarm-chunker`,
//! `swarm-localstore`, and `swarm-kademlia` can all depend on it without
//! depending on each other.

mod address;
pub mod chunk;
mod error;

pub use address::{proximity_order, Address, Reference, ADDRESS_LEN};
pub use chunk::{decode_span, encode_span, Chunk, SPAN_LEN};
pub use error::PrimitivesError;

/// Maximum payload carried by a single chunk.
pub const CHUNK_SIZE: usize = 4096;

/// Fixed arity of the BMT / chunker tree.
pub const BRANCHES: usize = 128;

/// Size of one BMT leaf segment (and of an `Address`).
pub const SECTION_SIZE: usize = 32;

/// Maximum total size of a chunk's wire representation (`span || payload`).
pub const MAX_DATA_LENGTH: usize = SPAN_LEN + CHUNK_SIZE;

pub type Result<T> = std::result::Result<T, PrimitivesError>;
