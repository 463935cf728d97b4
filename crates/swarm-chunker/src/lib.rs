//! The tree-chunker: splits byte streams into a Merkle tree of
//! `swarm-bmt`-addressed chunks and joins them back into a stream.

pub mod error;
pub mod join;
pub mod sink;
pub mod source;
pub mod split;
pub mod tag;

#[cfg(test)]
mod test_support;

pub use error::{ChunkerError, Result};
pub use join::join;
pub use sink::ChunkSink;
pub use source::ChunkSource;
pub use split::split;
pub use tag::{Tag, TagSnapshot};
