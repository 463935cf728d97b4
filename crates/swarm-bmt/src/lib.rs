//! Binary Merkle Tree content hashing for 4096-byte chunks: the address
//! function every other crate in this workspace builds addresses on top of.

pub mod async_hasher;
pub mod constants;
pub mod error;
pub mod hasher;
pub mod pool;

pub use async_hasher::AsyncHasher;
pub use error::{BmtError, Result};
pub use hasher::{hash, validate};
pub use pool::{Pool, PooledBuffer};
