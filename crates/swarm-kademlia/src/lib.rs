//! A Kademlia-style proximity tree over 32-byte node addresses
//! (`spec.md` §4.4): insertion, removal, union, nearest-neighbour
//! iteration, and connectivity health queries.

pub mod error;
pub mod health;
pub mod peer;
pub mod pot;

pub use error::{KademliaError, Result};
pub use health::{healthy, neighbourhood_depth};
pub use peer::PeerEntry;
pub use pot::Pot;
