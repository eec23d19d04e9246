//! Pure Kademlia helper functions shared by the routing table and engine.

mod distance;
mod sorting;

pub use distance::xor_distance;
pub use sorting::{find_k_closest, sort_nodes_by_distance};
