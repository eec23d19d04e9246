//! # Mainline DHT
//!
//! A Kademlia-style (BEP-5) Mainline BitTorrent DHT node.
//!
//! ## Architecture
//!
//! The crate follows a hexagonal (ports-and-adapters) layout:
//!
//! - **Domain** (`domain`): the routing table, peer store error/result
//!   types, the token issuer, and pure Kademlia helpers. No I/O.
//! - **KRPC** (`krpc`): the bencode wire codec and typed message shapes.
//! - **Ports** (`ports`): traits the engine is driven through (`DhtApi`)
//!   and traits it requires of its host (`Transport`, `PeerStore`,
//!   `TimeSource`, `ConfigProvider`).
//! - **Service** (`service`): the KRPC engine (`Engine`) binding the
//!   domain and KRPC layers together, dispatching inbound messages and
//!   issuing outbound queries.
//! - **Adapters** (`adapters`): concrete UDP transport, environment-based
//!   configuration, and the file-backed peer store; plus test doubles
//!   (`LoopbackTransport`) behind the `network` feature.
//!
//! ## Example
//!
//! ```rust,no_run
//! use mainline_dht::domain::entities::{Id, Timestamp};
//! use mainline_dht::domain::routing_table::{RoutingTable, RoutingTableConfig};
//!
//! let local_id = Id::zero();
//! let mut table = RoutingTable::new(local_id, RoutingTableConfig::default(), Timestamp::new(0));
//! let closest = table.find_closest_default(&local_id);
//! assert!(closest.is_empty());
//! ```

pub mod adapters;
pub mod domain;
pub mod krpc;
pub mod ports;
pub mod service;

pub use domain::entities::{Distance, Id, Node, Peer, Timestamp};
pub use domain::routing_table::{RoutingTableConfig, RoutingTable};
pub use domain::token::{Token, TokenSecret};
pub use ports::{ConfigProvider, DhtApi, PeerStore, TimeSource, Transport};
pub use service::Engine;

/// Derive this node's 160-bit id from a configured name via SHA-1
/// (spec.md Section 3, "ID"; Section 6, `NODE_ID_NAME`).
pub fn derive_node_id(name: &str) -> Id {
    use sha1::{Digest, Sha1};
    let digest = Sha1::digest(name.as_bytes());
    let mut bytes = [0u8; 20];
    bytes.copy_from_slice(&digest);
    Id::from_array(bytes)
}
