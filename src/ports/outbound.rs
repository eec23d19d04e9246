//! Driven ports (outbound SPI): interfaces this subsystem requires the host
//! process to provide.
//!
//! Reference: spec.md Section 9 ("Event-loop integration"), Section 5

use std::net::Ipv4Addr;

use async_trait::async_trait;

use crate::domain::entities::{Peer, Timestamp};
use crate::domain::errors::PeerStoreError;

/// Abstract UDP endpoint. Production code binds a real socket; tests use an
/// in-memory double so the engine can be exercised without I/O.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send a single datagram to `addr:port`.
    async fn send_to(&self, data: &[u8], addr: Ipv4Addr, port: u16) -> std::io::Result<()>;

    /// Await the next inbound datagram, returning its payload and sender.
    async fn recv_from(&self) -> std::io::Result<(Vec<u8>, Ipv4Addr, u16)>;
}

/// Abstract time source, so tests can inject fixed timestamps instead of the
/// system clock (spec.md Section 9, "the engine... borrowed immutably").
pub trait TimeSource: Send + Sync {
    fn now(&self) -> Timestamp;
}

/// Bootstrap node / network tuning configuration.
///
/// Reference: spec.md Section 6 (Configuration)
pub trait ConfigProvider: Send + Sync {
    fn node_port(&self) -> u16;
    fn node_ip(&self) -> Option<Ipv4Addr>;
    fn node_id_name(&self) -> String;
    fn heartbeat_secs(&self) -> u64;
    fn bootstrap_nodes(&self) -> Vec<(String, u16)>;
    fn peer_storage_dir(&self) -> std::path::PathBuf;
    fn k(&self) -> usize;
    fn max_nodes_per_bucket(&self) -> usize;
    fn max_peers_per_torrent(&self) -> usize;
}

/// Minimal capability surface for the peer store backend (spec.md Section 9,
/// "Storage backend polymorphism"). `File` is the only variant specified;
/// `MySQL` is a deferred stub (spec.md Section 9).
#[async_trait]
pub trait PeerStore: Send + Sync {
    async fn torrent_exists(&self, info_hash: &[u8; 20]) -> bool;

    async fn get_peers(&self, info_hash: &[u8; 20]) -> Result<Vec<Peer>, PeerStoreError>;

    async fn add_peer(
        &self,
        info_hash: &[u8; 20],
        peer: Peer,
    ) -> Result<crate::domain::errors::PeerInsert, PeerStoreError>;
}
