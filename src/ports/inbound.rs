//! Driving port (inbound API): what the process entry point and the
//! transport adapter call into on the engine.
//!
//! Reference: spec.md Section 4.8 (C8), Section 5

use crate::domain::entities::Id;
use crate::domain::entities::Node;

/// Primary API surface consumers (the UDP adapter, the heartbeat scheduler,
/// the process entry point) drive the engine through.
#[async_trait::async_trait]
pub trait DhtApi {
    /// This node's own 160-bit id.
    fn local_id(&self) -> Id;

    /// Decode and dispatch one inbound datagram from `addr:port`, sending
    /// any reply through the transport. Malformed datagrams are dropped
    /// silently (spec.md Section 7).
    async fn handle_datagram(&self, data: &[u8], addr: std::net::Ipv4Addr, port: u16);

    /// Heartbeat tick: reap expired outstanding queries and refresh stale
    /// buckets (spec.md Section 4.4 `refresh`, Section 4.8 "Timeouts").
    async fn on_heartbeat(&self);

    /// Send a `find_node` query to `node` for the given target, used for
    /// bootstrap and bucket refresh.
    async fn find_node(&self, node: Node, target: Id);

    /// Current size of the routing table, for diagnostics/tests.
    async fn routing_table_len(&self) -> usize;
}
