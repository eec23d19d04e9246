//! The KRPC engine: owns the routing table, peer store, outstanding-query
//! map, and token secret, and drives dispatch/outbound/maintenance.
//!
//! Reference: spec.md Section 4.8 (C8), Section 9 ("Global mutable state")

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;

use crate::domain::entities::{Id, Node, Timestamp};
use crate::domain::routing_table::RoutingTable;
use crate::domain::token::TokenSecret;
use crate::krpc::message::{Query, TransactionId};
use crate::ports::outbound::{PeerStore, TimeSource, Transport};

/// An outbound query awaiting a matching response, per the
/// `transaction_id -> (original_query, target_node, sent_at)` map.
pub(crate) struct OutstandingQuery {
    pub query: Query,
    pub node: Node,
    pub sent_at: Timestamp,
}

/// Reap threshold for outstanding queries (spec.md 4.8, "Timeouts").
pub(crate) const OUTSTANDING_TIMEOUT_SECS: u64 = 15;

/// Owns every piece of mutable DHT state behind a single logical critical
/// section (spec.md Section 5), driven by a single-threaded event loop.
/// State is kept behind plain `std::sync::Mutex`, never held across an
/// `.await` point, so the engine itself places no bound on the async
/// runtime driving it.
pub struct Engine {
    local_id: Id,
    pub(crate) token_secret: TokenSecret,
    pub(crate) routing_table: Mutex<RoutingTable>,
    pub(crate) outstanding: Mutex<HashMap<TransactionId, OutstandingQuery>>,
    pub(crate) peer_store: Box<dyn PeerStore>,
    pub(crate) transport: Box<dyn Transport>,
    time: Box<dyn TimeSource>,
    tx_counter: AtomicU32,
}

impl Engine {
    pub fn new(
        local_id: Id,
        token_secret: TokenSecret,
        routing_table: RoutingTable,
        peer_store: Box<dyn PeerStore>,
        transport: Box<dyn Transport>,
        time: Box<dyn TimeSource>,
    ) -> Self {
        Self {
            local_id,
            token_secret,
            routing_table: Mutex::new(routing_table),
            outstanding: Mutex::new(HashMap::new()),
            peer_store,
            transport,
            time,
            tx_counter: AtomicU32::new(0),
        }
    }

    pub(crate) fn local_id_inner(&self) -> Id {
        self.local_id
    }

    pub(crate) fn now(&self) -> Timestamp {
        self.time.now()
    }

    /// Fresh transaction id: a counter plus a random salt, so a restarted
    /// process never collides with an id an in-flight query from a
    /// previous run used (spec.md 4.8, "Outbound queries").
    pub(crate) fn next_transaction_id(&self) -> TransactionId {
        let counter = self.tx_counter.fetch_add(1, Ordering::Relaxed);
        let salt: u16 = rand::random();
        let mut out = counter.to_be_bytes().to_vec();
        out.extend_from_slice(&salt.to_be_bytes());
        out
    }

    /// Teach the routing table about a peer we just heard from (spec.md
    /// 4.8, "Incidental side effect"). Failure to insert is non-fatal.
    pub(crate) fn learn(&self, node: Node) {
        let now = self.now();
        self.routing_table.lock().unwrap().add_node(node, now);
    }
}
