//! Outbound query issuance: transaction allocation, pending-entry
//! recording, encode, transmit.
//!
//! Reference: spec.md Section 4.8, "Outbound queries"

use tracing::warn;

use crate::domain::entities::{Id, Node};
use crate::krpc::codec::encode_query;
use crate::krpc::message::Query;
use crate::service::core::{Engine, OutstandingQuery};

impl Engine {
    /// Allocate a transaction id, record the pending entry, encode and
    /// transmit `query` to `node`.
    pub async fn send_query(&self, node: Node, query: Query) {
        let transaction_id = self.next_transaction_id();
        let now = self.now();
        {
            self.outstanding.lock().unwrap().insert(
                transaction_id.clone(),
                OutstandingQuery {
                    query: query.clone(),
                    node,
                    sent_at: now,
                },
            );
        }

        let wire = encode_query(&transaction_id, &query);
        if let Err(err) = self.transport.send_to(&wire, node.addr, node.port).await {
            warn!(?err, addr = %node.addr, port = node.port, "failed to send query");
            self.outstanding.lock().unwrap().remove(&transaction_id);
        }
    }

    /// Send a `find_node` query for `target` to `node`, used for bootstrap
    /// and bucket refresh.
    pub async fn find_node_query(&self, node: Node, target: Id) {
        self.send_query(
            node,
            Query::FindNode {
                sender_id: self.local_id_inner(),
                target,
            },
        )
        .await;
    }
}
