//! Inbound dispatch: decode, teach the routing table, act, and reply.
//!
//! Reference: spec.md Section 4.8 (C8), "Inbound dispatch"

use std::net::Ipv4Addr;

use tracing::{trace, warn};

use crate::domain::entities::{Node, Peer};
use crate::domain::errors::PeerStoreError;
use crate::domain::token::{issue as issue_token, validate as validate_token};
use crate::krpc::codec::{decode, decode_response_body, encode_error, encode_response};
use crate::krpc::message::{GetPeersResult, KrpcError, Message, Query, RawDict, Response, TransactionId};
use crate::service::core::Engine;

impl Engine {
    pub(crate) async fn dispatch_datagram(&self, data: &[u8], addr: Ipv4Addr, port: u16) {
        let message = match decode(data) {
            Ok(message) => message,
            Err(err) => {
                trace!(?err, %addr, port, "dropping malformed datagram");
                return;
            }
        };

        match message {
            Message::Query { transaction_id, query } => {
                self.learn(Node::new(query.sender_id(), addr, port));
                let wire = match self.handle_query(&query, addr, port).await {
                    Ok(response) => encode_response(&transaction_id, &response),
                    Err(error) => encode_error(&transaction_id, &error),
                };
                if let Err(err) = self.transport.send_to(&wire, addr, port).await {
                    warn!(?err, %addr, port, "failed to send reply");
                }
            }
            Message::PendingResponse { transaction_id, raw } => {
                self.handle_response(&transaction_id, &raw, addr, port);
            }
            Message::Error { transaction_id, error } => {
                self.handle_error(&transaction_id, error, addr, port);
            }
        }
    }

    /// Build the reply for an inbound query, per spec.md 4.8's per-method
    /// dispatch table.
    async fn handle_query(&self, query: &Query, addr: Ipv4Addr, port: u16) -> Result<Response, KrpcError> {
        match query {
            Query::Ping { .. } => Ok(Response::Ping {
                responder_id: self.local_id_inner(),
            }),

            Query::FindNode { target, .. } => {
                let nodes = {
                    let table = self.routing_table.lock().unwrap();
                    match table.find_node(target) {
                        Some(node) => vec![node],
                        None => table.find_closest_default(target),
                    }
                };
                Ok(Response::FindNode {
                    responder_id: self.local_id_inner(),
                    nodes,
                })
            }

            Query::GetPeers { info_hash, noseed, .. } => {
                let now = self.now();
                let token = issue_token(&self.token_secret, addr, port, now, 0);
                let hash_bytes = info_hash.to_bytes();
                let result = match self.peer_store.get_peers(&hash_bytes).await {
                    Ok(peers) => {
                        let peers = if *noseed {
                            peers.into_iter().filter(|p| !p.seeder).collect()
                        } else {
                            peers
                        };
                        GetPeersResult::Values(peers)
                    }
                    Err(PeerStoreError::NotTracked) | Err(PeerStoreError::Io(_)) => {
                        let table = self.routing_table.lock().unwrap();
                        GetPeersResult::Nodes(table.find_closest_default(info_hash))
                    }
                };
                Ok(Response::GetPeers {
                    responder_id: self.local_id_inner(),
                    token,
                    result,
                })
            }

            Query::AnnouncePeer {
                info_hash,
                port: arg_port,
                token,
                implied_port,
                seed,
                ..
            } => {
                let now = self.now();
                if !validate_token(&self.token_secret, addr, port, now, token) {
                    return Err(KrpcError::invalid_token());
                }
                let announced_port = if *implied_port { port } else { *arg_port };
                let peer = Peer::new(addr, announced_port, *seed);
                let hash_bytes = info_hash.to_bytes();
                // spec.md Section 5: a crash between this write and the
                // reply leaves the peer stored with no ack delivered; the
                // client retries, so the outcome is ignored here.
                let _ = self.peer_store.add_peer(&hash_bytes, peer).await;
                Ok(Response::AnnouncePeer {
                    responder_id: self.local_id_inner(),
                })
            }
        }
    }

    /// Correlate an inbound response against the outstanding-queries map
    /// and, on success, teach the routing table about every node it names
    /// (spec.md 4.8, "Response correlation").
    fn handle_response(&self, transaction_id: &TransactionId, raw: &RawDict, addr: Ipv4Addr, port: u16) {
        let entry = self.outstanding.lock().unwrap().remove(transaction_id);
        let entry = match entry {
            Some(entry) => entry,
            None => {
                trace!(%addr, port, "dropping response with no outstanding query");
                return;
            }
        };

        if entry.node.addr != addr || entry.node.port != port {
            trace!(
                %addr, port,
                expected_addr = %entry.node.addr, expected_port = entry.node.port,
                "dropping response from a mismatched address"
            );
            return;
        }

        let response = match decode_response_body(raw, entry.query.method_name()) {
            Ok(response) => response,
            Err(err) => {
                trace!(?err, %addr, port, "dropping malformed response body");
                return;
            }
        };

        self.learn(Node::new(response.responder_id(), addr, port));
        match &response {
            Response::FindNode { nodes, .. } => {
                for node in nodes {
                    self.learn(*node);
                }
            }
            Response::GetPeers { result: GetPeersResult::Nodes(nodes), .. } => {
                for node in nodes {
                    self.learn(*node);
                }
            }
            _ => {}
        }
    }

    fn handle_error(&self, transaction_id: &TransactionId, error: KrpcError, addr: Ipv4Addr, port: u16) {
        let removed = self.outstanding.lock().unwrap().remove(transaction_id);
        if removed.is_some() {
            warn!(?error, %addr, port, "outstanding query returned an error");
        } else {
            trace!(%addr, port, "dropping error with no outstanding query");
        }
    }
}
