//! Typed KRPC message shapes.
//!
//! Reference: spec.md Section 4.7 (C7)

use std::net::Ipv4Addr;

use crate::domain::entities::{Id, Node, Peer};
use crate::domain::token::Token;

pub type TransactionId = Vec<u8>;

/// The four KRPC query types, each carrying the sender's id plus its own
/// method-specific arguments (spec.md 4.7, "Query").
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Query {
    Ping {
        sender_id: Id,
    },
    FindNode {
        sender_id: Id,
        target: Id,
    },
    GetPeers {
        sender_id: Id,
        info_hash: Id,
        noseed: bool,
        scrape: bool,
    },
    AnnouncePeer {
        sender_id: Id,
        info_hash: Id,
        port: u16,
        token: Token,
        implied_port: bool,
        seed: bool,
    },
}

impl Query {
    pub fn sender_id(&self) -> Id {
        match self {
            Query::Ping { sender_id }
            | Query::FindNode { sender_id, .. }
            | Query::GetPeers { sender_id, .. }
            | Query::AnnouncePeer { sender_id, .. } => *sender_id,
        }
    }

    pub fn method_name(&self) -> &'static str {
        match self {
            Query::Ping { .. } => "ping",
            Query::FindNode { .. } => "find_node",
            Query::GetPeers { .. } => "get_peers",
            Query::AnnouncePeer { .. } => "announce_peer",
        }
    }
}

/// Either a compact peer list or a closest-nodes fallback, per
/// `get_peers`'s "exactly one of `values` or `nodes`" contract.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GetPeersResult {
    Values(Vec<Peer>),
    Nodes(Vec<Node>),
}

/// A `y='r'` payload. The shape is implied by the originating query's
/// method, not re-tagged on the wire (spec.md 4.7, "Response").
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    Ping {
        responder_id: Id,
    },
    FindNode {
        responder_id: Id,
        nodes: Vec<Node>,
    },
    GetPeers {
        responder_id: Id,
        token: Token,
        result: GetPeersResult,
    },
    AnnouncePeer {
        responder_id: Id,
    },
}

impl Response {
    pub fn responder_id(&self) -> Id {
        match self {
            Response::Ping { responder_id }
            | Response::FindNode { responder_id, .. }
            | Response::GetPeers { responder_id, .. }
            | Response::AnnouncePeer { responder_id } => *responder_id,
        }
    }
}

/// The four standard KRPC error codes (spec.md 4.7, "Error").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    Generic = 201,
    Server = 202,
    Protocol = 203,
    UnknownMethod = 204,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KrpcError {
    pub code: ErrorCode,
    pub message: String,
}

impl KrpcError {
    pub fn invalid_token() -> Self {
        Self {
            code: ErrorCode::Protocol,
            message: "Invalid token".to_string(),
        }
    }
}

/// A raw bencoded dict, kept around for responses: the response body's
/// shape depends on the *originating query's* method, which is only known
/// once the transaction id is matched against the outstanding-queries map
/// (spec.md Section 4.7, "Decoder contract").
pub type RawDict = std::collections::HashMap<Vec<u8>, serde_bencode::value::Value>;

/// A decoded inbound datagram. Queries are fully self-describing; a
/// response's body is decoded in a second pass once its method is known.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    Query { transaction_id: TransactionId, query: Query },
    PendingResponse { transaction_id: TransactionId, raw: RawDict },
    Error { transaction_id: TransactionId, error: KrpcError },
}

impl Message {
    pub fn transaction_id(&self) -> &TransactionId {
        match self {
            Message::Query { transaction_id, .. }
            | Message::PendingResponse { transaction_id, .. }
            | Message::Error { transaction_id, .. } => transaction_id,
        }
    }
}

/// Decode-time failures. Every variant maps to "drop silently" at the
/// engine boundary (spec.md Section 7).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MalformedMessage {
    #[error("not a valid bencoded dictionary")]
    NotADict,
    #[error("missing required key '{0}'")]
    MissingKey(&'static str),
    #[error("key '{0}' had an unexpected type")]
    WrongType(&'static str),
    #[error("unknown message discriminator 'y'")]
    UnknownDiscriminator,
    #[error("unknown query method '{0}'")]
    UnknownMethod(String),
    #[error("expected a compact record of {expected} bytes, got {got}")]
    BadCompactLength { expected: usize, got: usize },
    #[error("compact list of {total_len} bytes is not a multiple of the {record_len}-byte record size")]
    BadCompactListLength { record_len: usize, total_len: usize },
    #[error("datagram of {0} bytes exceeds the maximum accepted size")]
    DatagramTooLarge(usize),
}

/// A `y='r'` or `y='e'` datagram whose transaction id has no matching
/// outstanding query (spec.md 4.7, "Decoder contract").
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("no outstanding query for transaction id")]
pub struct UnsolicitedResponse;

/// A response arrived from a different address than the matching query was
/// sent to (spec.md 4.7, "Decoder contract").
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("response address {got}:{got_port} does not match query destination {expected}:{expected_port}")]
pub struct AddressMismatch {
    pub expected: Ipv4Addr,
    pub expected_port: u16,
    pub got: Ipv4Addr,
    pub got_port: u16,
}
