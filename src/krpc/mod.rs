//! KRPC protocol: bencode codec, compact encodings, and the typed message
//! taxonomy.
//!
//! Reference: spec.md Section 4.7 (C7)

pub mod codec;
pub mod compact;
pub mod message;

pub use message::{
    AddressMismatch, ErrorCode, GetPeersResult, KrpcError, MalformedMessage, Message, Query,
    RawDict, Response, TransactionId, UnsolicitedResponse,
};
