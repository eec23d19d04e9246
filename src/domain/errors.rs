//! Domain errors for the DHT core.
//!
//! Reference: spec.md Section 7 (Error Handling Design)

/// An `Id` was constructed from a byte slice of the wrong length.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("expected a 20-byte id, got {got_len} bytes")]
pub struct MalformedId {
    pub got_len: usize,
}

/// Result of attempting to add a node to a bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BucketInsert {
    Added,
    Full,
    Duplicate,
    OutOfRange,
}

/// Result of attempting to add a peer to the peer store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeerInsert {
    Added,
    Duplicate,
    Full,
}

/// Errors surfaced by the peer store.
///
/// Reference: spec.md Section 4.5, 7
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PeerStoreError {
    #[error("info-hash is not tracked")]
    NotTracked,
    #[error("storage backend I/O failure: {0}")]
    Io(String),
}
