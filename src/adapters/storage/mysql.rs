//! MySQL-backed peer store.
//!
//! Reference: spec.md Section 9 ("Storage backend polymorphism"). The
//! source's MySQL backend is an empty stub; this specification defers it.
//! Selecting `PEER_STORAGE=mysql` is accepted at the config layer but has
//! no working implementation behind it yet.

/// Placeholder for a future MySQL-backed `PeerStore`. Constructing one
/// always fails until a real implementation lands.
pub struct MySqlPeerStore {
    _private: (),
}

impl MySqlPeerStore {
    pub fn connect(_url: &str) -> Result<Self, MySqlUnavailable> {
        Err(MySqlUnavailable)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("the mysql peer store backend is not implemented")]
pub struct MySqlUnavailable;
