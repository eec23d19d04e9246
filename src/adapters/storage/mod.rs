//! Peer store backends.
//!
//! Reference: spec.md Section 4.5 (C5), Section 9 ("Storage backend
//! polymorphism")

pub mod file;
pub mod mysql;

pub use file::FilePeerStore;
pub use mysql::{MySqlPeerStore, MySqlUnavailable};
