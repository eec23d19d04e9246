//! The KRPC engine (C8): dispatch, outbound queries, and heartbeat
//! maintenance over the domain routing table and peer store.
//!
//! Reference: spec.md Section 4.8, Section 9 ("Global mutable state")

mod api;
mod core;
mod dispatch;
mod maintenance;
mod outbound;

pub use core::Engine;
