//! Routing table implementation.
//!
//! Reference: spec.md Section 4.4 (C4)

mod bucket;
mod config;
mod table;

pub use bucket::Bucket;
pub use config::{RoutingTableConfig, DEFAULT_K, DEFAULT_REFRESH_SECS};
pub use table::{RefreshTarget, RoutingTable};
