//! Ports layer - hexagonal architecture boundaries.
//!
//! - Driving ports (inbound): APIs this subsystem exposes to its host.
//! - Driven ports (outbound): SPIs this subsystem requires from adapters.

pub mod inbound;
pub mod outbound;

pub use inbound::DhtApi;
pub use outbound::{ConfigProvider, PeerStore, TimeSource, Transport};
