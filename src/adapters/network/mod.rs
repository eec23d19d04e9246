//! Network-facing adapters: production UDP transport, config loading, and
//! an in-memory transport double for tests.
//!
//! `udp` and `loopback` require the `network` feature (they depend on
//! tokio); `config` and `time` are plain stdlib and always available.

pub mod config;
pub mod time;

pub use config::EnvConfigProvider;
pub use time::SystemTimeSource;

#[cfg(feature = "network")]
pub mod loopback;
#[cfg(feature = "network")]
pub mod udp;

#[cfg(feature = "network")]
pub use loopback::LoopbackTransport;
#[cfg(feature = "network")]
pub use udp::UdpTransport;
