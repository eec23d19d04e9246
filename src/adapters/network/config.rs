//! Environment-variable configuration provider.
//!
//! Reference: spec.md Section 6 ("Configuration (enumerated)"); defaults
//! mirror the source's reference `config.example.py`.

use std::env;
use std::net::Ipv4Addr;
use std::path::PathBuf;

use crate::ports::ConfigProvider;

const DEFAULT_NODE_PORT: u16 = 6881;
const DEFAULT_NODE_ID_NAME: &str = "An Adequately Random Node Name For Entropy";
const DEFAULT_HEARTBEAT_SECS: u64 = 3;
const DEFAULT_PEER_STORAGE_DIR: &str = "./peer_storage";
const DEFAULT_K: usize = 8;
const DEFAULT_MAX_PEERS_PER_TORRENT: usize = 6000;
const DEFAULT_BOOTSTRAP: &[(&str, u16)] = &[
    ("dht.transmissionbt.com", 6881),
    ("router.utorrent.com", 6881),
];

/// Reads the env-var keys listed in spec.md Section 6 directly, with
/// defaults taken from the reference deployment's example config.
#[derive(Debug, Clone)]
pub struct EnvConfigProvider {
    node_port: u16,
    node_ip: Option<Ipv4Addr>,
    node_id_name: String,
    heartbeat_secs: u64,
    bootstrap: Vec<(String, u16)>,
    peer_storage_dir: PathBuf,
    k: usize,
    max_nodes_per_bucket: usize,
    max_peers_per_torrent: usize,
}

impl EnvConfigProvider {
    /// Load configuration from the process environment, falling back to
    /// the reference defaults for anything unset.
    pub fn from_env() -> Self {
        let k = env::var("K")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_K);

        Self {
            node_port: env::var("NODE_PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_NODE_PORT),
            node_ip: env::var("NODE_IP").ok().and_then(|v| v.parse().ok()),
            node_id_name: env::var("NODE_ID_NAME").unwrap_or_else(|_| DEFAULT_NODE_ID_NAME.to_string()),
            heartbeat_secs: env::var("HEARTBEAT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_HEARTBEAT_SECS),
            bootstrap: env::var("BOOTSTRAP")
                .ok()
                .map(|v| parse_bootstrap_list(&v))
                .unwrap_or_else(default_bootstrap),
            peer_storage_dir: env::var("PEER_STORAGE_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from(DEFAULT_PEER_STORAGE_DIR)),
            k,
            max_nodes_per_bucket: env::var("MAX_NODES_PER_BUCKET")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(k),
            max_peers_per_torrent: env::var("MAX_PEERS_PER_TORRENT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_MAX_PEERS_PER_TORRENT),
        }
    }
}

fn default_bootstrap() -> Vec<(String, u16)> {
    DEFAULT_BOOTSTRAP.iter().map(|(host, port)| (host.to_string(), *port)).collect()
}

/// `BOOTSTRAP` is a comma-separated `host:port` list, e.g.
/// `dht.example.com:6881,router.example.com:6881`.
fn parse_bootstrap_list(value: &str) -> Vec<(String, u16)> {
    value
        .split(',')
        .filter_map(|entry| {
            let entry = entry.trim();
            let (host, port) = entry.rsplit_once(':')?;
            Some((host.to_string(), port.parse().ok()?))
        })
        .collect()
}

impl ConfigProvider for EnvConfigProvider {
    fn node_port(&self) -> u16 {
        self.node_port
    }

    fn node_ip(&self) -> Option<Ipv4Addr> {
        self.node_ip
    }

    fn node_id_name(&self) -> String {
        self.node_id_name.clone()
    }

    fn heartbeat_secs(&self) -> u64 {
        self.heartbeat_secs
    }

    fn bootstrap_nodes(&self) -> Vec<(String, u16)> {
        self.bootstrap.clone()
    }

    fn peer_storage_dir(&self) -> PathBuf {
        self.peer_storage_dir.clone()
    }

    fn k(&self) -> usize {
        self.k
    }

    fn max_nodes_per_bucket(&self) -> usize {
        self.max_nodes_per_bucket
    }

    fn max_peers_per_torrent(&self) -> usize {
        self.max_peers_per_torrent
    }
}
