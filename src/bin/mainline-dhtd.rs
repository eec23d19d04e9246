//! Process entry point: binds the UDP socket, opens peer storage, bootstraps
//! the routing table, and runs the single-threaded event loop.
//!
//! Reference: spec.md Section 5 (concurrency model), Section 6
//! (configuration, exit codes)

use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use mainline_dht::adapters::network::{EnvConfigProvider, SystemTimeSource, UdpTransport};
use mainline_dht::adapters::storage::FilePeerStore;
use mainline_dht::domain::entities::{Id, Node};
use mainline_dht::domain::routing_table::{RoutingTable, RoutingTableConfig};
use mainline_dht::domain::token::TokenSecret;
use mainline_dht::{derive_node_id, ConfigProvider, DhtApi, Engine, TimeSource};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = EnvConfigProvider::from_env();
    let local_id = derive_node_id(&config.node_id_name());
    info!(node_id = %hex::encode(local_id.as_bytes()), "starting mainline-dhtd");

    let transport = Arc::new(
        UdpTransport::bind(config.node_port())
            .await
            .context("failed to bind UDP socket")?,
    );
    info!(addr = ?transport.local_addr()?, "listening");

    let peer_store = FilePeerStore::new(config.peer_storage_dir(), config.max_peers_per_torrent())
        .context("failed to initialize peer storage")?;

    let time_source = SystemTimeSource::new();
    let now = time_source.now();
    let routing_config = RoutingTableConfig {
        k: config.k(),
        refresh_secs: RoutingTableConfig::default().refresh_secs,
    };
    let table = RoutingTable::new(local_id, routing_config, now);
    let token_secret = TokenSecret::generate(&mut rand::thread_rng());

    let engine = Engine::new(
        local_id,
        token_secret,
        table,
        Box::new(peer_store),
        Box::new(Arc::clone(&transport)),
        Box::new(time_source),
    );

    bootstrap(&engine, &config, local_id).await;

    let mut heartbeat = tokio::time::interval(Duration::from_secs(config.heartbeat_secs()));

    loop {
        tokio::select! {
            datagram = transport.recv_from() => {
                match datagram {
                    Ok((data, addr, port)) => engine.handle_datagram(&data, addr, port).await,
                    Err(err) => warn!(?err, "transport recv error"),
                }
            }
            _ = heartbeat.tick() => {
                engine.on_heartbeat().await;
            }
            _ = tokio::signal::ctrl_c() => {
                info!("received ctrl-c, shutting down");
                break;
            }
        }
    }

    Ok(())
}

/// Resolve and query each configured bootstrap node with a `find_node` for
/// our own id, seeding the routing table (spec.md Section 6, `BOOTSTRAP`).
/// The recipient's id is unknown until it replies, so a zero placeholder is
/// used purely for the outstanding-query bookkeeping; response correlation
/// matches on address, not id.
async fn bootstrap(engine: &Engine, config: &EnvConfigProvider, local_id: Id) {
    for (host, port) in config.bootstrap_nodes() {
        match tokio::net::lookup_host((host.as_str(), port)).await {
            Ok(addrs) => {
                for addr in addrs {
                    if let IpAddr::V4(v4) = addr.ip() {
                        engine.find_node(Node::new(Id::zero(), v4, port), local_id).await;
                    }
                }
            }
            Err(err) => warn!(%host, port, ?err, "failed to resolve bootstrap node"),
        }
    }
}
