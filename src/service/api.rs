//! Implementation of the driving port (`DhtApi`) for `Engine`.

use std::net::Ipv4Addr;

use async_trait::async_trait;

use crate::domain::entities::{Id, Node};
use crate::ports::inbound::DhtApi;
use crate::service::core::Engine;

#[async_trait]
impl DhtApi for Engine {
    fn local_id(&self) -> Id {
        self.local_id_inner()
    }

    async fn handle_datagram(&self, data: &[u8], addr: Ipv4Addr, port: u16) {
        self.dispatch_datagram(data, addr, port).await;
    }

    async fn on_heartbeat(&self) {
        let now = self.now();
        self.reap_outstanding(now);
        self.refresh_stale_buckets(now).await;
    }

    async fn find_node(&self, node: Node, target: Id) {
        self.find_node_query(node, target).await;
    }

    async fn routing_table_len(&self) -> usize {
        self.routing_table.lock().unwrap().len()
    }
}
