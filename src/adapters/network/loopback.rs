//! In-memory `Transport` double, so the engine can be exercised end-to-end
//! in tests without a real socket.
//!
//! Reference: spec.md Section 5 (suspension points).

use std::collections::VecDeque;
use std::net::Ipv4Addr;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::ports::Transport;

/// A queue of inbound datagrams to be drained by `recv_from`, and a log of
/// everything sent through `send_to`.
#[derive(Default)]
pub struct LoopbackTransport {
    inbound: Mutex<VecDeque<(Vec<u8>, Ipv4Addr, u16)>>,
    outbound: Mutex<Vec<(Vec<u8>, Ipv4Addr, u16)>>,
}

impl LoopbackTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn push_inbound(&self, data: Vec<u8>, addr: Ipv4Addr, port: u16) {
        self.inbound.lock().await.push_back((data, addr, port));
    }

    pub async fn sent(&self) -> Vec<(Vec<u8>, Ipv4Addr, u16)> {
        self.outbound.lock().await.clone()
    }
}

#[async_trait]
impl Transport for LoopbackTransport {
    async fn send_to(&self, data: &[u8], addr: Ipv4Addr, port: u16) -> std::io::Result<()> {
        self.outbound.lock().await.push((data.to_vec(), addr, port));
        Ok(())
    }

    async fn recv_from(&self) -> std::io::Result<(Vec<u8>, Ipv4Addr, u16)> {
        loop {
            if let Some(next) = self.inbound.lock().await.pop_front() {
                return Ok(next);
            }
            tokio::task::yield_now().await;
        }
    }
}

/// Forwarding impl so a test can hold an `Arc<LoopbackTransport>` for
/// inspection (`sent`, `push_inbound`) while also handing the engine a
/// boxed `Transport` backed by the same queues.
#[async_trait]
impl Transport for std::sync::Arc<LoopbackTransport> {
    async fn send_to(&self, data: &[u8], addr: Ipv4Addr, port: u16) -> std::io::Result<()> {
        self.as_ref().send_to(data, addr, port).await
    }

    async fn recv_from(&self) -> std::io::Result<(Vec<u8>, Ipv4Addr, u16)> {
        self.as_ref().recv_from().await
    }
}
