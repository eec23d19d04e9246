//! Fixed-width compact encodings for peers and nodes.
//!
//! Reference: spec.md Section 4.7 ("Compact encodings")

use std::net::Ipv4Addr;

use crate::domain::entities::{Id, Node};
use crate::krpc::message::MalformedMessage;

pub const COMPACT_PEER_LEN: usize = 6;
pub const COMPACT_NODE_LEN: usize = 26;

/// Compact peer = 4-byte IPv4 big-endian || 2-byte port big-endian.
pub fn encode_compact_peer(addr: Ipv4Addr, port: u16) -> [u8; COMPACT_PEER_LEN] {
    let mut out = [0u8; COMPACT_PEER_LEN];
    out[0..4].copy_from_slice(&addr.octets());
    out[4..6].copy_from_slice(&port.to_be_bytes());
    out
}

pub fn decode_compact_peer(bytes: &[u8]) -> Result<(Ipv4Addr, u16), MalformedMessage> {
    if bytes.len() != COMPACT_PEER_LEN {
        return Err(MalformedMessage::BadCompactLength {
            expected: COMPACT_PEER_LEN,
            got: bytes.len(),
        });
    }
    let addr = Ipv4Addr::new(bytes[0], bytes[1], bytes[2], bytes[3]);
    let port = u16::from_be_bytes([bytes[4], bytes[5]]);
    Ok((addr, port))
}

/// Concatenation of fixed-size compact peer records; length must be a
/// multiple of 6 bytes.
pub fn decode_compact_peer_list(bytes: &[u8]) -> Result<Vec<(Ipv4Addr, u16)>, MalformedMessage> {
    if bytes.len() % COMPACT_PEER_LEN != 0 {
        return Err(MalformedMessage::BadCompactListLength {
            record_len: COMPACT_PEER_LEN,
            total_len: bytes.len(),
        });
    }
    bytes.chunks(COMPACT_PEER_LEN).map(decode_compact_peer).collect()
}

/// Compact node = 20-byte id || compact peer.
pub fn encode_compact_node(node: &Node) -> [u8; COMPACT_NODE_LEN] {
    let mut out = [0u8; COMPACT_NODE_LEN];
    out[0..20].copy_from_slice(node.id.as_bytes());
    out[20..26].copy_from_slice(&encode_compact_peer(node.addr, node.port));
    out
}

pub fn encode_compact_node_list(nodes: &[Node]) -> Vec<u8> {
    let mut out = Vec::with_capacity(nodes.len() * COMPACT_NODE_LEN);
    for n in nodes {
        out.extend_from_slice(&encode_compact_node(n));
    }
    out
}

pub fn decode_compact_node(bytes: &[u8]) -> Result<Node, MalformedMessage> {
    if bytes.len() != COMPACT_NODE_LEN {
        return Err(MalformedMessage::BadCompactLength {
            expected: COMPACT_NODE_LEN,
            got: bytes.len(),
        });
    }
    let id = Id::from_bytes(&bytes[0..20]).map_err(|_| MalformedMessage::BadCompactLength {
        expected: COMPACT_NODE_LEN,
        got: bytes.len(),
    })?;
    let (addr, port) = decode_compact_peer(&bytes[20..26])?;
    Ok(Node::new(id, addr, port))
}

pub fn decode_compact_node_list(bytes: &[u8]) -> Result<Vec<Node>, MalformedMessage> {
    if bytes.len() % COMPACT_NODE_LEN != 0 {
        return Err(MalformedMessage::BadCompactListLength {
            record_len: COMPACT_NODE_LEN,
            total_len: bytes.len(),
        });
    }
    bytes.chunks(COMPACT_NODE_LEN).map(decode_compact_node).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn peer_round_trips() {
        let addr = Ipv4Addr::new(192, 168, 1, 42);
        let encoded = encode_compact_peer(addr, 6881);
        let (decoded_addr, decoded_port) = decode_compact_peer(&encoded).unwrap();
        assert_eq!(decoded_addr, addr);
        assert_eq!(decoded_port, 6881);
    }

    #[test]
    fn peer_list_rejects_non_multiple_length() {
        assert!(decode_compact_peer_list(&[0u8; 7]).is_err());
        assert!(decode_compact_peer_list(&[0u8; 12]).is_ok());
    }

    #[test]
    fn node_round_trips() {
        let node = Node::new(Id::from_array([9u8; 20]), Ipv4Addr::new(1, 2, 3, 4), 80);
        let encoded = encode_compact_node(&node);
        let decoded = decode_compact_node(&encoded).unwrap();
        assert_eq!(decoded, node);
    }

    #[test]
    fn node_list_rejects_non_multiple_length() {
        assert!(decode_compact_node_list(&[0u8; 27]).is_err());
    }
}
