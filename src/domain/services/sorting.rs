//! Closeness ordering helpers shared by the routing table and the KRPC
//! engine's `find_node`/`get_peers` fallback replies.
//!
//! Reference: spec.md Section 4.4 (`find_closest`), Section 8 (invariant d)

use crate::domain::entities::{Id, Node};
use crate::domain::services::distance::xor_distance;

/// Sort `nodes` by non-decreasing XOR distance to `target`, stable on ties
/// (spec.md 4.4 "Tie-breaks": equal-distance nodes keep insertion order).
pub fn sort_nodes_by_distance(nodes: &mut [Node], target: &Id) {
    nodes.sort_by_key(|n| xor_distance(&n.id, target));
}

/// Return up to `k` nodes from `nodes` with smallest XOR distance to
/// `target`, sorted ascending.
pub fn find_k_closest(nodes: &[Node], target: &Id, k: usize) -> Vec<Node> {
    let mut sorted: Vec<Node> = nodes.to_vec();
    sort_nodes_by_distance(&mut sorted, target);
    sorted.truncate(k);
    sorted
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    fn node(id_byte: u8) -> Node {
        Node::new(
            Id::from_array([id_byte; 20]),
            Ipv4Addr::new(127, 0, 0, 1),
            6881,
        )
    }

    #[test]
    fn returns_sorted_ascending_by_distance() {
        let target = Id::zero();
        let nodes = vec![node(0x0f), node(0x01), node(0xff)];
        let closest = find_k_closest(&nodes, &target, 8);
        assert_eq!(closest[0].id, Id::from_array([0x01; 20]));
        assert_eq!(closest[1].id, Id::from_array([0x0f; 20]));
        assert_eq!(closest[2].id, Id::from_array([0xff; 20]));
    }

    #[test]
    fn truncates_to_k() {
        let target = Id::zero();
        let nodes = vec![node(1), node(2), node(3), node(4)];
        let closest = find_k_closest(&nodes, &target, 2);
        assert_eq!(closest.len(), 2);
    }

    #[test]
    fn empty_table_returns_empty() {
        let closest = find_k_closest(&[], &Id::zero(), 8);
        assert!(closest.is_empty());
    }
}
