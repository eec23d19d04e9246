//! The routing table: an ordered partition of the 160-bit id space into
//! buckets, with split-on-overflow insertion and closest-K lookup.
//!
//! Reference: spec.md Section 4.4 (C4)

use crate::domain::entities::{Id, Node, Timestamp};
use crate::domain::errors::BucketInsert;
use crate::domain::routing_table::bucket::Bucket;
use crate::domain::routing_table::config::RoutingTableConfig;
use crate::domain::services::sorting::find_k_closest;

/// A bucket due for refresh, with a random target in its range to query.
pub struct RefreshTarget {
    pub target: Id,
}

pub struct RoutingTable {
    local_id: Id,
    config: RoutingTableConfig,
    buckets: Vec<Bucket>,
}

impl RoutingTable {
    /// A fresh table is a single bucket spanning the whole id space
    /// (spec.md Section 3, "Routing Table").
    pub fn new(local_id: Id, config: RoutingTableConfig, now: Timestamp) -> Self {
        Self {
            local_id,
            config,
            buckets: vec![Bucket::new(Id::zero(), Id::max(), now)],
        }
    }

    pub fn buckets(&self) -> &[Bucket] {
        &self.buckets
    }

    pub fn len(&self) -> usize {
        self.buckets.iter().map(Bucket::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn bucket_index_for(&self, id: &Id) -> usize {
        self.buckets
            .iter()
            .position(|b| b.contains_id(id))
            .expect("bucket intervals partition the full id space")
    }

    /// Attempt to add `node`, splitting the covering bucket and retrying if
    /// it is full and the local id lies within its range; otherwise a full
    /// out-of-range bucket silently drops the candidate (spec.md 4.4, and
    /// the resolved open question in Section 9).
    pub fn add_node(&mut self, node: Node, now: Timestamp) -> BucketInsert {
        let idx = self.bucket_index_for(&node.id);
        match self.buckets[idx].try_add(node, self.config.k, now) {
            BucketInsert::Full => {
                if self.buckets[idx].contains_id(&self.local_id) {
                    self.split_bucket(idx, now);
                    self.add_node(node, now)
                } else {
                    BucketInsert::Full
                }
            }
            other => other,
        }
    }

    /// Split bucket `idx` into two halves at its midpoint, redistributing
    /// its nodes, and replace it in the ordered sequence (spec.md 4.4,
    /// "Split algorithm").
    fn split_bucket(&mut self, idx: usize, now: Timestamp) {
        let old = self.buckets.remove(idx);
        let mid = Id::midpoint(&old.low(), &old.high());
        let mut lower = Bucket::new(old.low(), mid, old.refreshed_at());
        let higher_low = mid.checked_add_one().expect(
            "mid < high because a full bucket with lo == hi would require a duplicate id",
        );
        let mut higher = Bucket::new(higher_low, old.high(), old.refreshed_at());

        for n in old.nodes() {
            let target = if lower.contains_id(&n.id) {
                &mut lower
            } else {
                &mut higher
            };
            target.try_add(*n, usize::MAX, now);
        }
        // try_add stamps refreshed_at = now on every push; both halves
        // inherit the pre-split timestamp instead (spec.md 4.4, "split").
        lower.touch(old.refreshed_at());
        higher.touch(old.refreshed_at());

        self.buckets.insert(idx, higher);
        self.buckets.insert(idx, lower);
    }

    /// Locate the bucket containing `id` and linear-scan for exact match
    /// (spec.md 4.4).
    pub fn find_node(&self, id: &Id) -> Option<Node> {
        let idx = self.bucket_index_for(id);
        self.buckets[idx].nodes().iter().find(|n| &n.id == id).copied()
    }

    /// Up to `k` nodes from the entire table with smallest XOR distance to
    /// `target`, sorted ascending (spec.md 4.4).
    pub fn find_closest(&self, target: &Id, k: usize) -> Vec<Node> {
        let all: Vec<Node> = self.buckets.iter().flat_map(Bucket::nodes).copied().collect();
        find_k_closest(&all, target, k)
    }

    /// Up to `K` nodes, using the table's configured bucket size.
    pub fn find_closest_default(&self, target: &Id) -> Vec<Node> {
        self.find_closest(target, self.config.k)
    }

    /// Buckets whose `refreshed_at` predates `now - refresh_secs`, paired
    /// with a random target in their interval. The caller (the KRPC
    /// engine's heartbeat) is responsible for issuing the `find_node`
    /// queries and recording the new `refreshed_at` (spec.md 4.4 `refresh`).
    pub fn buckets_due_for_refresh(&self, now: Timestamp, rng: &mut impl rand::RngCore) -> Vec<RefreshTarget> {
        let threshold = now.sub_secs(self.config.refresh_secs);
        self.buckets
            .iter()
            .filter(|b| b.refreshed_at() < threshold)
            .map(|b| RefreshTarget {
                target: random_id_in_range(b.low(), b.high(), rng),
            })
            .collect()
    }

    /// Mark every bucket containing `id` as freshly refreshed. Used after a
    /// successful targeted `find_node` round-trip.
    pub fn touch_bucket_for(&mut self, id: &Id, now: Timestamp) {
        let idx = self.bucket_index_for(id);
        self.buckets[idx].touch(now);
    }

    pub fn config(&self) -> RoutingTableConfig {
        self.config
    }
}

/// Uniformly sample a random id within `[low, high]` by generating 20
/// random bytes and clamping into range via modular reduction on the
/// distance from `low`.
fn random_id_in_range(low: Id, high: Id, rng: &mut impl rand::RngCore) -> Id {
    if low == high {
        return low;
    }
    let mut bytes = [0u8; 20];
    rng.fill_bytes(&mut bytes);
    let span = high.distance(&low);
    let mut candidate = [0u8; 20];
    for i in 0..20 {
        candidate[i] = bytes[i] & span.as_bytes()[i];
    }
    let candidate = Id::from_array(candidate);
    // candidate is in [0, span] byte-wise when masked this way is not exact
    // for non-power-of-two spans, but always within [low, high] once added:
    let mut out = [0u8; 20];
    let mut carry = 0u16;
    for i in (0..20).rev() {
        let sum = low.as_bytes()[i] as u16 + candidate.as_bytes()[i] as u16 + carry;
        out[i] = sum as u8;
        carry = sum >> 8;
    }
    let out = Id::from_array(out);
    if out < low {
        low
    } else if out > high {
        high
    } else {
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    fn node(byte: u8) -> Node {
        Node::new(Id::from_array([byte; 20]), Ipv4Addr::new(127, 0, 0, 1), 6881)
    }

    fn id(byte0: u8) -> Id {
        let mut b = [0u8; 20];
        b[0] = byte0;
        Id::from_array(b)
    }

    #[test]
    fn starts_as_a_single_full_range_bucket() {
        let table = RoutingTable::new(Id::zero(), RoutingTableConfig::default(), Timestamp::new(0));
        assert_eq!(table.buckets().len(), 1);
        assert_eq!(table.buckets()[0].low(), Id::zero());
        assert_eq!(table.buckets()[0].high(), Id::max());
    }

    #[test]
    fn add_and_find_node() {
        let mut table = RoutingTable::new(Id::zero(), RoutingTableConfig::default(), Timestamp::new(0));
        let n = node(5);
        assert_eq!(table.add_node(n, Timestamp::new(1)), BucketInsert::Added);
        assert_eq!(table.find_node(&n.id), Some(n));
        assert_eq!(table.find_node(&id(99)), None);
    }

    #[test]
    fn duplicate_insert_is_rejected() {
        let mut table = RoutingTable::new(Id::zero(), RoutingTableConfig::default(), Timestamp::new(0));
        let n = node(5);
        assert_eq!(table.add_node(n, Timestamp::new(1)), BucketInsert::Added);
        assert_eq!(table.add_node(n, Timestamp::new(2)), BucketInsert::Duplicate);
    }

    /// spec.md Section 8, scenario 5: local id 0x80...00, K=2, inserting
    /// 0x00...01, 0xC0...00, 0xE0...00 must split and leave the latter two
    /// sharing a bucket distinct from the first.
    #[test]
    fn splits_when_local_id_is_in_range() {
        let local = id(0x80);
        let mut table = RoutingTable::new(local, RoutingTableConfig::for_testing(), Timestamp::new(0));

        assert_eq!(table.add_node(node(0x00), Timestamp::new(1)), BucketInsert::Added);
        assert_eq!(table.add_node(node(0xC0), Timestamp::new(1)), BucketInsert::Added);

        // third insert overflows the root bucket; local id 0x80 is in
        // range, so it must split rather than reject.
        let result = table.add_node(node(0xE0), Timestamp::new(1));
        assert_eq!(result, BucketInsert::Added);
        assert!(table.buckets().len() >= 2);

        let low_id = Id::from_array([0x00; 20]);
        let high_a = Id::from_array([0xC0; 20]);
        let high_b = Id::from_array([0xE0; 20]);

        let bucket_of = |needle: &Id| {
            table
                .buckets()
                .iter()
                .position(|b| b.contains_node(needle))
                .unwrap()
        };
        assert_ne!(bucket_of(&low_id), bucket_of(&high_a));
        assert_eq!(bucket_of(&high_a), bucket_of(&high_b));
    }

    #[test]
    fn full_bucket_out_of_local_range_drops_silently() {
        // local id 0: the upper half, once split off, never contains it, so
        // once that half is full it must refuse rather than split further.
        let local = Id::zero();
        let mut table = RoutingTable::new(local, RoutingTableConfig::for_testing(), Timestamp::new(0));

        assert_eq!(table.add_node(node(0x00), Timestamp::new(1)), BucketInsert::Added);
        assert_eq!(table.add_node(node(0x01), Timestamp::new(1)), BucketInsert::Added);
        // Root bucket is now full and contains local id 0, so this insert
        // forces a split; the new node lands in the upper half.
        assert_eq!(table.add_node(node(0xFF), Timestamp::new(1)), BucketInsert::Added);
        // Fill the upper half (k=2) to capacity.
        assert_eq!(table.add_node(node(0xFE), Timestamp::new(1)), BucketInsert::Added);

        let before = table.buckets().len();
        // A third id in the upper half's range: that bucket is full and
        // does not contain local id 0, so it must drop rather than split.
        let extra = table.add_node(node(0x90), Timestamp::new(1));
        assert_eq!(extra, BucketInsert::Full);
        assert_eq!(table.buckets().len(), before);
    }

    #[test]
    fn split_halves_inherit_the_pre_split_refreshed_at() {
        // local 0x80, so 0xC0/0xE0 land in the "higher" half and 0x00 in
        // the "lower" half (see `splits_when_local_id_is_in_range`).
        let local = id(0x80);
        let mut table = RoutingTable::new(local, RoutingTableConfig::for_testing(), Timestamp::new(5));

        assert_eq!(table.add_node(node(0x00), Timestamp::new(5)), BucketInsert::Added);
        assert_eq!(table.add_node(node(0xC0), Timestamp::new(5)), BucketInsert::Added);
        // Root bucket was last touched at t=5. This third insert forces a
        // split at t=999, landing in the "higher" half; the "lower" half
        // (holding 0x00, which is merely redistributed, not newly added)
        // must keep the pre-split timestamp rather than look freshly
        // refreshed.
        assert_eq!(table.add_node(node(0xE0), Timestamp::new(999)), BucketInsert::Added);

        let low_id = Id::from_array([0x00; 20]);
        let high_id = Id::from_array([0xC0; 20]);
        let lower = table.buckets().iter().find(|b| b.contains_node(&low_id)).unwrap();
        let higher = table.buckets().iter().find(|b| b.contains_node(&high_id)).unwrap();
        assert_eq!(lower.refreshed_at(), Timestamp::new(5));
        assert_eq!(higher.refreshed_at(), Timestamp::new(999));
    }

    #[test]
    fn find_closest_returns_empty_on_empty_table() {
        let table = RoutingTable::new(Id::zero(), RoutingTableConfig::default(), Timestamp::new(0));
        assert!(table.find_closest(&Id::zero(), 8).is_empty());
    }

    #[test]
    fn find_closest_orders_by_distance() {
        let mut table = RoutingTable::new(Id::zero(), RoutingTableConfig::default(), Timestamp::new(0));
        table.add_node(node(0x01), Timestamp::new(1));
        table.add_node(node(0x02), Timestamp::new(1));
        table.add_node(node(0xFF), Timestamp::new(1));

        let closest = table.find_closest(&Id::zero(), 8);
        assert_eq!(closest.len(), 3);
        assert_eq!(closest[0].id, id(0x01));
        assert_eq!(closest[1].id, id(0x02));
        assert_eq!(closest[2].id, id(0xFF));
    }
}
