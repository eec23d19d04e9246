//! Heartbeat maintenance: reap expired outstanding queries and refresh
//! stale buckets.
//!
//! Reference: spec.md Section 4.4 (`refresh`), Section 4.8 ("Timeouts")

use crate::domain::entities::Timestamp;
use crate::service::core::{Engine, OUTSTANDING_TIMEOUT_SECS};

impl Engine {
    /// Discard outstanding queries older than the timeout threshold
    /// (spec.md 4.8, "Timeouts"). No protocol-level retry is attempted;
    /// higher-level flows may reissue.
    pub(crate) fn reap_outstanding(&self, now: Timestamp) {
        let mut outstanding = self.outstanding.lock().unwrap();
        outstanding.retain(|_, entry| {
            now.as_secs().saturating_sub(entry.sent_at.as_secs()) < OUTSTANDING_TIMEOUT_SECS
        });
    }

    /// For every bucket whose `refreshed_at` predates the staleness
    /// threshold, reissue a `find_node` for a random target in its range
    /// to one of the bucket's own members (spec.md 4.4, `refresh`). A
    /// bucket with no members yet has nothing to query and is left due;
    /// it is retried on the next heartbeat once it gains a contact.
    pub(crate) async fn refresh_stale_buckets(&self, now: Timestamp) {
        let due = {
            let table = self.routing_table.lock().unwrap();
            let mut rng = rand::thread_rng();
            table.buckets_due_for_refresh(now, &mut rng)
        };

        for target in due {
            let contact = {
                let table = self.routing_table.lock().unwrap();
                table
                    .buckets()
                    .iter()
                    .find(|b| b.contains_id(&target.target))
                    .and_then(|b| b.nodes().first().copied())
            };
            let Some(contact) = contact else { continue };

            self.routing_table
                .lock()
                .unwrap()
                .touch_bucket_for(&target.target, now);
            self.find_node_query(contact, target.target).await;
        }
    }
}
