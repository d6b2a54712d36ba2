//! Expired-rule removal.

use std::sync::Arc;

use crate::error::RouterResult;
use crate::observability::metrics;
use crate::rules::Timestamp;
use crate::store::RuleStore;

/// Removes rules whose expiry has passed.
///
/// Uses the same `expires_at <= now` test that makes a rule inactive, so it
/// never removes a rule a concurrent resolution could still match.
#[derive(Clone)]
pub struct LifecycleGuard {
    store: Arc<dyn RuleStore>,
}

impl LifecycleGuard {
    pub fn new(store: Arc<dyn RuleStore>) -> Self {
        Self { store }
    }

    /// Delete every rule with `expires_at <= now` in one sweep.
    pub fn prune(&self, now: Timestamp) -> RouterResult<usize> {
        let removed = self.store.delete_expired(now)?;
        if removed > 0 {
            tracing::info!(removed, now, "Pruned expired rules");
        } else {
            tracing::debug!(now, "No expired rules to prune");
        }
        metrics::record_rules_pruned(removed);
        match self.store.len() {
            Ok(n) => metrics::record_rule_count(n),
            Err(e) => tracing::warn!(error = %e, "Could not read rule count"),
        }
        Ok(removed)
    }
}
