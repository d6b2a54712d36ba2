//! Rule storage subsystem.
//!
//! # Data Flow
//! ```text
//! RuleService (create/update/delete)
//!     → RuleStore::insert / update / delete   (single-row, uniqueness on id)
//! LifecycleGuard::prune
//!     → RuleStore::delete_expired             (one atomic sweep)
//! Resolver::resolve
//!     → RuleStore::list_active_for_domain     (consistent snapshot read)
//! ```
//!
//! # Design Decisions
//! - The store is injected as `Arc<dyn RuleStore>`; no global handle
//! - Activity is never stored, callers pass `now`
//! - `memory.rs` is the bundled backend, optionally written through to a
//!   JSON snapshot on disk

pub mod memory;

use thiserror::Error;

use crate::rules::{Rule, RulePatch, Timestamp};

pub use memory::MemoryRuleStore;

/// Storage-layer failures.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Uniqueness violation on the rule id.
    #[error("duplicate rule id: {0}")]
    Duplicate(String),

    #[error("snapshot I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("snapshot serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("rule table lock poisoned")]
    Poisoned,
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Durable rule table.
///
/// Implementations must make every method a single atomic operation with
/// respect to the others.
pub trait RuleStore: Send + Sync {
    /// Insert a new rule, failing with [`StoreError::Duplicate`] if the id exists.
    fn insert(&self, rule: Rule) -> StoreResult<()>;

    fn get(&self, id: &str) -> StoreResult<Option<Rule>>;

    /// Every rule in creation order, expired or not.
    fn list(&self) -> StoreResult<Vec<Rule>>;

    /// Every rule for `domain` in creation order, expired or not.
    fn list_domain(&self, domain: &str) -> StoreResult<Vec<Rule>>;

    /// Apply the patch and stamp `updated_at`. `Ok(None)` if the id is absent.
    fn update(&self, id: &str, patch: &RulePatch, updated_at: Timestamp) -> StoreResult<Option<Rule>>;

    /// Remove one rule. `Ok(true)` iff a row was removed.
    fn delete(&self, id: &str) -> StoreResult<bool>;

    /// Remove every rule with `expires_at <= now`, returning how many went.
    fn delete_expired(&self, now: Timestamp) -> StoreResult<usize>;

    fn len(&self) -> StoreResult<usize>;

    fn is_empty(&self) -> StoreResult<bool> {
        Ok(self.len()? == 0)
    }

    fn list_active(&self, now: Timestamp) -> StoreResult<Vec<Rule>> {
        Ok(self.list()?.into_iter().filter(|r| r.is_active(now)).collect())
    }

    fn list_active_for_domain(&self, domain: &str, now: Timestamp) -> StoreResult<Vec<Rule>> {
        Ok(self
            .list_domain(domain)?
            .into_iter()
            .filter(|r| r.is_active(now))
            .collect())
    }
}
