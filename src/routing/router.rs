//! Request resolution against the rule store.
//!
//! # Responsibilities
//! - Fetch the active rules for the request's domain
//! - Hand them to the match engine
//! - Return the matched rule or an explicit no-match (`Ok(None)`)
//!
//! # Design Decisions
//! - Read-only: resolution never writes to the store
//! - Activity is evaluated against the `now` of this call only

use std::sync::Arc;

use crate::error::RouterResult;
use crate::lifecycle::clock;
use crate::observability::metrics;
use crate::routing::matcher::{MatchEngine, RouteRequest, ScoredRule};
use crate::rules::{Rule, Timestamp};
use crate::store::RuleStore;

/// Resolves requests to the best matching rule.
#[derive(Clone)]
pub struct Resolver {
    store: Arc<dyn RuleStore>,
    engine: MatchEngine,
}

impl Resolver {
    pub fn new(store: Arc<dyn RuleStore>) -> Self {
        Self {
            store,
            engine: MatchEngine::new(),
        }
    }

    /// Resolve at the current time.
    pub fn resolve(&self, request: &RouteRequest) -> RouterResult<Option<Rule>> {
        self.resolve_at(request, clock::now())
    }

    pub fn resolve_at(&self, request: &RouteRequest, now: Timestamp) -> RouterResult<Option<Rule>> {
        let candidates = self.store.list_active_for_domain(&request.domain, now)?;
        let candidate_count = candidates.len();
        let matched = self.engine.select(candidates, request, now);

        match &matched {
            Some(rule) => {
                tracing::debug!(
                    domain = %request.domain,
                    subdomain = ?request.subdomain,
                    path = ?request.path,
                    candidates = candidate_count,
                    rule_id = %rule.id,
                    target = %rule.target,
                    "Request resolved"
                );
                metrics::record_resolution("matched");
            }
            None => {
                tracing::debug!(
                    domain = %request.domain,
                    subdomain = ?request.subdomain,
                    path = ?request.path,
                    candidates = candidate_count,
                    "No rule matched"
                );
                metrics::record_resolution("no_match");
            }
        }

        Ok(matched)
    }

    /// Every matching candidate with its score, best first.
    pub fn explain_at(&self, request: &RouteRequest, now: Timestamp) -> RouterResult<Vec<ScoredRule>> {
        let candidates = self.store.list_active_for_domain(&request.domain, now)?;
        Ok(self.engine.rank(candidates, request, now))
    }
}
