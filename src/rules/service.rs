//! Rule management operations.
//!
//! `RuleService` is the one entry point the HTTP layer and tests use. It
//! validates input, derives ids, and delegates to the injected store, the
//! resolver and the lifecycle guard.

use std::sync::Arc;

use crate::error::{RouterError, RouterResult};
use crate::lifecycle::{clock, LifecycleGuard};
use crate::observability::metrics;
use crate::routing::{Resolver, RouteRequest, ScoredRule};
use crate::rules::codec;
use crate::rules::types::{NewRule, QueryPolicy, Rule, RulePatch, Selector, Timestamp};
use crate::store::RuleStore;

#[derive(Clone)]
pub struct RuleService {
    store: Arc<dyn RuleStore>,
    resolver: Resolver,
    guard: LifecycleGuard,
}

impl RuleService {
    pub fn new(store: Arc<dyn RuleStore>) -> Self {
        Self {
            resolver: Resolver::new(store.clone()),
            guard: LifecycleGuard::new(store.clone()),
            store,
        }
    }

    /// A guard sharing this service's store, for the prune scheduler.
    pub fn lifecycle_guard(&self) -> LifecycleGuard {
        self.guard.clone()
    }

    /// Validate, derive the id and insert a new rule.
    pub fn create(&self, new_rule: NewRule) -> RouterResult<Rule> {
        let domain = normalize_domain(&new_rule.domain)?;
        let subdomain = Selector::parse_subdomain(new_rule.subdomain.as_deref())?;
        let path = Selector::parse_path(new_rule.path.as_deref())?;
        let query_policy = QueryPolicy::from_spec(new_rule.query)?;
        let target = validate_target(&new_rule.target)?;
        let id = codec::encode(&domain, &subdomain, &path, &query_policy)?;

        let now = clock::now();
        let rule = Rule {
            id,
            domain,
            subdomain,
            path,
            query_policy,
            target,
            expires_at: new_rule.expires_at,
            created_at: now,
            updated_at: now,
        };

        if let Err(e) = self.store.insert(rule.clone()) {
            let err = RouterError::from(e);
            if let RouterError::DuplicateRuleId(id) = &err {
                tracing::warn!(rule_id = %id, "Rejected duplicate rule");
            }
            return Err(err);
        }

        tracing::info!(
            rule_id = %rule.id,
            target = %rule.target,
            expires_at = rule.expires_at,
            "Rule created"
        );
        metrics::record_rule_mutation("create");
        self.record_rule_count();
        Ok(rule)
    }

    pub fn get(&self, id: &str) -> RouterResult<Option<Rule>> {
        Ok(self.store.get(id)?)
    }

    /// Every rule in creation order, including expired ones.
    pub fn list_all(&self) -> RouterResult<Vec<Rule>> {
        Ok(self.store.list()?)
    }

    pub fn list_active(&self, now: Timestamp) -> RouterResult<Vec<Rule>> {
        Ok(self.store.list_active(now)?)
    }

    /// Change the target and/or expiry of an existing rule.
    pub fn update(&self, id: &str, patch: RulePatch) -> RouterResult<Rule> {
        if patch.is_empty() {
            return Err(RouterError::NoFieldsProvided);
        }
        let patch = RulePatch {
            target: patch.target.as_deref().map(validate_target).transpose()?,
            expires_at: patch.expires_at,
        };

        let updated = self
            .store
            .update(id, &patch, clock::now())?
            .ok_or_else(|| RouterError::NotFound(id.to_string()))?;

        tracing::info!(
            rule_id = %updated.id,
            target = %updated.target,
            expires_at = updated.expires_at,
            "Rule updated"
        );
        metrics::record_rule_mutation("update");
        Ok(updated)
    }

    /// Remove a rule. `Ok(false)` when there was nothing to remove.
    pub fn delete(&self, id: &str) -> RouterResult<bool> {
        let removed = self.store.delete(id)?;
        if removed {
            tracing::info!(rule_id = %id, "Rule deleted");
            metrics::record_rule_mutation("delete");
            self.record_rule_count();
        }
        Ok(removed)
    }

    pub fn prune(&self, now: Timestamp) -> RouterResult<usize> {
        self.guard.prune(now)
    }

    pub fn resolve(&self, request: &RouteRequest) -> RouterResult<Option<Rule>> {
        self.resolver.resolve(request)
    }

    pub fn resolve_at(&self, request: &RouteRequest, now: Timestamp) -> RouterResult<Option<Rule>> {
        self.resolver.resolve_at(request, now)
    }

    /// Every rule that would match `request` now, best first.
    pub fn explain(&self, request: &RouteRequest) -> RouterResult<Vec<ScoredRule>> {
        self.resolver.explain_at(request, clock::now())
    }

    fn record_rule_count(&self) {
        match self.store.len() {
            Ok(n) => metrics::record_rule_count(n),
            Err(e) => tracing::warn!(error = %e, "Could not read rule count"),
        }
    }
}

fn normalize_domain(domain: &str) -> RouterResult<String> {
    let domain = domain.trim();
    if domain.is_empty() {
        return Err(RouterError::invalid("domain is required"));
    }
    if domain.contains('/') || domain.chars().any(char::is_whitespace) {
        return Err(RouterError::invalid(format!(
            "domain `{domain}` may not contain '/' or whitespace"
        )));
    }
    Ok(domain.to_ascii_lowercase())
}

fn validate_target(target: &str) -> RouterResult<String> {
    let target = target.trim();
    if target.is_empty() {
        return Err(RouterError::invalid("target is required"));
    }
    url::Url::parse(target)
        .map_err(|e| RouterError::invalid(format!("target `{target}` is not a valid URI: {e}")))?;
    Ok(target.to_string())
}
