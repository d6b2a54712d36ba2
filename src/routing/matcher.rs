//! Specificity scoring.
//!
//! # Responsibilities
//! - Score a rule against a request on three independent dimensions
//! - Reject a rule outright when any dimension does not match
//! - Pick the single best rule out of a candidate set
//!
//! # Design Decisions
//! - Domain is never scored: candidates for other domains are dropped
//! - Subdomain and domain compare ASCII case-insensitively (callers
//!   normalise to lowercase), paths compare case-sensitively
//! - An absent, empty or `/` request path is one equivalence class, matched
//!   by a `None` path selector
//! - A query policy mismatch is a hard rejection, not a lower score
//!
//! # Specificity lattice
//! ```text
//!               subdomain   path   query
//! Exact / None      10        10
//! Any                1         1
//! AllowNone/List                      10
//! AllowAll                             5
//! ```
//! Ties on total score go to the most recently created rule, then to the
//! lexicographically smallest id. `created_at` has one-second resolution, so
//! two rules created within the same second tie on recency and fall through
//! to the id. The winner never depends on candidate order.

use std::cmp::Ordering;
use std::collections::BTreeSet;

use serde::Serialize;

use crate::rules::{QueryPolicy, Rule, Selector, Timestamp};

/// Score for an `Exact` hit, or a `None` selector meeting an absent value.
pub const EXACT_SCORE: u32 = 10;
/// Score for a wildcard selector.
pub const WILDCARD_SCORE: u32 = 1;
/// Score for a satisfied `AllowNone` or `AllowList` policy.
pub const RESTRICTED_QUERY_SCORE: u32 = 10;
/// Score for `AllowAll`, the least specific query match.
pub const OPEN_QUERY_SCORE: u32 = 5;

/// The addressing attributes of a request to resolve.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteRequest {
    pub domain: String,
    pub subdomain: Option<String>,
    pub path: Option<String>,
    pub query_keys: BTreeSet<String>,
}

impl RouteRequest {
    /// Build a request, normalising host parts to lowercase and treating
    /// an empty subdomain as absent.
    pub fn new<I, K>(domain: &str, subdomain: Option<&str>, path: Option<&str>, query_keys: I) -> Self
    where
        I: IntoIterator<Item = K>,
        K: Into<String>,
    {
        Self {
            domain: domain.trim().to_ascii_lowercase(),
            subdomain: subdomain
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_ascii_lowercase),
            path: path.map(str::to_string),
            query_keys: query_keys.into_iter().map(Into::into).collect(),
        }
    }
}

/// A candidate that survived scoring.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScoredRule {
    pub score: u32,
    pub rule: Rule,
}

impl ScoredRule {
    /// Total order used for selection; greater wins. Recency compares
    /// `created_at` in whole seconds.
    fn precedence(&self, other: &Self) -> Ordering {
        self.score
            .cmp(&other.score)
            .then(self.rule.created_at.cmp(&other.rule.created_at))
            .then_with(|| other.rule.id.cmp(&self.rule.id))
    }
}

/// Stateless best-match selector.
#[derive(Debug, Clone, Copy, Default)]
pub struct MatchEngine;

impl MatchEngine {
    pub fn new() -> Self {
        Self
    }

    /// Specificity of `rule` for `request`, or `None` if the rule is excluded.
    ///
    /// Does not look at domain or expiry.
    pub fn score(&self, rule: &Rule, request: &RouteRequest) -> Option<u32> {
        let subdomain = score_subdomain(&rule.subdomain, request.subdomain.as_deref())?;
        let path = score_path(&rule.path, request.path.as_deref())?;
        let query = score_query(&rule.query_policy, &request.query_keys)?;
        Some(subdomain + path + query)
    }

    /// Every active, same-domain candidate that matches, best first.
    pub fn rank<I>(&self, candidates: I, request: &RouteRequest, now: Timestamp) -> Vec<ScoredRule>
    where
        I: IntoIterator<Item = Rule>,
    {
        let mut scored: Vec<ScoredRule> = candidates
            .into_iter()
            .filter(|rule| rule.domain == request.domain && rule.is_active(now))
            .filter_map(|rule| self.score(&rule, request).map(|score| ScoredRule { score, rule }))
            .collect();
        scored.sort_by(|a, b| b.precedence(a));
        scored
    }

    /// The single best match, if any candidate survives.
    pub fn select<I>(&self, candidates: I, request: &RouteRequest, now: Timestamp) -> Option<Rule>
    where
        I: IntoIterator<Item = Rule>,
    {
        candidates
            .into_iter()
            .filter(|rule| rule.domain == request.domain && rule.is_active(now))
            .filter_map(|rule| self.score(&rule, request).map(|score| ScoredRule { score, rule }))
            .max_by(|a, b| a.precedence(b))
            .map(|scored| scored.rule)
    }
}

fn score_subdomain(selector: &Selector, requested: Option<&str>) -> Option<u32> {
    let requested = requested.filter(|s| !s.is_empty());
    match (selector, requested) {
        (Selector::Any, _) => Some(WILDCARD_SCORE),
        (Selector::None, None) => Some(EXACT_SCORE),
        (Selector::None, Some(_)) => None,
        (Selector::Exact(expected), Some(actual)) if expected.eq_ignore_ascii_case(actual) => {
            Some(EXACT_SCORE)
        }
        (Selector::Exact(_), _) => None,
    }
}

fn score_path(selector: &Selector, requested: Option<&str>) -> Option<u32> {
    let is_root = matches!(requested, None | Some("") | Some("/"));
    match selector {
        Selector::Any => Some(WILDCARD_SCORE),
        Selector::None if is_root => Some(EXACT_SCORE),
        Selector::None => None,
        Selector::Exact(expected) => {
            let actual = requested.unwrap_or("");
            let matches = match actual.strip_prefix('/') {
                Some(_) => expected == actual,
                None => expected.strip_prefix('/') == Some(actual),
            };
            matches.then_some(EXACT_SCORE)
        }
    }
}

fn score_query(policy: &QueryPolicy, keys: &BTreeSet<String>) -> Option<u32> {
    match policy {
        QueryPolicy::AllowAll => Some(OPEN_QUERY_SCORE),
        restricted => restricted.permits(keys).then_some(RESTRICTED_QUERY_SCORE),
    }
}
