//! Canonical rule identifiers.
//!
//! ```text
//! id             := subdomain_part "." domain path_part query_part?
//! subdomain_part := "*" | "!" | <exact-subdomain>
//! path_part      := "/*" | "/!" | "/" <exact-path-without-leading-slash>
//! query_part     := "/[" <comma-joined-sorted-keys> "]"
//! ```
//!
//! `AllowAll` contributes no query segment, so "every key permitted" and
//! "no key permitted" (`/[]`) always produce different ids.

use crate::error::{RouterError, RouterResult};
use crate::rules::types::{QueryPolicy, Selector, ANY_MARKER, NONE_MARKER};

/// Derive the id for a selector tuple.
///
/// Deterministic, and injective over `(subdomain, path, query_policy)` for a
/// fixed domain as long as the selectors came from the `parse_*`
/// constructors, which reject literals that would read as markers.
pub fn encode(
    domain: &str,
    subdomain: &Selector,
    path: &Selector,
    query_policy: &QueryPolicy,
) -> RouterResult<String> {
    if domain.trim().is_empty() {
        return Err(RouterError::invalid("domain is required"));
    }

    let mut id = String::with_capacity(domain.len() + 32);

    id.push_str(subdomain.as_str());
    id.push('.');
    id.push_str(domain);

    id.push('/');
    match path {
        Selector::Any => id.push_str(ANY_MARKER),
        Selector::None => id.push_str(NONE_MARKER),
        Selector::Exact(p) => id.push_str(p.strip_prefix('/').unwrap_or(p)),
    }

    match query_policy {
        QueryPolicy::AllowAll => {}
        QueryPolicy::AllowNone => id.push_str("/[]"),
        QueryPolicy::AllowList(keys) => {
            id.push_str("/[");
            for (i, key) in keys.iter().enumerate() {
                if i > 0 {
                    id.push(',');
                }
                id.push_str(key);
            }
            id.push(']');
        }
    }

    Ok(id)
}
