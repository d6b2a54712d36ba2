//! Rule data model.
//!
//! Selectors and query policies serialize to the persisted column shapes:
//! a selector is a string (`*`, `!` or a literal) and a query policy is a
//! nullable list of keys (`null` = allow all).

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::error::{RouterError, RouterResult};

/// Seconds since the Unix epoch.
pub type Timestamp = u64;

/// Marker for the wildcard selector.
pub const ANY_MARKER: &str = "*";
/// Marker for the absence selector.
pub const NONE_MARKER: &str = "!";

/// Match condition for a single routing dimension.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "Option<String>", into = "Option<String>")]
pub enum Selector {
    /// Matches any concrete value.
    Any,
    /// Matches only when the dimension is absent from the request.
    None,
    /// Matches only this literal value.
    Exact(String),
}

impl Selector {
    /// Parse a subdomain selector from user input.
    ///
    /// Absent, empty or `*` means [`Selector::Any`], `!` means
    /// [`Selector::None`]. Literals are lowercased.
    pub fn parse_subdomain(input: Option<&str>) -> RouterResult<Self> {
        let value = match input.map(str::trim) {
            None | Some("") | Some(ANY_MARKER) => return Ok(Selector::Any),
            Some(NONE_MARKER) => return Ok(Selector::None),
            Some(v) => v,
        };
        if value.contains('/') || value.chars().any(char::is_whitespace) {
            return Err(RouterError::invalid(format!(
                "subdomain `{value}` may not contain '/' or whitespace"
            )));
        }
        Ok(Selector::Exact(value.to_ascii_lowercase()))
    }

    /// Parse a path selector from user input.
    ///
    /// Absent, empty, `*` or `/*` means [`Selector::Any`]; `!` or `/!` means
    /// [`Selector::None`]. Literals are normalised to one leading `/`.
    pub fn parse_path(input: Option<&str>) -> RouterResult<Self> {
        let value = match input.map(str::trim) {
            None | Some("") => return Ok(Selector::Any),
            Some(v) => v,
        };
        let body = value.trim_start_matches('/');
        match body {
            ANY_MARKER => return Ok(Selector::Any),
            NONE_MARKER => return Ok(Selector::None),
            _ => {}
        }
        if body.contains(['[', ']']) || body.chars().any(char::is_whitespace) {
            return Err(RouterError::invalid(format!(
                "path `{value}` may not contain '[', ']' or whitespace"
            )));
        }
        Ok(Selector::Exact(format!("/{body}")))
    }

    /// The string stored for this selector.
    pub fn as_str(&self) -> &str {
        match self {
            Selector::Any => ANY_MARKER,
            Selector::None => NONE_MARKER,
            Selector::Exact(v) => v,
        }
    }
}

impl From<Option<String>> for Selector {
    fn from(value: Option<String>) -> Self {
        match value {
            None => Selector::Any,
            Some(v) if v == ANY_MARKER => Selector::Any,
            Some(v) if v == NONE_MARKER => Selector::None,
            Some(v) => Selector::Exact(v),
        }
    }
}

impl From<Selector> for Option<String> {
    fn from(selector: Selector) -> Self {
        Some(match selector {
            Selector::Exact(v) => v,
            other => other.as_str().to_string(),
        })
    }
}

/// Which query-parameter keys a request may carry.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "Option<Vec<String>>", into = "Option<Vec<String>>")]
pub enum QueryPolicy {
    /// Any set of keys is acceptable.
    #[default]
    AllowAll,
    /// The request must carry no keys.
    AllowNone,
    /// Every request key must be in this set. Never empty; an empty list is
    /// represented as [`QueryPolicy::AllowNone`].
    AllowList(BTreeSet<String>),
}

impl QueryPolicy {
    /// Build a policy from the nullable key list accepted at creation.
    pub fn from_spec(spec: Option<Vec<String>>) -> RouterResult<Self> {
        if let Some(keys) = &spec {
            for key in keys {
                if key.is_empty() || key.contains([',', '[', ']']) {
                    return Err(RouterError::invalid(format!(
                        "query key `{key}` must be non-empty and may not contain ',', '[' or ']'"
                    )));
                }
            }
        }
        Ok(Self::from(spec))
    }

    /// Whether a request carrying `keys` satisfies this policy.
    pub fn permits(&self, keys: &BTreeSet<String>) -> bool {
        match self {
            QueryPolicy::AllowAll => true,
            QueryPolicy::AllowNone => keys.is_empty(),
            QueryPolicy::AllowList(allowed) => keys.is_subset(allowed),
        }
    }
}

impl From<Option<Vec<String>>> for QueryPolicy {
    fn from(spec: Option<Vec<String>>) -> Self {
        match spec {
            None => QueryPolicy::AllowAll,
            Some(keys) if keys.is_empty() => QueryPolicy::AllowNone,
            Some(keys) => QueryPolicy::AllowList(keys.into_iter().collect()),
        }
    }
}

impl From<QueryPolicy> for Option<Vec<String>> {
    fn from(policy: QueryPolicy) -> Self {
        match policy {
            QueryPolicy::AllowAll => None,
            QueryPolicy::AllowNone => Some(Vec::new()),
            QueryPolicy::AllowList(keys) => Some(keys.into_iter().collect()),
        }
    }
}

/// A stored routing rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rule {
    /// Canonical id derived from the selector tuple.
    pub id: String,
    pub domain: String,
    pub subdomain: Selector,
    pub path: Selector,
    pub query_policy: QueryPolicy,
    /// Downstream URI requests are routed to.
    #[serde(alias = "downstream_url")]
    pub target: String,
    pub expires_at: Timestamp,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Rule {
    /// A rule is active while its expiry lies strictly in the future.
    pub fn is_active(&self, now: Timestamp) -> bool {
        self.expires_at > now
    }
}

/// Input accepted by rule creation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewRule {
    #[serde(default)]
    pub domain: String,
    #[serde(default)]
    pub subdomain: Option<String>,
    #[serde(default)]
    pub path: Option<String>,
    /// `null` allows all keys, `[]` allows none, otherwise an allow-list.
    #[serde(default, alias = "query_params")]
    pub query: Option<Vec<String>>,
    #[serde(default, alias = "downstream_url")]
    pub target: String,
    pub expires_at: Timestamp,
}

/// The fields an update may change.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RulePatch {
    #[serde(default, alias = "downstream_url", skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<Timestamp>,
}

impl RulePatch {
    pub fn is_empty(&self) -> bool {
        self.target.is_none() && self.expires_at.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subdomain_parsing() {
        assert_eq!(Selector::parse_subdomain(None).unwrap(), Selector::Any);
        assert_eq!(Selector::parse_subdomain(Some("*")).unwrap(), Selector::Any);
        assert_eq!(Selector::parse_subdomain(Some("!")).unwrap(), Selector::None);
        assert_eq!(
            Selector::parse_subdomain(Some("API")).unwrap(),
            Selector::Exact("api".into())
        );
        assert!(Selector::parse_subdomain(Some("a/b")).is_err());
    }

    #[test]
    fn test_path_parsing_normalises_leading_slash() {
        assert_eq!(
            Selector::parse_path(Some("users")).unwrap(),
            Selector::Exact("/users".into())
        );
        assert_eq!(
            Selector::parse_path(Some("//users")).unwrap(),
            Selector::Exact("/users".into())
        );
        assert_eq!(Selector::parse_path(Some("/*")).unwrap(), Selector::Any);
        assert_eq!(Selector::parse_path(Some("/!")).unwrap(), Selector::None);
        assert!(Selector::parse_path(Some("/home/[]")).is_err());
    }

    #[test]
    fn test_query_policy_from_spec() {
        assert_eq!(QueryPolicy::from_spec(None).unwrap(), QueryPolicy::AllowAll);
        assert_eq!(QueryPolicy::from_spec(Some(vec![])).unwrap(), QueryPolicy::AllowNone);

        let policy = QueryPolicy::from_spec(Some(vec!["page".into(), "id".into(), "id".into()])).unwrap();
        let expected: BTreeSet<String> = ["id", "page"].iter().map(|s| s.to_string()).collect();
        assert_eq!(policy, QueryPolicy::AllowList(expected));

        assert!(QueryPolicy::from_spec(Some(vec!["a,b".into()])).is_err());
        assert!(QueryPolicy::from_spec(Some(vec!["".into()])).is_err());
    }

    #[test]
    fn test_query_policy_permits() {
        let keys = |ks: &[&str]| ks.iter().map(|s| s.to_string()).collect::<BTreeSet<_>>();
        let list = QueryPolicy::AllowList(keys(&["id", "page"]));

        assert!(QueryPolicy::AllowAll.permits(&keys(&["anything"])));
        assert!(QueryPolicy::AllowNone.permits(&keys(&[])));
        assert!(!QueryPolicy::AllowNone.permits(&keys(&["id"])));
        assert!(list.permits(&keys(&[])));
        assert!(list.permits(&keys(&["id"])));
        assert!(!list.permits(&keys(&["id", "sort"])));
    }

    #[test]
    fn test_persisted_shape() {
        let rule = Rule {
            id: "api.example.com/users/[id]".into(),
            domain: "example.com".into(),
            subdomain: Selector::Exact("api".into()),
            path: Selector::Any,
            query_policy: QueryPolicy::AllowAll,
            target: "http://10.0.0.1:3000".into(),
            expires_at: 10,
            created_at: 1,
            updated_at: 1,
        };
        let json = serde_json::to_value(&rule).unwrap();
        assert_eq!(json["subdomain"], "api");
        assert_eq!(json["path"], "*");
        assert!(json["query_policy"].is_null());

        let legacy = serde_json::json!({
            "id": "!.example.com/!/[]",
            "domain": "example.com",
            "subdomain": "!",
            "path": "!",
            "query_policy": [],
            "downstream_url": "http://backend",
            "expires_at": 5,
            "created_at": 1,
            "updated_at": 2
        });
        let decoded: Rule = serde_json::from_value(legacy).unwrap();
        assert_eq!(decoded.subdomain, Selector::None);
        assert_eq!(decoded.query_policy, QueryPolicy::AllowNone);
        assert_eq!(decoded.target, "http://backend");
    }

    #[test]
    fn test_activity_is_strict() {
        let rule = Rule {
            id: String::new(),
            domain: "example.com".into(),
            subdomain: Selector::Any,
            path: Selector::Any,
            query_policy: QueryPolicy::AllowAll,
            target: String::new(),
            expires_at: 100,
            created_at: 0,
            updated_at: 0,
        };
        assert!(rule.is_active(99));
        assert!(!rule.is_active(100));
    }
}
