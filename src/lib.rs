//! Rule router library.
//!
//! Resolves a request's domain, subdomain, path and query-parameter keys to
//! a downstream target by scoring stored, expiring routing rules.

pub mod config;
pub mod error;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod routing;
pub mod rules;
pub mod store;

pub use config::RouterConfig;
pub use error::{RouterError, RouterResult};
pub use http::HttpServer;
pub use lifecycle::{LifecycleGuard, PruneScheduler, Shutdown};
pub use routing::{MatchEngine, Resolver, RouteRequest};
pub use rules::{NewRule, QueryPolicy, Rule, RulePatch, RuleService, Selector, Timestamp};
pub use store::{MemoryRuleStore, RuleStore, StoreError};
