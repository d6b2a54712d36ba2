//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request (domain, subdomain, path, query keys)
//!     → router.rs (fetch active rules for the domain)
//!     → matcher.rs (score each candidate, drop exclusions)
//!     → Return: best Rule or no-match
//! ```
//!
//! # Design Decisions
//! - Rules are read fresh from the store on every resolution
//! - Highest specificity wins, not first match
//! - Deterministic: same rules and request always pick the same rule

pub mod matcher;
pub mod router;

pub use matcher::{MatchEngine, RouteRequest, ScoredRule};
pub use router::Resolver;
