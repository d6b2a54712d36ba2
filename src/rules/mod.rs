//! Rule model, identifiers and management.
//!
//! # Data Flow
//! ```text
//! create(NewRule)
//!     → types.rs (parse selectors, query policy)
//!     → codec.rs (derive canonical id)
//!     → store insert (uniqueness on id)
//!
//! update(id, RulePatch) → store update (target / expires_at only)
//! delete(id)            → store delete
//! ```

pub mod codec;
pub mod service;
pub mod types;

pub use codec::encode;
pub use service::RuleService;
pub use types::{NewRule, QueryPolicy, Rule, RulePatch, Selector, Timestamp};
