//! Rule lifecycle subsystem.
//!
//! # Data Flow
//! ```text
//! Expiry (guard.rs):
//!     prune(now) → RuleStore::delete_expired(now) → removed count
//!
//! Scheduling (scheduler.rs):
//!     interval tick → prune(clock::now()) ... until shutdown
//!
//! Shutdown (shutdown.rs):
//!     Ctrl+C → broadcast → HTTP server drains, scheduler exits
//! ```
//!
//! # Design Decisions
//! - A rule is active iff `expires_at > now`, checked on every read
//! - Pruning only ever removes inactive rules
//! - On-demand prune (REST, CLI) and scheduled prune share one code path

pub mod clock;
pub mod guard;
pub mod scheduler;
pub mod shutdown;

pub use guard::LifecycleGuard;
pub use scheduler::PruneScheduler;
pub use shutdown::Shutdown;
