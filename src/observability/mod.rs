//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Rule service, resolver, lifecycle, HTTP layer produce:
//!     → logging.rs (structured tracing events)
//!     → metrics.rs (counters, gauges, histograms)
//!
//! Consumers:
//!     → stdout (pretty or JSON)
//!     → Prometheus scrape endpoint
//! ```
//!
//! # Design Decisions
//! - Request ID (`x-request-id`) is attached to every HTTP span
//! - Metrics are cheap (atomic increments) and optional

pub mod logging;
pub mod metrics;
