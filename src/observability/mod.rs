//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! parser / serializer / harness produce:
//!     → tracing events (structured fields: operation, kind, outcome)
//!     → metrics.rs (counters)
//!
//! Consumers:
//!     → logging.rs subscriber (stderr, leaving stdout to the report)
//!     → Prometheus scrape endpoint (optional)
//! ```
//!
//! # Design Decisions
//! - Structured logging with operation names as fields
//! - Metrics are cheap (atomic increments)

pub mod logging;
pub mod metrics;
