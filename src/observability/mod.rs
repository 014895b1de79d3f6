//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Relay and server produce:
//!     → logging.rs (structured log events)
//!     → metrics.rs (counters, histograms)
//!
//! Consumers:
//!     → Log aggregation (stdout)
//!     → Metrics endpoint (Prometheus scrape)
//! ```
//!
//! # Design Decisions
//! - Request ID flows into every relay log event
//! - Side-call failures are warnings, never errors surfaced to clients

pub mod logging;
pub mod metrics;
