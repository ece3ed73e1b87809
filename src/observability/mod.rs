//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Handlers and forwarder produce:
//!     → logging.rs (structured log events, outbound URLs)
//!     → metrics.rs (counters, histograms)
//!
//! Consumers:
//!     → stdout
//!     → Metrics endpoint (Prometheus scrape, optional)
//! ```
//!
//! # Design Decisions
//! - Request ID (`x-request-id`) is attached to every request span
//! - Payload dumps are opt-in debug output

pub mod logging;
pub mod metrics;
