//! Upstream subsystem.
//!
//! # Data Flow
//! ```text
//! OutboundRequest
//!     → forwarder.rs (in-flight limit, logging, classify failures)
//!     → client.rs (shared reqwest client, explicit TLS trust policy)
//!     → Upstream origin
//!     → UpstreamResponse (raw bytes, status, headers)
//! ```
//!
//! # Design Decisions
//! - Single upstream, single hop, no retries
//! - Certificate validation is a named policy, never a silent default

pub mod client;
pub mod forwarder;

pub use client::{build_client, ClientError};
pub use forwarder::Forwarder;
