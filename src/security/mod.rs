//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request (gated routes):
//!     → access.rs (shared-secret check, short-circuits with 401)
//!     → Pass to forwarder
//!
//! Forwarding in both directions:
//!     → headers.rs (strip hop-by-hop headers)
//!
//! Outgoing response (production):
//!     → headers.rs (hardened response headers)
//! ```
//!
//! # Design Decisions
//! - Fail closed: no configured secret means every gated request is denied
//! - Credentials compared in constant time

pub mod access;
pub mod headers;

pub use access::{require_credential, AccessGate, Authorized, CredentialSlot};
