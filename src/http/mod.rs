//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, request ID, tracing, error reporting)
//!     → security::access (gated routes only)
//!     → handlers.rs (pick target for the route)
//!     → request.rs (InboundRequest → OutboundRequest)
//!     → upstream::Forwarder
//!     → response.rs (UpstreamResponse → caller)
//! ```

pub mod handlers;
pub mod request;
pub mod response;
pub mod server;

pub use request::{InboundRequest, OutboundRequest};
pub use response::UpstreamResponse;
pub use server::{AppState, HttpServer, ServerError};
