//! Route handlers.
//!
//! Each handler buffers the inbound request, derives the outbound request for
//! its route and hands it to the forwarder. The forwarder's result is the
//! response; there is no local recovery.

use std::time::Instant;

use axum::{
    extract::{Path, Request, State},
    response::{IntoResponse, Response},
};

use crate::error::ProxyResult;
use crate::http::request::{InboundRequest, OutboundRequest};
use crate::http::server::AppState;
use crate::observability::metrics;

/// `GET /link`: always forwarded to the configured link URL.
pub async fn link(State(state): State<AppState>, request: Request) -> ProxyResult<Response> {
    let inbound = InboundRequest::read(request, state.config.limits.max_body_bytes).await?;
    let outbound =
        OutboundRequest::to_fixed_url(&inbound, state.forwarder.link_url(), state.strip_slot(&inbound));
    relay(&state, "link", outbound).await
}

/// `GET /display/uuid/{uuid}`: forwarded with its full path and query.
pub async fn display(
    State(state): State<AppState>,
    Path(uuid): Path<String>,
    request: Request,
) -> ProxyResult<Response> {
    tracing::debug!(uuid = %uuid, "Display request");
    let inbound = InboundRequest::read(request, state.config.limits.max_body_bytes).await?;
    let outbound =
        OutboundRequest::derive(&inbound, state.forwarder.upstream(), state.strip_slot(&inbound))?;
    relay(&state, "display", outbound).await
}

/// Catch-all: any method, any unmatched path.
pub async fn fallback(State(state): State<AppState>, request: Request) -> ProxyResult<Response> {
    let inbound = InboundRequest::read(request, state.config.limits.max_body_bytes).await?;
    let outbound =
        OutboundRequest::derive(&inbound, state.forwarder.upstream(), state.strip_slot(&inbound))?;
    relay(&state, "fallback", outbound).await
}

async fn relay(state: &AppState, route: &'static str, outbound: OutboundRequest) -> ProxyResult<Response> {
    let start = Instant::now();
    let method = outbound.method.clone();

    let result = state.forwarder.forward(outbound).await;

    let status = match &result {
        Ok(upstream) => upstream.status,
        Err(e) => e.status(),
    };
    metrics::record_request(route, method.as_str(), status.as_u16(), start);

    result.map(IntoResponse::into_response)
}
