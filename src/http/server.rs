//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with the forwarding routes
//! - Wire up middleware (request ID, tracing, access gate, error reporting)
//! - Add hardened response headers in production
//! - Bind server to listener and stop on shutdown

use std::io;
use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::header::InvalidHeaderName,
    middleware::{self, Next},
    response::Response,
    routing::{any, get},
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    set_header::SetResponseHeaderLayer,
    trace::TraceLayer,
};

use crate::config::{Environment, ProxyConfig};
use crate::error::ErrorReport;
use crate::http::handlers;
use crate::http::request::InboundRequest;
use crate::lifecycle::shutdown;
use crate::security::headers::hardened_response_headers;
use crate::security::{require_credential, AccessGate, CredentialSlot};
use crate::upstream::{ClientError, Forwarder};

/// Error type for server construction.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error(transparent)]
    Client(#[from] ClientError),
    #[error("invalid access header: {0}")]
    AccessHeader(#[from] InvalidHeaderName),
}

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ProxyConfig>,
    pub forwarder: Arc<Forwarder>,
    pub gate: AccessGate,
}

impl AppState {
    pub fn new(config: ProxyConfig) -> Result<Self, ServerError> {
        let forwarder = Forwarder::new(&config.upstream, &config.observability)?;
        let gate = AccessGate::from_config(&config.access)?;
        Ok(Self {
            config: Arc::new(config),
            forwarder: Arc::new(forwarder),
            gate,
        })
    }

    /// Credential slot to strip from `inbound`, if it passed the gate.
    pub fn strip_slot(&self, inbound: &InboundRequest) -> Option<&CredentialSlot> {
        (inbound.authorized && self.config.access.strip_credential).then(|| self.gate.slot())
    }
}

/// HTTP server for the relay proxy.
pub struct HttpServer {
    router: Router,
    config: Arc<ProxyConfig>,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration.
    pub fn new(config: ProxyConfig) -> Result<Self, ServerError> {
        let state = AppState::new(config)?;
        let config = state.config.clone();
        let router = Self::build_router(state);
        Ok(Self { router, config })
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(state: AppState) -> Router {
        let gate = middleware::from_fn_with_state(state.gate.clone(), require_credential);
        let access = &state.config.access;

        // Unmatched paths, and methods the named routes don't serve.
        let mut fallback = any(handlers::fallback);
        if access.gate_fallback {
            fallback = fallback.layer(gate.clone());
        }
        let fallback = fallback.with_state::<()>(state.clone());

        let mut link = get(handlers::link);
        if access.gate_link {
            link = link.route_layer(gate.clone());
        }
        let display = get(handlers::display).route_layer(gate);

        let mut router = Router::new()
            .route("/link", link.fallback_service(fallback.clone()))
            .route("/display/uuid/{uuid}", display.fallback_service(fallback.clone()))
            .fallback_service(fallback)
            .with_state(state.clone())
            .layer(middleware::from_fn_with_state(
                state.config.environment,
                report_errors,
            ));

        if state.config.environment == Environment::Production {
            for (name, value) in hardened_response_headers() {
                router = router.layer(SetResponseHeaderLayer::if_not_present(name, value));
            }
        }

        router
            .layer(TraceLayer::new_for_http().make_span_with(|request: &Request| {
                let request_id = request
                    .headers()
                    .get("x-request-id")
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or("-");
                tracing::info_span!(
                    "request",
                    method = %request.method(),
                    path = %request.uri().path(),
                    request_id = %request_id,
                )
            }))
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
    }

    /// The fully layered router, for driving the app without a socket.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &ProxyConfig {
        &self.config
    }

    /// Run the server until `shutdown` fires, then drain in-flight requests.
    pub async fn run(self, listener: TcpListener, shutdown: broadcast::Receiver<()>) -> io::Result<()> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            upstream = %self.config.upstream.base_url,
            environment = self.config.environment.as_str(),
            gate_link = self.config.access.gate_link,
            gate_fallback = self.config.access.gate_fallback,
            "HTTP server starting"
        );

        axum::serve(listener, self.router)
            .with_graceful_shutdown(shutdown::wait(shutdown))
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Log every error response at the request boundary (silent in test mode).
async fn report_errors(
    State(environment): State<Environment>,
    request: Request,
    next: Next,
) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_owned();

    let response = next.run(request).await;

    if environment != Environment::Test {
        if let Some(report) = response.extensions().get::<ErrorReport>() {
            if report.status.is_server_error() {
                tracing::error!(
                    method = %method,
                    path = %path,
                    status = %report.status,
                    detail = ?report.detail,
                    "{}",
                    report.message
                );
            } else {
                tracing::warn!(
                    method = %method,
                    path = %path,
                    status = %report.status,
                    "{}",
                    report.message
                );
            }
        }
    }

    response
}
