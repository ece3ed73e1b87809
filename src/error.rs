//! Request-boundary error taxonomy.
//!
//! Every failure in the forwarding pipeline ends up here and is rendered as
//! `{"error": "<message>"}` with the variant's status code. Nothing is retried.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Errors surfaced to the caller.
#[derive(Debug, thiserror::Error)]
pub enum ProxyError {
    /// Credential missing or wrong.
    #[error("Unauthorized")]
    Unauthorized,

    /// Upstream call exceeded the configured timeout.
    #[error("Upstream timed out")]
    UpstreamTimeout,

    /// Upstream call could not be completed (connect, DNS, reset, malformed response).
    #[error("Upstream request failed")]
    Upstream(#[source] reqwest::Error),

    /// In-flight upstream call limit reached.
    #[error("Too many upstream requests in flight")]
    Overloaded,

    /// Inbound body exceeded the configured limit.
    #[error("Request body exceeds {0} bytes")]
    BodyTooLarge(usize),

    /// Inbound body could not be read.
    #[error("Failed to read request body")]
    BodyRead(#[source] axum::Error),

    /// The outbound URL could not be built from the inbound request.
    #[error("Invalid upstream target: {0}")]
    InvalidTarget(String),
}

pub type ProxyResult<T> = Result<T, ProxyError>;

impl ProxyError {
    pub fn status(&self) -> StatusCode {
        match self {
            ProxyError::Unauthorized => StatusCode::UNAUTHORIZED,
            ProxyError::UpstreamTimeout => StatusCode::GATEWAY_TIMEOUT,
            ProxyError::Upstream(_) => StatusCode::BAD_GATEWAY,
            ProxyError::Overloaded => StatusCode::SERVICE_UNAVAILABLE,
            ProxyError::BodyTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            ProxyError::BodyRead(_) => StatusCode::BAD_REQUEST,
            ProxyError::InvalidTarget(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Classify a client error, separating timeouts from other failures.
    pub fn from_upstream(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ProxyError::UpstreamTimeout
        } else {
            ProxyError::Upstream(err)
        }
    }
}

/// Marker placed in the extensions of error responses so the boundary
/// logger can report them without re-parsing the body.
#[derive(Debug, Clone)]
pub struct ErrorReport {
    pub status: StatusCode,
    pub message: String,
    pub detail: Option<String>,
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    error: &'a str,
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = self.to_string();
        let detail = std::error::Error::source(&self).map(ToString::to_string);

        let mut response = (status, Json(ErrorBody { error: &message })).into_response();
        response.extensions_mut().insert(ErrorReport {
            status,
            message,
            detail,
        });
        response
    }
}
