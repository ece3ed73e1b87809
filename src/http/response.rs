//! Response handling and transformation.
//!
//! # Responsibilities
//! - Capture the upstream's response as an explicit `UpstreamResponse`
//! - Relay it to the caller byte-for-byte
//!
//! # Design Decisions
//! - Body is read as raw bytes, never decoded or transcoded
//! - Content-Type is exactly what the upstream declared (absent stays absent)
//! - Upstream status is propagated as-is
//! - Hop-by-hop headers stripped automatically

use axum::{
    body::{Body, Bytes},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};

use crate::security::headers::end_to_end;

/// What the upstream sent back.
#[derive(Debug, Clone, PartialEq)]
pub struct UpstreamResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub content_type: Option<HeaderValue>,
    pub body: Bytes,
}

impl UpstreamResponse {
    /// Read a client response to completion.
    pub async fn read(response: reqwest::Response) -> Result<Self, reqwest::Error> {
        let status = response.status();
        let headers = response.headers().clone();
        let body = response.bytes().await?;
        Ok(Self::new(status, headers, body))
    }

    pub fn new(status: StatusCode, headers: HeaderMap, body: Bytes) -> Self {
        let content_type = headers.get(header::CONTENT_TYPE).cloned();
        Self {
            status,
            headers,
            content_type,
            body,
        }
    }
}

impl IntoResponse for UpstreamResponse {
    fn into_response(self) -> Response {
        let mut headers = end_to_end(&self.headers);
        headers.remove(header::CONTENT_TYPE);
        if let Some(content_type) = self.content_type {
            headers.insert(header::CONTENT_TYPE, content_type);
        }

        let mut response = Response::new(Body::from(self.body));
        *response.status_mut() = self.status;
        *response.headers_mut() = headers;
        response
    }
}
