//! Request handling and transformation.
//!
//! # Responsibilities
//! - Buffer the inbound request into an `InboundRequest` (size-limited)
//! - Derive the `OutboundRequest` sent to the upstream
//!
//! # Design Decisions
//! - Derivation is a pure function of the inbound request and the target
//! - Only the authority changes; method, path, query, headers and body are kept
//! - `Host` and hop-by-hop headers are dropped, the client sets them per hop
//! - A credential is only stripped from requests that passed the access gate

use axum::{
    body::{Body, Bytes},
    extract::Request,
    http::{header, HeaderMap, Method, Uri},
};
use http_body_util::{BodyExt, LengthLimitError, Limited};
use url::Url;

use crate::error::{ProxyError, ProxyResult};
use crate::security::headers::end_to_end;
use crate::security::{Authorized, CredentialSlot};

/// A fully buffered request as received from the caller.
#[derive(Debug, Clone, PartialEq)]
pub struct InboundRequest {
    pub method: Method,
    pub uri: Uri,
    pub headers: HeaderMap,
    pub body: Bytes,
    /// Set when the access gate passed this request.
    pub authorized: bool,
}

impl InboundRequest {
    /// Buffer an axum request, rejecting bodies larger than `limit` bytes.
    pub async fn read(request: Request, limit: usize) -> ProxyResult<Self> {
        let (parts, body) = request.into_parts();

        let declared = parts
            .headers
            .get(header::CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<usize>().ok());
        if declared.is_some_and(|len| len > limit) {
            return Err(ProxyError::BodyTooLarge(limit));
        }

        let body = collect_body(body, limit).await?;

        Ok(Self {
            authorized: parts.extensions.get::<Authorized>().is_some(),
            method: parts.method,
            uri: parts.uri,
            headers: parts.headers,
            body,
        })
    }

    /// Origin-form path and query, e.g. `/anything/path?x=1`.
    pub fn path_and_query(&self) -> &str {
        self.uri
            .path_and_query()
            .map(|pq| pq.as_str())
            .unwrap_or("/")
    }
}

async fn collect_body(body: Body, limit: usize) -> ProxyResult<Bytes> {
    match Limited::new(body, limit).collect().await {
        Ok(collected) => Ok(collected.to_bytes()),
        Err(e) if e.downcast_ref::<LengthLimitError>().is_some() => {
            Err(ProxyError::BodyTooLarge(limit))
        }
        Err(e) => Err(ProxyError::BodyRead(axum::Error::new(e))),
    }
}

/// The request actually sent to the upstream.
#[derive(Debug, Clone, PartialEq)]
pub struct OutboundRequest {
    pub method: Method,
    pub url: Url,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl OutboundRequest {
    /// Re-target `inbound` at `upstream`, keeping path, query, method, headers and body.
    ///
    /// `strip` names the credential slot to remove; pass `None` to forward
    /// the request exactly as received.
    pub fn derive(
        inbound: &InboundRequest,
        upstream: &Url,
        strip: Option<&CredentialSlot>,
    ) -> ProxyResult<Self> {
        let path = inbound.uri.path();
        let query = match (inbound.uri.query(), strip) {
            (Some(query), Some(slot)) => remove_query_param(query, &slot.query_param),
            (query, _) => query.map(str::to_owned),
        };

        let origin = upstream.as_str().trim_end_matches('/');
        let raw = match query {
            Some(query) => format!("{}{}?{}", origin, path, query),
            None => format!("{}{}", origin, path),
        };
        let url = Url::parse(&raw).map_err(|e| ProxyError::InvalidTarget(format!("{}: {}", raw, e)))?;

        Ok(Self {
            method: inbound.method.clone(),
            url,
            headers: forward_headers(&inbound.headers, strip),
            body: inbound.body.clone(),
        })
    }

    /// Send `inbound` to an exact URL, ignoring its path and query.
    pub fn to_fixed_url(inbound: &InboundRequest, target: &Url, strip: Option<&CredentialSlot>) -> Self {
        Self {
            method: inbound.method.clone(),
            url: target.clone(),
            headers: forward_headers(&inbound.headers, strip),
            body: inbound.body.clone(),
        }
    }
}

fn forward_headers(headers: &HeaderMap, strip: Option<&CredentialSlot>) -> HeaderMap {
    let mut out = end_to_end(headers);
    out.remove(header::HOST);
    if let Some(slot) = strip {
        out.remove(&slot.header);
    }
    out
}

/// Drop every `name=...` pair from a raw query string, leaving the rest byte-for-byte.
fn remove_query_param(query: &str, name: &str) -> Option<String> {
    let kept: Vec<&str> = query
        .split('&')
        .filter(|pair| {
            let key = pair.split_once('=').map_or(*pair, |(k, _)| k);
            let decoded: String = url::form_urlencoded::parse(key.as_bytes())
                .map(|(k, _)| k.into_owned())
                .collect();
            decoded != name
        })
        .collect();

    if kept.iter().all(|pair| pair.is_empty()) {
        None
    } else {
        Some(kept.join("&"))
    }
}
