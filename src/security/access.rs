//! Shared-secret access gate.
//!
//! Authorizes a request by comparing a caller-supplied credential with the
//! configured secret. The credential is read from a query parameter first and
//! from a header second. A missing credential fails exactly like a wrong one.

use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{header::InvalidHeaderName, HeaderMap, HeaderName, Uri},
    middleware::Next,
    response::Response,
};

use crate::config::AccessConfig;
use crate::error::ProxyError;

/// Request extension inserted once the gate has passed a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Authorized;

/// Where a credential may appear on a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CredentialSlot {
    pub query_param: String,
    pub header: HeaderName,
}

/// Stateless shared-secret check.
#[derive(Clone)]
pub struct AccessGate {
    secret: Option<Arc<str>>,
    slot: CredentialSlot,
}

impl fmt::Debug for AccessGate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessGate")
            .field("secret", &self.secret.as_ref().map(|_| "<redacted>"))
            .field("slot", &self.slot)
            .finish()
    }
}

impl AccessGate {
    /// Create a gate. An empty secret is treated as no secret (deny all).
    pub fn new(secret: Option<String>, slot: CredentialSlot) -> Self {
        let secret = secret.filter(|s| !s.is_empty()).map(Arc::from);
        Self { secret, slot }
    }

    pub fn from_config(config: &AccessConfig) -> Result<Self, InvalidHeaderName> {
        let slot = CredentialSlot {
            query_param: config.query_param.clone(),
            header: HeaderName::from_bytes(config.header.as_bytes())?,
        };
        Ok(Self::new(config.api_key.clone(), slot))
    }

    pub fn slot(&self) -> &CredentialSlot {
        &self.slot
    }

    /// Extract the credential supplied with a request, if any.
    pub fn credential<'a>(&self, uri: &'a Uri, headers: &'a HeaderMap) -> Option<Cow<'a, str>> {
        let from_query = uri.query().and_then(|query| {
            url::form_urlencoded::parse(query.as_bytes())
                .find(|(key, _)| key == self.slot.query_param.as_str())
                .map(|(_, value)| value)
        });

        from_query.or_else(|| {
            headers
                .get(&self.slot.header)
                .and_then(|v| v.to_str().ok())
                .map(Cow::Borrowed)
        })
    }

    /// Decide whether a request may proceed.
    pub fn check(&self, uri: &Uri, headers: &HeaderMap) -> Result<(), ProxyError> {
        let (Some(secret), Some(supplied)) = (&self.secret, self.credential(uri, headers)) else {
            return Err(ProxyError::Unauthorized);
        };

        if constant_time_eq(supplied.as_bytes(), secret.as_bytes()) {
            Ok(())
        } else {
            Err(ProxyError::Unauthorized)
        }
    }
}

/// Constant-time byte comparison to prevent timing side-channel attacks.
pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut diff = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        diff |= x ^ y;
    }
    diff == 0
}

/// Middleware rejecting requests that fail the gate before any handler runs.
pub async fn require_credential(
    State(gate): State<AccessGate>,
    mut request: Request,
    next: Next,
) -> Result<Response, ProxyError> {
    gate.check(request.uri(), request.headers())?;

    request.extensions_mut().insert(Authorized);
    Ok(next.run(request).await)
}
