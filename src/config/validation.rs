//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check the upstream and link URLs are usable absolute http(s) URLs
//!   on one origin
//! - Validate value ranges (timeouts > 0, limits > 0, addresses parse)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ProxyConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use axum::http::HeaderName;
use url::Url;

use crate::config::schema::ProxyConfig;

/// A single semantic problem with a configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{field}: {message}")]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

/// Validate a configuration, collecting every problem found.
pub fn validate_config(config: &ProxyConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "listener.bind_address",
            format!("'{}' is not a socket address", config.listener.bind_address),
        ));
    }

    let base = match parse_http_url(&config.upstream.base_url) {
        Ok(url) => {
            if url.path() != "/" || url.query().is_some() {
                errors.push(ValidationError::new(
                    "upstream.base_url",
                    "must be scheme and host only (no path or query)",
                ));
            }
            Some(url)
        }
        Err(message) => {
            errors.push(ValidationError::new("upstream.base_url", message));
            None
        }
    };

    if let Some(link_url) = &config.upstream.link_url {
        match parse_http_url(link_url) {
            Ok(link) => {
                if base.as_ref().is_some_and(|base| base.origin() != link.origin()) {
                    errors.push(ValidationError::new(
                        "upstream.link_url",
                        format!("'{}' is not on the upstream origin", link_url),
                    ));
                }
            }
            Err(message) => errors.push(ValidationError::new("upstream.link_url", message)),
        }
    }

    if config.upstream.timeout_secs == Some(0) {
        errors.push(ValidationError::new("upstream.timeout_secs", "must be greater than 0"));
    }
    if config.upstream.connect_timeout_secs == Some(0) {
        errors.push(ValidationError::new(
            "upstream.connect_timeout_secs",
            "must be greater than 0",
        ));
    }
    if config.upstream.max_in_flight == Some(0) {
        errors.push(ValidationError::new("upstream.max_in_flight", "must be greater than 0"));
    }

    if config.access.query_param.is_empty() {
        errors.push(ValidationError::new("access.query_param", "must not be empty"));
    }
    if HeaderName::from_bytes(config.access.header.as_bytes()).is_err() {
        errors.push(ValidationError::new(
            "access.header",
            format!("'{}' is not a valid header name", config.access.header),
        ));
    }

    if config.limits.max_body_bytes == 0 {
        errors.push(ValidationError::new("limits.max_body_bytes", "must be greater than 0"));
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::new(
            "observability.metrics_address",
            format!(
                "'{}' is not a socket address",
                config.observability.metrics_address
            ),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn parse_http_url(raw: &str) -> Result<Url, String> {
    let url = Url::parse(raw).map_err(|e| format!("'{}' is not a valid URL: {}", raw, e))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(format!("'{}' must use http or https", raw));
    }
    if url.host_str().is_none() {
        return Err(format!("'{}' has no host", raw));
    }
    Ok(url)
}
