//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the proxy.
//! All types derive Serde traits for deserialization from config files.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use url::Url;

/// Root configuration for the relay proxy.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(default)]
pub struct ProxyConfig {
    /// Deployment mode (development, production, test).
    pub environment: Environment,

    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// The single upstream origin and how to reach it.
    pub upstream: UpstreamConfig,

    /// Shared-secret access gate.
    pub access: AccessConfig,

    /// Request size limits.
    pub limits: LimitsConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Deployment mode.
///
/// Development turns on per-request trace logging, production turns on
/// hardened response headers, test silences error logging.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Production,
    Test,
}

impl Environment {
    /// Parse a mode name, accepting the common short forms.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "development" | "dev" => Some(Environment::Development),
            "production" | "prod" => Some(Environment::Production),
            "test" => Some(Environment::Test),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Development => "development",
            Environment::Production => "production",
            Environment::Test => "test",
        }
    }
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
        }
    }
}

/// How the outbound client treats the upstream's TLS certificate.
///
/// `Insecure` skips chain validation entirely. It is the default because the
/// upstream's certificate cannot be verified in the deployment environment.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq, Eq)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum TrustPolicy {
    /// Standard validation against the built-in root store.
    Verify,
    /// No certificate validation at all.
    #[default]
    Insecure,
    /// Trust only the CA certificate (PEM) at the given path.
    Pinned { ca_cert_path: PathBuf },
}

/// Upstream origin configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct UpstreamConfig {
    /// Scheme and host every forwarded request is sent to.
    pub base_url: String,

    /// Absolute URL served by the fixed `/link` route. Defaults to `/link`
    /// on `base_url`; when set it must share that origin.
    pub link_url: Option<String>,

    /// TLS trust policy for the outbound client.
    pub trust: TrustPolicy,

    /// Total timeout for an upstream call. `None` waits indefinitely.
    pub timeout_secs: Option<u64>,

    /// Connect timeout for an upstream call. `None` uses the OS default.
    pub connect_timeout_secs: Option<u64>,

    /// Maximum concurrent upstream calls. `None` is unbounded.
    pub max_in_flight: Option<usize>,
}

impl UpstreamConfig {
    /// The resolved target of the `/link` route.
    pub fn link_target(&self) -> Result<Url, url::ParseError> {
        match &self.link_url {
            Some(link) => Url::parse(link),
            None => Url::parse(&self.base_url)?.join("/link"),
        }
    }
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            base_url: "https://dakboard.com".to_string(),
            link_url: None,
            trust: TrustPolicy::Insecure,
            timeout_secs: None,
            connect_timeout_secs: None,
            max_in_flight: None,
        }
    }
}

/// Shared-secret access gate configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct AccessConfig {
    /// The shared secret. When unset every gated request is denied.
    pub api_key: Option<String>,

    /// Query parameter carrying the credential.
    pub query_param: String,

    /// Header carrying the credential (checked when the query parameter is absent).
    pub header: String,

    /// Gate the fixed `/link` route.
    pub gate_link: bool,

    /// Gate the catch-all route, including non-GET methods on the named paths.
    pub gate_fallback: bool,

    /// Remove the credential from requests that passed the gate before forwarding.
    pub strip_credential: bool,
}

impl Default for AccessConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            query_param: "api_key".to_string(),
            header: "x-api-key".to_string(),
            gate_link: true,
            gate_fallback: false,
            strip_credential: true,
        }
    }
}

/// Request size limits.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct LimitsConfig {
    /// Maximum inbound body size buffered for forwarding, in bytes.
    pub max_body_bytes: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_body_bytes: 10 * 1024 * 1024, // 10MB
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Log a debug dump of every upstream response payload.
    pub dump_payloads: bool,

    /// Maximum number of payload bytes included in a dump.
    pub dump_limit_bytes: usize,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            dump_payloads: false,
            dump_limit_bytes: 512,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_point_at_upstream_insecurely() {
        let config = ProxyConfig::default();
        assert_eq!(config.upstream.base_url, "https://dakboard.com");
        assert_eq!(config.upstream.trust, TrustPolicy::Insecure);
        assert_eq!(config.upstream.timeout_secs, None);
        assert_eq!(config.access.query_param, "api_key");
        assert!(config.access.gate_link);
        assert!(!config.access.gate_fallback);
        assert_eq!(
            config.upstream.link_target().unwrap().as_str(),
            "https://dakboard.com/link"
        );
        assert_eq!(config.environment, Environment::Development);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config: ProxyConfig = toml::from_str(
            r#"
            environment = "production"

            [upstream]
            base_url = "https://example.org"
            max_in_flight = 64

            [upstream.trust]
            mode = "pinned"
            ca_cert_path = "/etc/relay/ca.pem"

            [access]
            api_key = "s3cret"
            "#,
        )
        .unwrap();

        assert_eq!(config.environment, Environment::Production);
        assert_eq!(config.upstream.base_url, "https://example.org");
        assert_eq!(config.upstream.link_url, None);
        assert_eq!(
            config.upstream.link_target().unwrap().as_str(),
            "https://example.org/link"
        );
        assert_eq!(config.upstream.max_in_flight, Some(64));
        assert_eq!(
            config.upstream.trust,
            TrustPolicy::Pinned {
                ca_cert_path: PathBuf::from("/etc/relay/ca.pem")
            }
        );
        assert_eq!(config.access.api_key.as_deref(), Some("s3cret"));
        assert!(config.access.strip_credential);
        assert_eq!(config.listener.bind_address, "0.0.0.0:8080");
    }

    #[test]
    fn test_environment_parse() {
        assert_eq!(Environment::parse("dev"), Some(Environment::Development));
        assert_eq!(Environment::parse(" Production "), Some(Environment::Production));
        assert_eq!(Environment::parse("test"), Some(Environment::Test));
        assert_eq!(Environment::parse("staging"), None);
    }
}
