//! Outbound HTTP client construction.
//!
//! One client is built at startup and shared read-only by every request.
//! The TLS trust policy is explicit so it shows up in config and logs.

use std::path::PathBuf;
use std::time::Duration;

use reqwest::{redirect, Certificate, Client};

use crate::config::{TrustPolicy, UpstreamConfig};

/// Error type for client construction.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("failed to read CA certificate {path:?}: {source}")]
    CaRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid CA certificate {path:?}: {source}")]
    CaParse {
        path: PathBuf,
        #[source]
        source: reqwest::Error,
    },
    #[error("invalid upstream URL: {0}")]
    Url(#[from] url::ParseError),
    #[error("failed to build upstream client: {0}")]
    Build(#[from] reqwest::Error),
}

/// Build the shared upstream client.
///
/// Redirects are relayed to the caller rather than followed, and system
/// proxies are ignored: the upstream is always reached in a single hop.
pub fn build_client(config: &UpstreamConfig) -> Result<Client, ClientError> {
    let mut builder = Client::builder()
        .no_proxy()
        .redirect(redirect::Policy::none());

    builder = match &config.trust {
        TrustPolicy::Verify => builder,
        TrustPolicy::Insecure => {
            tracing::warn!(
                upstream = %config.base_url,
                "Upstream TLS certificate validation is disabled (trust mode: insecure)"
            );
            builder.danger_accept_invalid_certs(true)
        }
        TrustPolicy::Pinned { ca_cert_path } => {
            let pem = std::fs::read(ca_cert_path).map_err(|source| ClientError::CaRead {
                path: ca_cert_path.clone(),
                source,
            })?;
            let cert = Certificate::from_pem(&pem).map_err(|source| ClientError::CaParse {
                path: ca_cert_path.clone(),
                source,
            })?;
            tracing::info!(ca = ?ca_cert_path, "Upstream TLS pinned to CA certificate");
            builder
                .tls_built_in_root_certs(false)
                .add_root_certificate(cert)
        }
    };

    if let Some(secs) = config.timeout_secs {
        builder = builder.timeout(Duration::from_secs(secs));
    }
    if let Some(secs) = config.connect_timeout_secs {
        builder = builder.connect_timeout(Duration::from_secs(secs));
    }

    Ok(builder.build()?)
}
