//! The forwarder: executes outbound requests against the single upstream.
//!
//! No retries. A failed call is classified once and returned to the request
//! boundary. Concurrency is unbounded unless `max_in_flight` is configured.

use std::time::Instant;

use axum::http::header;
use reqwest::Client;
use tokio::sync::Semaphore;
use url::Url;

use crate::config::{ObservabilityConfig, UpstreamConfig};
use crate::error::{ProxyError, ProxyResult};
use crate::http::request::OutboundRequest;
use crate::http::response::UpstreamResponse;
use crate::observability::metrics;
use crate::upstream::client::{build_client, ClientError};

/// Forwards requests to the configured upstream.
#[derive(Debug)]
pub struct Forwarder {
    client: Client,
    upstream: Url,
    link_url: Url,
    in_flight: Option<Semaphore>,
    dump_limit: Option<usize>,
}

impl Forwarder {
    /// Build a forwarder and its shared client from configuration.
    pub fn new(upstream: &UpstreamConfig, observability: &ObservabilityConfig) -> Result<Self, ClientError> {
        let client = build_client(upstream)?;
        Ok(Self {
            client,
            upstream: Url::parse(&upstream.base_url)?,
            link_url: upstream.link_target()?,
            in_flight: upstream.max_in_flight.map(Semaphore::new),
            dump_limit: observability
                .dump_payloads
                .then_some(observability.dump_limit_bytes),
        })
    }

    /// The upstream origin.
    pub fn upstream(&self) -> &Url {
        &self.upstream
    }

    /// The exact URL behind the `/link` route.
    pub fn link_url(&self) -> &Url {
        &self.link_url
    }

    /// Send `outbound` and read the complete response.
    pub async fn forward(&self, outbound: OutboundRequest) -> ProxyResult<UpstreamResponse> {
        let _permit = match &self.in_flight {
            Some(limit) => Some(limit.try_acquire().map_err(|_| {
                tracing::warn!(url = %outbound.url, "In-flight upstream limit reached");
                ProxyError::Overloaded
            })?),
            None => None,
        };

        tracing::info!(method = %outbound.method, url = %outbound.url, "Forwarding to upstream");
        let start = Instant::now();

        let mut request = self
            .client
            .request(outbound.method, outbound.url)
            .headers(outbound.headers.clone());
        if !outbound.body.is_empty() || outbound.headers.contains_key(header::CONTENT_LENGTH) {
            request = request.body(outbound.body);
        }

        let result = match request.send().await {
            Ok(response) => UpstreamResponse::read(response).await,
            Err(e) => Err(e),
        };
        metrics::record_upstream(start);
        let upstream = result.map_err(ProxyError::from_upstream)?;

        tracing::debug!(
            status = %upstream.status,
            bytes = upstream.body.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Upstream responded"
        );

        if let Some(limit) = self.dump_limit {
            let shown = upstream.body.len().min(limit);
            tracing::debug!(
                payload = ?upstream.body.slice(..shown),
                truncated = upstream.body.len() > shown,
                "Upstream payload"
            );
        }

        Ok(upstream)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Bytes;
    use axum::http::{HeaderMap, Method};

    fn forwarder(base_url: &str, max_in_flight: Option<usize>) -> Forwarder {
        let upstream = UpstreamConfig {
            base_url: base_url.to_string(),
            max_in_flight,
            ..UpstreamConfig::default()
        };
        Forwarder::new(&upstream, &ObservabilityConfig::default()).unwrap()
    }

    fn outbound(url: &str) -> OutboundRequest {
        OutboundRequest {
            method: Method::GET,
            url: Url::parse(url).unwrap(),
            headers: HeaderMap::new(),
            body: Bytes::new(),
        }
    }

    #[test]
    fn test_new_parses_targets() {
        let f = forwarder("https://upstream.test", None);
        assert_eq!(f.upstream().host_str(), Some("upstream.test"));
        assert_eq!(f.link_url().as_str(), "https://upstream.test/link");
    }

    #[tokio::test]
    async fn test_connection_refused_is_bad_gateway() {
        // Bind then drop to get a port nothing listens on.
        let addr = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap()
        };
        let f = forwarder(&format!("http://{}", addr), None);

        let err = f
            .forward(outbound(&format!("http://{}/anything", addr)))
            .await
            .unwrap_err();
        assert!(matches!(err, ProxyError::Upstream(_)));
        assert_eq!(err.status(), axum::http::StatusCode::BAD_GATEWAY);
    }

    #[tokio::test]
    async fn test_in_flight_limit_rejects_when_exhausted() {
        let f = forwarder("http://127.0.0.1:9", Some(1));
        let held = f.in_flight.as_ref().unwrap().try_acquire().unwrap();

        let err = f.forward(outbound("http://127.0.0.1:9/")).await.unwrap_err();
        assert!(matches!(err, ProxyError::Overloaded));
        drop(held);
    }

    /// Collects the names of histograms registered while installed.
    #[derive(Default)]
    struct HistogramNames(std::sync::Mutex<Vec<String>>);

    impl HistogramNames {
        fn take(&self) -> Vec<String> {
            std::mem::take(&mut *self.0.lock().unwrap())
        }
    }

    impl ::metrics::Recorder for HistogramNames {
        fn describe_counter(&self, _: ::metrics::KeyName, _: Option<::metrics::Unit>, _: ::metrics::SharedString) {}
        fn describe_gauge(&self, _: ::metrics::KeyName, _: Option<::metrics::Unit>, _: ::metrics::SharedString) {}
        fn describe_histogram(&self, _: ::metrics::KeyName, _: Option<::metrics::Unit>, _: ::metrics::SharedString) {}

        fn register_counter(&self, _: &::metrics::Key, _: &::metrics::Metadata<'_>) -> ::metrics::Counter {
            ::metrics::Counter::noop()
        }

        fn register_gauge(&self, _: &::metrics::Key, _: &::metrics::Metadata<'_>) -> ::metrics::Gauge {
            ::metrics::Gauge::noop()
        }

        fn register_histogram(&self, key: &::metrics::Key, _: &::metrics::Metadata<'_>) -> ::metrics::Histogram {
            self.0.lock().unwrap().push(key.name().to_string());
            ::metrics::Histogram::noop()
        }
    }

    #[tokio::test]
    async fn test_upstream_duration_only_recorded_for_sent_calls() {
        let recorder = HistogramNames::default();
        let _guard = ::metrics::set_default_local_recorder(&recorder);

        let limited = forwarder("http://127.0.0.1:9", Some(1));
        let held = limited.in_flight.as_ref().unwrap().try_acquire().unwrap();
        let _ = limited.forward(outbound("http://127.0.0.1:9/")).await;
        drop(held);
        assert!(recorder.take().is_empty(), "Rejected call never reached the upstream");

        let addr = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap()
        };
        let f = forwarder(&format!("http://{}", addr), None);
        let _ = f.forward(outbound(&format!("http://{}/", addr))).await;
        assert_eq!(recorder.take(), vec!["relay_upstream_duration_seconds".to_string()]);
    }
}
