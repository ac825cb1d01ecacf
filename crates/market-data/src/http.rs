//! Shared HTTP layer for upstream providers
//!
//! Every adapter goes through [`UpstreamClient`], so timeouts and retries
//! behave the same for quotes and chains: a bounded number of retries with
//! exponential backoff, and only for throttling or transient server errors.

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

use crate::error::MarketDataError;
use crate::Result;

/// Retry schedule for upstream calls
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryPolicy {
    pub max_retries: u32,
    /// Sleep before retry `n` (1-based) is `backoff_factor * 2^(n-1)` seconds
    pub backoff_factor: f64,
    pub status_forcelist: Vec<u16>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            backoff_factor: 1.0,
            status_forcelist: vec![429, 500, 502, 503, 504],
        }
    }
}

impl RetryPolicy {
    pub fn should_retry(&self, status: StatusCode) -> bool {
        self.status_forcelist.contains(&status.as_u16())
    }

    pub fn backoff(&self, retry: u32) -> Duration {
        let exp = retry.saturating_sub(1).min(16);
        Duration::from_secs_f64((self.backoff_factor * f64::from(1u32 << exp)).max(0.0))
    }
}

/// Connection settings for one provider
#[derive(Debug, Clone)]
pub struct UpstreamConfig {
    /// Provider name for logs and metrics
    pub name: String,
    pub base_url: String,
    pub token: Option<String>,
    pub timeout: Duration,
    pub retry: RetryPolicy,
}

impl UpstreamConfig {
    pub fn new(name: impl Into<String>, base_url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            name: name.into(),
            base_url: base_url.into().trim_end_matches('/').to_owned(),
            token: None,
            timeout,
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_token(mut self, token: Option<String>) -> Self {
        self.token = token.filter(|t| !t.is_empty());
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }
}

/// reqwest client with per-request timeout and retry/backoff
#[derive(Debug, Clone)]
pub struct UpstreamClient {
    http: reqwest::Client,
    config: UpstreamConfig,
}

impl UpstreamClient {
    pub fn new(config: UpstreamConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| MarketDataError::Config(e.to_string()))?;
        Ok(Self { http, config })
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    pub fn token(&self) -> Option<&str> {
        self.config.token.as_deref()
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}/{}", self.config.base_url, path.trim_start_matches('/'))
    }

    /// GET `path` and decode the JSON body, retrying per the policy
    pub async fn get_json<R: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
        headers: &[(&'static str, String)],
    ) -> Result<R> {
        let url = self.url(path);
        let header_map = build_headers(headers)?;
        let mut retry = 0u32;

        loop {
            debug!(source = %self.config.name, %url, retry, "GET");

            let resp = self
                .http
                .get(&url)
                .query(query)
                .headers(header_map.clone())
                .send()
                .await?;

            let status = resp.status();
            if status.is_success() {
                let body = resp.bytes().await?;
                return Ok(serde_json::from_slice(&body)?);
            }

            if retry < self.config.retry.max_retries && self.config.retry.should_retry(status) {
                retry += 1;
                let delay = self.config.retry.backoff(retry);
                warn!(
                    source = %self.config.name,
                    status = status.as_u16(),
                    retry,
                    delay_ms = delay.as_millis() as u64,
                    "Upstream returned retriable status"
                );
                metrics::counter!("opflow_upstream_retries_total", "source" => self.config.name.clone())
                    .increment(1);
                tokio::time::sleep(delay).await;
                continue;
            }

            let body = resp.text().await.unwrap_or_default();
            return Err(MarketDataError::Status {
                status: status.as_u16(),
                body,
            });
        }
    }
}

fn build_headers(headers: &[(&'static str, String)]) -> Result<HeaderMap> {
    let mut map = HeaderMap::new();
    for (name, value) in headers {
        let value = HeaderValue::from_str(value)
            .map_err(|e| MarketDataError::Config(format!("invalid header {}: {}", name, e)))?;
        map.insert(HeaderName::from_static(name), value);
    }
    Ok(map)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{extract::State, http::StatusCode as AxumStatus, routing::get, Json, Router};
    use serde_json::{json, Value};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    /// Serves `failures` responses with `status` before answering 200
    async fn flaky_server(status: u16, failures: usize) -> (String, Arc<AtomicUsize>) {
        let hits = Arc::new(AtomicUsize::new(0));
        let app = Router::new()
            .route(
                "/data",
                get(
                    move |State(hits): State<Arc<AtomicUsize>>| async move {
                        let n = hits.fetch_add(1, Ordering::SeqCst);
                        if n < failures {
                            Err(AxumStatus::from_u16(status).unwrap())
                        } else {
                            Ok(Json(json!({ "ok": true, "attempt": n })))
                        }
                    },
                ),
            )
            .with_state(hits.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        (format!("http://{}", addr), hits)
    }

    fn client(base_url: &str) -> UpstreamClient {
        let retry = RetryPolicy {
            backoff_factor: 0.0,
            ..RetryPolicy::default()
        };
        UpstreamClient::new(
            UpstreamConfig::new("test", base_url, Duration::from_secs(5)).with_retry(retry),
        )
        .unwrap()
    }

    #[test]
    fn test_backoff_schedule() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.backoff(1), Duration::from_secs(1));
        assert_eq!(policy.backoff(2), Duration::from_secs(2));
        assert_eq!(policy.backoff(3), Duration::from_secs(4));
        assert!(policy.should_retry(StatusCode::TOO_MANY_REQUESTS));
        assert!(policy.should_retry(StatusCode::BAD_GATEWAY));
        assert!(!policy.should_retry(StatusCode::NOT_FOUND));
        assert!(!policy.should_retry(StatusCode::UNAUTHORIZED));
    }

    #[tokio::test]
    async fn test_retries_transient_status() {
        let (base, hits) = flaky_server(503, 2).await;
        let body: Value = client(&base).get_json("/data", &[], &[]).await.unwrap();
        assert_eq!(body["ok"], true);
        assert_eq!(hits.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_gives_up_after_max_retries() {
        let (base, hits) = flaky_server(500, 10).await;
        let err = client(&base)
            .get_json::<Value>("/data", &[], &[])
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), Some(500));
        // One initial attempt plus three retries
        assert_eq!(hits.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn test_does_not_retry_client_errors() {
        let (base, hits) = flaky_server(404, 10).await;
        let err = client(&base)
            .get_json::<Value>("/data", &[], &[])
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), Some(404));
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }
}
