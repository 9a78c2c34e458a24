//! HTTP client with rate limiting awareness.
//!
//! Provides a wrapper around reqwest with:
//! - Rate limit tracking from response headers
//! - Automatic throttling when approaching limits
//! - Uniform mapping of HTTP failures onto [`MirrorError`]
//! - JSON request/response helpers used by every collaborator client

use crate::config::NetworkConfig;
use crate::{MirrorError, Result};
use reqwest::{header, Client, Method, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::time::Duration;
use tracing::{debug, warn};

/// Rate limit state extracted from response headers.
#[derive(Debug, Clone, Default)]
pub struct RateLimitState {
    /// Remaining requests allowed.
    pub remaining: Option<u64>,
    /// Total request limit.
    pub limit: Option<u64>,
    /// Unix timestamp when the rate limit resets.
    pub reset: Option<u64>,
}

impl RateLimitState {
    /// Check if we should throttle requests.
    pub fn should_throttle(&self) -> bool {
        match (self.remaining, self.limit) {
            (Some(remaining), Some(limit)) if limit > 0 => {
                // Throttle when below 10% of limit
                let threshold = (limit as f64 * 0.1) as u64;
                remaining < threshold.max(1)
            }
            _ => false,
        }
    }
}

/// HTTP client with rate limiting awareness.
pub struct HttpClient {
    client: Client,
    rate_limit_remaining: AtomicI64,
    rate_limit_limit: AtomicU64,
    rate_limit_reset: AtomicU64,
    /// Throttle delay when rate limited.
    throttle_delay: Duration,
}

impl HttpClient {
    /// Create a new HTTP client with default configuration.
    pub fn new() -> Result<Self> {
        Self::with_timeout(NetworkConfig::REQUEST_TIMEOUT)
    }

    /// Create a new HTTP client with a custom default timeout.
    pub fn with_timeout(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(NetworkConfig::USER_AGENT)
            .build()
            .map_err(|e| MirrorError::Network {
                message: format!("Failed to create HTTP client: {}", e),
                cause: None,
            })?;

        Ok(Self {
            client,
            rate_limit_remaining: AtomicI64::new(-1),
            rate_limit_limit: AtomicU64::new(0),
            rate_limit_reset: AtomicU64::new(0),
            throttle_delay: Duration::from_millis(500),
        })
    }

    /// Get the current rate limit state.
    pub fn rate_limit_state(&self) -> RateLimitState {
        let remaining = self.rate_limit_remaining.load(Ordering::SeqCst);
        let limit = self.rate_limit_limit.load(Ordering::SeqCst);
        let reset = self.rate_limit_reset.load(Ordering::SeqCst);
        RateLimitState {
            remaining: u64::try_from(remaining).ok(),
            limit: (limit > 0).then_some(limit),
            reset: (reset > 0).then_some(reset),
        }
    }

    /// GET a URL and decode the JSON body.
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        headers: &[(&str, &str)],
    ) -> Result<T> {
        let response = self.send(Method::GET, url, headers, None::<&()>).await?;
        decode_json(response, url).await
    }

    /// Send a JSON body with the given method and decode the JSON reply.
    pub async fn send_json<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        method: Method,
        url: &str,
        headers: &[(&str, &str)],
        body: &B,
    ) -> Result<T> {
        let response = self.send(method, url, headers, Some(body)).await?;
        decode_json(response, url).await
    }

    async fn send<B: Serialize + ?Sized>(
        &self,
        method: Method,
        url: &str,
        headers: &[(&str, &str)],
        body: Option<&B>,
    ) -> Result<Response> {
        self.maybe_throttle().await;

        let mut request = self.client.request(method.clone(), url);
        for (key, value) in headers {
            request = request.header(*key, *value);
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        debug!("{} {}", method, url);
        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                MirrorError::Timeout(NetworkConfig::REQUEST_TIMEOUT)
            } else {
                MirrorError::Network {
                    message: format!("{} {} failed: {}", method, url, e),
                    cause: Some(e.to_string()),
                }
            }
        })?;

        self.update_rate_limits(&response);
        check_response_status(response, url).await
    }

    async fn maybe_throttle(&self) {
        let state = self.rate_limit_state();
        if state.should_throttle() {
            warn!(
                "Rate limit approaching (remaining: {:?}/{:?}), throttling for {:?}",
                state.remaining, state.limit, self.throttle_delay
            );
            tokio::time::sleep(self.throttle_delay).await;
        }
    }

    fn update_rate_limits(&self, response: &Response) {
        let headers = response.headers();
        let read = |name: &str| headers.get(name).and_then(|v| v.to_str().ok());

        if let Some(num) = read("X-RateLimit-Remaining").and_then(|v| v.parse::<i64>().ok()) {
            self.rate_limit_remaining.store(num, Ordering::SeqCst);
        }
        if let Some(num) = read("X-RateLimit-Limit").and_then(|v| v.parse::<u64>().ok()) {
            self.rate_limit_limit.store(num, Ordering::SeqCst);
        }
        if let Some(num) = read("X-RateLimit-Reset").and_then(|v| v.parse::<u64>().ok()) {
            self.rate_limit_reset.store(num, Ordering::SeqCst);
        }
    }
}

async fn check_response_status(response: Response, url: &str) -> Result<Response> {
    let status = response.status();

    if status.is_success() {
        return Ok(response);
    }

    if status == StatusCode::TOO_MANY_REQUESTS {
        let retry_after = response
            .headers()
            .get(header::RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.trim().parse::<u64>().ok());

        return Err(MirrorError::RateLimited {
            service: extract_domain(url),
            retry_after_secs: retry_after,
        });
    }

    let body = response.text().await.unwrap_or_default();
    Err(MirrorError::Api {
        service: extract_domain(url),
        status_code: Some(status.as_u16()),
        message: truncate(&body, 500),
    })
}

async fn decode_json<T: DeserializeOwned>(response: Response, url: &str) -> Result<T> {
    let bytes = response.bytes().await.map_err(|e| MirrorError::Network {
        message: format!("Failed to read response from {}: {}", url, e),
        cause: None,
    })?;
    serde_json::from_slice(&bytes).map_err(|e| MirrorError::Json {
        message: format!("Unexpected response from {}: {}", extract_domain(url), e),
        source: Some(e),
    })
}

fn truncate(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}

/// Extract domain from a URL.
pub fn extract_domain(url: &str) -> String {
    url::Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(str::to_string))
        .unwrap_or_else(|| "unknown".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header as header_eq, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_rate_limit_state_throttle() {
        let state = RateLimitState {
            remaining: Some(5),
            limit: Some(100),
            reset: None,
        };
        assert!(state.should_throttle());

        let state = RateLimitState {
            remaining: Some(50),
            limit: Some(100),
            reset: None,
        };
        assert!(!state.should_throttle());
        assert!(!RateLimitState::default().should_throttle());
    }

    #[test]
    fn test_extract_domain() {
        assert_eq!(
            extract_domain("https://api.notion.com/v1/pages"),
            "api.notion.com"
        );
        assert_eq!(extract_domain("https://weread.qq.com/web/shelf/sync"), "weread.qq.com");
        assert_eq!(extract_domain("invalid-url"), "unknown");
    }

    #[tokio::test]
    async fn test_get_json_sends_headers_and_tracks_limits() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/thing"))
            .and(header_eq("x-token", "abc"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("X-RateLimit-Remaining", "3")
                    .insert_header("X-RateLimit-Limit", "100")
                    .set_body_json(serde_json::json!({"value": 7})),
            )
            .mount(&server)
            .await;

        let client = HttpClient::new().unwrap();
        let body: serde_json::Value = client
            .get_json(&format!("{}/thing", server.uri()), &[("x-token", "abc")])
            .await
            .unwrap();

        assert_eq!(body["value"], 7);
        let state = client.rate_limit_state();
        assert_eq!(state.remaining, Some(3));
        assert!(state.should_throttle());
    }

    #[tokio::test]
    async fn test_rate_limited_response_maps_retry_after() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "2"))
            .mount(&server)
            .await;

        let client = HttpClient::new().unwrap();
        let err = client
            .send_json::<_, serde_json::Value>(
                Method::POST,
                &format!("{}/v1/pages", server.uri()),
                &[],
                &serde_json::json!({}),
            )
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            MirrorError::RateLimited {
                retry_after_secs: Some(2),
                ..
            }
        ));
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn test_error_status_carries_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(400).set_body_string("validation_error"))
            .mount(&server)
            .await;

        let client = HttpClient::new().unwrap();
        let err = client
            .get_json::<serde_json::Value>(&server.uri(), &[])
            .await
            .unwrap_err();

        match err {
            MirrorError::Api {
                status_code,
                message,
                ..
            } => {
                assert_eq!(status_code, Some(400));
                assert_eq!(message, "validation_error");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
