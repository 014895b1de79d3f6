//! Side-call client.
//!
//! # Responsibilities
//! - Define the request/response shapes of the side exchange
//! - Abstract the HTTP transport behind `SideClient`
//! - Provide the pooled `reqwest` implementation used in production
//!
//! # Design Decisions
//! - One client per process, built at startup and shared by every request
//! - Only transport failures are errors; any status code is a response
//! - Client timeouts are configured once on the builder; the relay adds its
//!   own deadline on top
//! - Response bodies are read and discarded so the connection goes back to
//!   the pool; bodies past `MAX_DRAIN_BYTES` close the connection instead

use std::future::Future;
use std::time::Duration;

use axum::http::header::COOKIE;
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use url::Url;

use crate::config::ClientConfig;
use crate::relay::error::RelayError;

/// Largest side response body read to keep its connection pooled.
pub const MAX_DRAIN_BYTES: usize = 1024 * 1024;

/// A GET request to the target address.
#[derive(Debug, Clone)]
pub struct SideRequest {
    /// Target URL including the copied query parameters.
    pub url: Url,
    /// Copied request headers.
    pub headers: HeaderMap,
    /// Copied cookies as `(name, value)` pairs.
    pub cookies: Vec<(String, String)>,
}

impl SideRequest {
    pub fn new(url: Url) -> Self {
        Self {
            url,
            headers: HeaderMap::new(),
            cookies: Vec::new(),
        }
    }

    pub fn cookie(&self, name: &str) -> Option<&str> {
        self.cookies
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    /// Every decoded value of query parameter `name`, in order.
    pub fn query_values(&self, name: &str) -> Vec<String> {
        self.url
            .query_pairs()
            .filter(|(key, _)| key == name)
            .map(|(_, value)| value.into_owned())
            .collect()
    }

    /// The copied cookies folded into one `Cookie` header value.
    pub fn cookie_header(&self) -> Result<Option<HeaderValue>, RelayError> {
        if self.cookies.is_empty() {
            return Ok(None);
        }
        let joined = self
            .cookies
            .iter()
            .map(|(name, value)| format!("{name}={value}"))
            .collect::<Vec<_>>()
            .join("; ");
        HeaderValue::from_str(&joined)
            .map(Some)
            .map_err(|e| RelayError::Build(format!("cookie header: {e}")))
    }

    /// Headers as sent on the wire; copied cookies replace any copied `Cookie` header.
    pub fn wire_headers(&self) -> Result<HeaderMap, RelayError> {
        let mut headers = self.headers.clone();
        if let Some(cookie) = self.cookie_header()? {
            headers.insert(COOKIE, cookie);
        }
        Ok(headers)
    }
}

/// What the relay needs from a side response.
#[derive(Debug, Clone)]
pub struct SideResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
}

/// Transport used to dispatch side requests.
pub trait SideClient: Send + Sync + 'static {
    /// Send `request` as an HTTP GET.
    fn send(
        &self,
        request: SideRequest,
    ) -> impl Future<Output = Result<SideResponse, RelayError>> + Send;
}

/// `SideClient` backed by a shared, connection-pooling `reqwest::Client`.
#[derive(Debug, Clone)]
pub struct HttpSideClient {
    client: reqwest::Client,
}

impl HttpSideClient {
    /// Build the pooled client from configuration.
    pub fn new(config: &ClientConfig) -> Result<Self, RelayError> {
        let mut builder = reqwest::Client::builder();
        if let Some(ms) = config.timeout_ms {
            builder = builder.timeout(Duration::from_millis(ms));
        }
        if let Some(ms) = config.connect_timeout_ms {
            builder = builder.connect_timeout(Duration::from_millis(ms));
        }
        if let Some(secs) = config.pool_idle_timeout_secs {
            builder = builder.pool_idle_timeout(Duration::from_secs(secs));
        }

        let client = builder
            .build()
            .map_err(|e| RelayError::InvalidConfig(format!("side-call client: {e}")))?;
        Ok(Self { client })
    }

    /// Wrap an existing client, e.g. one shared with other subsystems.
    pub fn from_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

impl SideClient for HttpSideClient {
    fn send(
        &self,
        request: SideRequest,
    ) -> impl Future<Output = Result<SideResponse, RelayError>> + Send {
        async move {
            let headers = request.wire_headers()?;
            let url = request.url.to_string();

            let mut response = self
                .client
                .get(request.url)
                .headers(headers)
                .send()
                .await
                .map_err(|e| {
                    if e.is_timeout() {
                        RelayError::Timeout { url: url.clone() }
                    } else {
                        RelayError::Transport {
                            url: url.clone(),
                            source: Box::new(e),
                        }
                    }
                })?;

            let side = SideResponse {
                status: response.status(),
                headers: response.headers().clone(),
            };

            let mut drained = 0usize;
            while drained <= MAX_DRAIN_BYTES {
                match response.chunk().await {
                    Ok(Some(chunk)) => drained += chunk.len(),
                    Ok(None) => break,
                    Err(e) => {
                        tracing::debug!(url = %url, error = %e, "Side response body unreadable");
                        break;
                    }
                }
            }

            Ok(side)
        }
    }
}
