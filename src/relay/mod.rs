//! Cookie relay subsystem.
//!
//! # Data Flow
//! ```text
//! Inbound request
//!     → selection.rs (copy configured cookies, headers, query params)
//!     → client.rs (GET to the target address)
//!     → cookies.rs (pick configured Set-Cookie entries, last one wins)
//!     → next handler runs with the original request
//!     → relayed Set-Cookie headers appended to its response
//! ```
//!
//! # Design Decisions
//! - Fail open: a failed side call is logged and the request continues
//! - The next handler runs exactly once, whatever happened before it
//! - The side call lives in the request future, so a dropped request
//!   cancels it
//! - The side call has its own deadline, shorter than the request timeout,
//!   so a hung target cannot keep the request from reaching `next`

pub mod client;
pub mod cookies;
pub mod error;
pub mod selection;

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    body::Body,
    extract::State,
    http::{HeaderMap, Request, Uri},
    middleware::Next,
    response::Response,
};
use url::Url;

use crate::config::{RelayConfig, RelayPolicy};
use crate::http::request::X_REQUEST_ID;
use crate::observability::metrics;

pub use client::{HttpSideClient, SideClient, SideRequest, SideResponse};
pub use cookies::{cookie_name, RelayedCookieSet};
pub use error::RelayError;
pub use selection::Selection;

/// Mirrors selected request fields to a target address and relays the
/// `Set-Cookie` entries it answers with.
#[derive(Debug)]
pub struct CookieRelay<C> {
    target: Url,
    selection: Selection,
    policy: RelayPolicy,
    deadline: Option<Duration>,
    client: C,
}

impl<C: SideClient> CookieRelay<C> {
    /// Create a relay from its settings and a shared side-call client.
    pub fn new(config: &RelayConfig, client: C) -> Result<Self, RelayError> {
        let target = Url::parse(&config.target_address).map_err(|e| {
            RelayError::InvalidConfig(format!(
                "target address `{}`: {e}",
                config.target_address
            ))
        })?;

        Ok(Self {
            target,
            selection: Selection::from_config(config)?,
            policy: config.policy,
            deadline: None,
            client,
        })
    }

    /// Abandon side calls that take longer than `deadline`.
    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn deadline(&self) -> Option<Duration> {
        self.deadline
    }

    pub fn target(&self) -> &Url {
        &self.target
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    /// Build the side request for an inbound request's headers and URI.
    pub fn side_request(&self, headers: &HeaderMap, uri: &Uri) -> SideRequest {
        self.selection.build_side_request(&self.target, headers, uri)
    }

    /// Run the side call and collect the cookies to relay.
    ///
    /// Never fails: any error is logged and yields an empty set.
    pub async fn fetch(&self, headers: &HeaderMap, uri: &Uri) -> RelayedCookieSet {
        let request_id = headers
            .get(X_REQUEST_ID)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("unknown");

        if self.policy == RelayPolicy::WhenMissing && self.selection.has_all_cookies(headers) {
            tracing::debug!(
                request_id = %request_id,
                "Request already carries relayed cookies, skipping side call"
            );
            metrics::record_skipped("cookies_present");
            return RelayedCookieSet::new();
        }

        let side = self.side_request(headers, uri);
        tracing::debug!(
            request_id = %request_id,
            target = %side.url,
            cookies = side.cookies.len(),
            headers = side.headers.len(),
            "Dispatching side request"
        );

        let start = Instant::now();
        let sent = match self.deadline {
            Some(deadline) => tokio::time::timeout(deadline, self.client.send(side))
                .await
                .unwrap_or_else(|_| {
                    Err(RelayError::Timeout {
                        url: self.target.to_string(),
                    })
                }),
            None => self.client.send(side).await,
        };
        let response = match sent {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!(
                    request_id = %request_id,
                    target = %self.target,
                    error = %e,
                    "Side call failed, continuing without relayed cookies"
                );
                metrics::record_side_call(e.kind(), start);
                return RelayedCookieSet::new();
            }
        };
        metrics::record_side_call("ok", start);

        let relayed =
            RelayedCookieSet::from_headers(&response.headers, self.selection.cookie_names());
        tracing::debug!(
            request_id = %request_id,
            status = %response.status,
            relayed = relayed.len(),
            "Side call complete"
        );
        relayed
    }

    /// Relay for one request, then hand the unmodified request to `next`.
    pub async fn handle(&self, request: Request<Body>, next: Next) -> Response {
        let relayed = self.fetch(request.headers(), request.uri()).await;

        let mut response = next.run(request).await;

        metrics::record_relayed(relayed.len());
        relayed.apply(response.headers_mut());
        response
    }
}

/// Axum middleware running a shared `CookieRelay` in front of the next handler.
///
/// Wire it with `middleware::from_fn_with_state(relay, cookie_relay_middleware::<C>)`.
pub async fn cookie_relay_middleware<C: SideClient>(
    State(relay): State<Arc<CookieRelay<C>>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    relay.handle(request, next).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct UnusedClient;

    impl SideClient for UnusedClient {
        async fn send(&self, request: SideRequest) -> Result<SideResponse, RelayError> {
            Err(RelayError::Build(format!("unexpected call to {}", request.url)))
        }
    }

    #[test]
    fn test_new_rejects_malformed_target() {
        let config = RelayConfig {
            target_address: "not a url".into(),
            ..Default::default()
        };
        let err = CookieRelay::new(&config, UnusedClient).unwrap_err();
        assert!(matches!(err, RelayError::InvalidConfig(_)));
    }

    /// Never answers.
    #[derive(Debug)]
    struct HungClient;

    impl SideClient for HungClient {
        async fn send(&self, _request: SideRequest) -> Result<SideResponse, RelayError> {
            std::future::pending().await
        }
    }

    #[tokio::test]
    async fn test_fetch_gives_up_after_deadline() {
        let config = RelayConfig {
            target_address: "http://auth.internal:4000/refresh".into(),
            cookies: vec!["sid".into()],
            ..Default::default()
        };
        let relay = CookieRelay::new(&config, HungClient)
            .unwrap()
            .with_deadline(Duration::from_millis(50));
        let uri: Uri = "/".parse().unwrap();

        let relayed = tokio::time::timeout(
            Duration::from_secs(2),
            relay.fetch(&HeaderMap::new(), &uri),
        )
        .await
        .expect("fetch should stop at its deadline");
        assert!(relayed.is_empty());
    }

    #[test]
    fn test_side_request_uses_target() {
        let config = RelayConfig {
            target_address: "http://auth.internal:4000/refresh".into(),
            parameters: vec!["q".into()],
            ..Default::default()
        };
        let relay = CookieRelay::new(&config, UnusedClient).unwrap();
        let uri: Uri = "/x?q=1".parse().unwrap();

        let side = relay.side_request(&HeaderMap::new(), &uri);
        assert_eq!(side.url.as_str(), "http://auth.internal:4000/refresh?q=1");
    }
}
