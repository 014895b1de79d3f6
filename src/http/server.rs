//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with the downstream handler
//! - Wire up middleware (tracing, request ID, timeout, cookie relay)
//! - Build the shared side-call client once
//! - Bind server to listener and shut down gracefully

use std::sync::Arc;
use std::time::Duration;

use axum::{middleware, routing::any, Router};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use crate::config::ServerConfig;
use crate::http::request::{propagate_request_id_layer, set_request_id_layer};
use crate::http::upstream::{forward_handler, UpstreamState};
use crate::relay::{cookie_relay_middleware, CookieRelay, HttpSideClient, RelayError, SideClient};

/// HTTP server hosting the cookie relay.
pub struct HttpServer {
    router: Router,
    config: ServerConfig,
}

impl HttpServer {
    /// Create a server whose relay uses a pooled `reqwest` client.
    pub fn new(config: ServerConfig) -> Result<Self, RelayError> {
        let client = HttpSideClient::new(&config.client)?;
        Self::with_client(config, client)
    }

    /// Create a server with a caller-supplied side-call client.
    pub fn with_client<C: SideClient>(config: ServerConfig, client: C) -> Result<Self, RelayError> {
        let relay = CookieRelay::new(&config.relay, client)?
            .with_deadline(side_call_deadline(&config));
        let relay = Arc::new(relay);
        let router = build_router(&config, relay);
        Ok(Self { router, config })
    }

    /// Run the server, accepting connections until `shutdown` fires.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            target = %self.config.relay.target_address,
            "HTTP server starting"
        );

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// The fully layered router, for serving or driving in tests.
    pub fn router(&self) -> Router {
        self.router.clone()
    }
}

/// Deadline for one side call: half the request timeout, or the client
/// timeout when that is shorter. The rest of the request budget is left for
/// the downstream handler.
pub fn side_call_deadline(config: &ServerConfig) -> Duration {
    let half_request =
        Duration::from_millis(config.timeouts.request_secs.saturating_mul(1000) / 2);
    match config.client.timeout_ms {
        Some(ms) => half_request.min(Duration::from_millis(ms)),
        None => half_request,
    }
}

/// Build the Axum router with all middleware layers.
#[allow(deprecated)]
pub fn build_router<C: SideClient>(config: &ServerConfig, relay: Arc<CookieRelay<C>>) -> Router {
    let upstream = UpstreamState::new(config.upstream.address.as_deref());

    Router::new()
        .route("/{*path}", any(forward_handler))
        .route("/", any(forward_handler))
        .with_state(upstream)
        .layer(middleware::from_fn_with_state(
            relay,
            cookie_relay_middleware::<C>,
        ))
        .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs)))
        .layer(propagate_request_id_layer())
        .layer(set_request_id_layer())
        .layer(TraceLayer::new_for_http())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_side_call_deadline_is_inside_request_timeout() {
        let mut config = ServerConfig::default();
        config.timeouts.request_secs = 10;
        assert_eq!(side_call_deadline(&config), Duration::from_secs(5));

        config.client.timeout_ms = Some(750);
        assert_eq!(side_call_deadline(&config), Duration::from_millis(750));

        config.client.timeout_ms = Some(60_000);
        assert_eq!(side_call_deadline(&config), Duration::from_secs(5));
    }
}
