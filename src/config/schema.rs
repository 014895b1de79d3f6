//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the relay.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for the cookie relay server.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ServerConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Relay settings: target address and the three selection lists.
    pub relay: RelayConfig,

    /// Side-call HTTP client settings.
    pub client: ClientConfig,

    /// Where the original request goes once the relay is done.
    pub upstream: UpstreamConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
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

/// When the side call is made.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum RelayPolicy {
    /// Call the target address on every request.
    #[default]
    Always,
    /// Skip the call when the request already carries every configured cookie.
    WhenMissing,
}

/// Relay configuration.
///
/// Field aliases accept the flat `{addr, cookies, headers, parameters}`
/// shape used by the forward-cookie plugin configs.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct RelayConfig {
    /// Absolute URL the side request is sent to.
    #[serde(alias = "addr")]
    pub target_address: String,

    /// Cookie names copied to the side request and relayed back.
    pub cookies: Vec<String>,

    /// Header names copied to the side request.
    pub headers: Vec<String>,

    /// Query parameter names copied to the side request.
    #[serde(alias = "params")]
    pub parameters: Vec<String>,

    /// Side call policy.
    pub policy: RelayPolicy,
}

/// Side-call client configuration.
///
/// Unset values leave the HTTP client's own defaults in place.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ClientConfig {
    /// Total timeout for one side call in milliseconds.
    pub timeout_ms: Option<u64>,

    /// Connection establishment timeout in milliseconds.
    pub connect_timeout_ms: Option<u64>,

    /// How long idle pooled connections are kept, in seconds.
    pub pool_idle_timeout_secs: Option<u64>,
}

/// Downstream target for the original request.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct UpstreamConfig {
    /// Absolute http URL of the backend (e.g. "http://127.0.0.1:3000").
    /// Without it the server answers 204 after relaying.
    pub address: Option<String>,
}

/// Timeout configuration for inbound requests.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Request timeout (total time for request/response) in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { request_secs: 30 }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error). `RUST_LOG` takes precedence.
    pub log_level: String,

    /// Log output format.
    pub log_format: LogFormat,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
