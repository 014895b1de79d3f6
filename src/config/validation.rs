//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Target and upstream addresses must be absolute http(s) URLs
//! - Header names must be valid HTTP header names
//! - Validate value ranges (timeouts > 0, socket addresses parse)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ServerConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use axum::http::HeaderName;
use thiserror::Error;
use url::Url;

use crate::config::schema::ServerConfig;

/// A single semantic problem found in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("relay.target_address is required")]
    MissingTargetAddress,

    #[error("{field} `{value}` is not a valid URL: {reason}")]
    InvalidUrl {
        field: &'static str,
        value: String,
        reason: String,
    },

    #[error("{field} `{value}` must use http or https")]
    UnsupportedScheme { field: &'static str, value: String },

    #[error("relay.headers entry `{0}` is not a valid header name")]
    InvalidHeaderName(String),

    #[error("{0} contains an empty name")]
    EmptyName(&'static str),

    #[error("{field} `{value}` is not a host:port address")]
    InvalidSocketAddr { field: &'static str, value: String },

    #[error("timeouts.request_secs must be greater than zero")]
    ZeroRequestTimeout,
}

/// Validate a parsed configuration, collecting every error.
pub fn validate_config(config: &ServerConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();
    let relay = &config.relay;

    if relay.target_address.trim().is_empty() {
        errors.push(ValidationError::MissingTargetAddress);
    } else if let Err(e) = check_http_url("relay.target_address", &relay.target_address) {
        errors.push(e);
    }

    if relay.cookies.iter().any(|name| name.trim().is_empty()) {
        errors.push(ValidationError::EmptyName("relay.cookies"));
    }
    if relay.parameters.iter().any(|name| name.is_empty()) {
        errors.push(ValidationError::EmptyName("relay.parameters"));
    }
    for name in &relay.headers {
        if HeaderName::from_bytes(name.as_bytes()).is_err() {
            errors.push(ValidationError::InvalidHeaderName(name.clone()));
        }
    }

    if !is_host_port(&config.listener.bind_address) {
        errors.push(ValidationError::InvalidSocketAddr {
            field: "listener.bind_address",
            value: config.listener.bind_address.clone(),
        });
    }
    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::InvalidSocketAddr {
            field: "observability.metrics_address",
            value: config.observability.metrics_address.clone(),
        });
    }

    if let Some(upstream) = &config.upstream.address {
        if let Err(e) = check_http_url("upstream.address", upstream) {
            errors.push(e);
        }
    }

    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::ZeroRequestTimeout);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// `host:port` with a non-empty host, e.g. `0.0.0.0:8080` or `localhost:8080`.
/// The host is resolved when the listener binds.
fn is_host_port(address: &str) -> bool {
    if address.parse::<SocketAddr>().is_ok() {
        return true;
    }
    match address.rsplit_once(':') {
        Some((host, port)) => {
            !host.is_empty() && !host.contains(char::is_whitespace) && port.parse::<u16>().is_ok()
        }
        None => false,
    }
}

/// Parse `value` as an absolute http(s) URL.
pub fn check_http_url(field: &'static str, value: &str) -> Result<Url, ValidationError> {
    let url = Url::parse(value).map_err(|e| ValidationError::InvalidUrl {
        field,
        value: value.to_string(),
        reason: e.to_string(),
    })?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        _ => Err(ValidationError::UnsupportedScheme {
            field,
            value: value.to_string(),
        }),
    }
}
