//! Relay error types.

use thiserror::Error;

/// Errors raised while constructing or dispatching a side request.
///
/// None of these ever reach the client; the middleware logs them and
/// continues the chain without relayed cookies.
#[derive(Debug, Error)]
pub enum RelayError {
    /// Relay settings that cannot be turned into a side request.
    #[error("invalid relay configuration: {0}")]
    InvalidConfig(String),

    /// The side request could not be assembled from the inbound request.
    #[error("failed to build side request: {0}")]
    Build(String),

    /// The side call did not complete within the client's deadline.
    #[error("side call to {url} timed out")]
    Timeout { url: String },

    /// Connection or protocol failure talking to the target address.
    #[error("side call to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl RelayError {
    /// Short label used for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            RelayError::InvalidConfig(_) => "invalid_config",
            RelayError::Build(_) => "build_error",
            RelayError::Timeout { .. } => "timeout",
            RelayError::Transport { .. } => "transport_error",
        }
    }
}
