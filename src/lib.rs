//! Cookie relay middleware library.
//!
//! Mirrors a configured subset of each request's cookies, headers and query
//! parameters to a fixed target address, then relays the matching
//! `Set-Cookie` entries of that side response onto the client's response.

pub mod config;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod relay;

pub use config::schema::ServerConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use relay::{cookie_relay_middleware, CookieRelay};
