//! Selection of the inbound fields mirrored onto the side request.
//!
//! # Responsibilities
//! - Hold the configured cookie, header and query parameter names
//! - Copy the matching, non-empty inbound values into a `SideRequest`
//!
//! # Design Decisions
//! - Names are de-duplicated once at construction, so repeats are no-ops
//! - Absent and empty values are skipped, never an error
//! - Headers overwrite, query parameters append to the target's own query

use std::borrow::Cow;

use axum::http::{HeaderMap, HeaderName, HeaderValue, Uri};
use url::{form_urlencoded, Url};

use crate::config::RelayConfig;
use crate::relay::client::SideRequest;
use crate::relay::cookies::find_cookie;
use crate::relay::error::RelayError;

/// The names of the fields the relay copies, in configured order.
#[derive(Debug, Clone, Default)]
pub struct Selection {
    cookies: Vec<String>,
    headers: Vec<HeaderName>,
    params: Vec<String>,
}

impl Selection {
    /// Build a selection from relay settings.
    pub fn from_config(config: &RelayConfig) -> Result<Self, RelayError> {
        let mut headers: Vec<HeaderName> = Vec::with_capacity(config.headers.len());
        for name in &config.headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|_| RelayError::InvalidConfig(format!("invalid header name `{name}`")))?;
            if !headers.contains(&name) {
                headers.push(name);
            }
        }

        Ok(Self {
            cookies: dedup(config.cookies.iter().map(|name| name.trim())),
            headers,
            params: dedup(config.parameters.iter().map(String::as_str)),
        })
    }

    pub fn cookie_names(&self) -> &[String] {
        &self.cookies
    }

    pub fn header_names(&self) -> &[HeaderName] {
        &self.headers
    }

    pub fn param_names(&self) -> &[String] {
        &self.params
    }

    /// True when at least one cookie is configured and the request carries all of them.
    pub fn has_all_cookies(&self, headers: &HeaderMap) -> bool {
        !self.cookies.is_empty()
            && self
                .cookies
                .iter()
                .all(|name| find_cookie(headers, name).is_some())
    }

    /// Build the side request for one inbound request.
    pub fn build_side_request(&self, target: &Url, headers: &HeaderMap, uri: &Uri) -> SideRequest {
        let mut side = SideRequest::new(target.clone());

        for name in &self.cookies {
            if let Some(value) = find_cookie(headers, name) {
                side.cookies.push((name.clone(), value.to_string()));
            }
        }

        for name in &self.headers {
            if let Some(value) = non_empty_header(headers, name) {
                side.headers.insert(name.clone(), value.clone());
            }
        }

        let params: Vec<(&str, Cow<'_, str>)> = self
            .params
            .iter()
            .filter_map(|name| query_value(uri, name).map(|value| (name.as_str(), value)))
            .collect();
        // Only touch the query when something is added, otherwise the URL gains a bare `?`.
        if !params.is_empty() {
            side.url.query_pairs_mut().extend_pairs(params);
        }

        side
    }
}

fn dedup<'a>(names: impl Iterator<Item = &'a str>) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for name in names {
        if !out.iter().any(|seen| seen == name) {
            out.push(name.to_string());
        }
    }
    out
}

fn non_empty_header<'a>(headers: &'a HeaderMap, name: &HeaderName) -> Option<&'a HeaderValue> {
    headers.get(name).filter(|value| !value.is_empty())
}

/// First non-empty value of query parameter `name` on `uri`.
pub fn query_value<'a>(uri: &'a Uri, name: &str) -> Option<Cow<'a, str>> {
    let query = uri.query()?;
    form_urlencoded::parse(query.as_bytes())
        .find(|(key, _)| key == name)
        .map(|(_, value)| value)
        .filter(|value| !value.is_empty())
}
