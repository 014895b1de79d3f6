//! Downstream handler: where the original request goes after the relay.
//!
//! # Responsibilities
//! - Forward the untouched request to the configured upstream
//! - Answer 204 when no upstream is configured
//! - Map upstream failures to 502 Bad Gateway

use std::str::FromStr;

use axum::{
    body::Body,
    extract::State,
    http::{
        uri::{Authority, PathAndQuery, Scheme},
        Request, StatusCode, Uri,
    },
    response::{IntoResponse, Response},
};
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};

use crate::http::request::X_REQUEST_ID;

/// State of the downstream handler.
#[derive(Clone)]
pub struct UpstreamState {
    target: Option<(Scheme, Authority)>,
    client: Client<HttpConnector, Body>,
}

impl UpstreamState {
    /// `address` must be an absolute http URL; validation guarantees it.
    pub fn new(address: Option<&str>) -> Self {
        let target = address
            .and_then(|a| Uri::from_str(a).ok())
            .and_then(|uri| {
                let parts = uri.into_parts();
                Some((parts.scheme?, parts.authority?))
            });

        let client = Client::builder(TokioExecutor::new()).build(HttpConnector::new());
        Self { target, client }
    }

    pub fn is_configured(&self) -> bool {
        self.target.is_some()
    }
}

/// Forward the request upstream, or answer 204 when there is none.
pub async fn forward_handler(
    State(state): State<UpstreamState>,
    request: Request<Body>,
) -> Response {
    let Some((scheme, authority)) = state.target.clone() else {
        return StatusCode::NO_CONTENT.into_response();
    };

    let request_id = request
        .headers()
        .get(X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown")
        .to_string();

    let (mut parts, body) = request.into_parts();
    let mut uri_parts = parts.uri.clone().into_parts();
    uri_parts.scheme = Some(scheme);
    uri_parts.authority = Some(authority);
    if uri_parts.path_and_query.is_none() {
        uri_parts.path_and_query = Some(PathAndQuery::from_static("/"));
    }
    parts.uri = match Uri::from_parts(uri_parts) {
        Ok(uri) => uri,
        Err(e) => {
            tracing::error!(request_id = %request_id, error = %e, "Failed to build upstream URI");
            return (StatusCode::BAD_GATEWAY, "Upstream request failed").into_response();
        }
    };

    match state.client.request(Request::from_parts(parts, body)).await {
        Ok(response) => into_axum(response),
        Err(e) => {
            tracing::error!(request_id = %request_id, error = %e, "Upstream error");
            (StatusCode::BAD_GATEWAY, "Upstream request failed").into_response()
        }
    }
}

fn into_axum(response: hyper::Response<hyper::body::Incoming>) -> Response {
    let (parts, body) = response.into_parts();
    Response::from_parts(parts, Body::new(body))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_no_upstream_answers_no_content() {
        let state = UpstreamState::new(None);
        assert!(!state.is_configured());

        let req = Request::builder().uri("/").body(Body::empty()).unwrap();
        let res = forward_handler(State(state), req).await;
        assert_eq!(res.status(), StatusCode::NO_CONTENT);
    }

    #[tokio::test]
    async fn test_unreachable_upstream_is_bad_gateway() {
        // Port 9 (discard) is closed on test machines.
        let state = UpstreamState::new(Some("http://127.0.0.1:9"));
        assert!(state.is_configured());

        let req = Request::builder().uri("/a?b=c").body(Body::empty()).unwrap();
        let res = forward_handler(State(state), req).await;
        assert_eq!(res.status(), StatusCode::BAD_GATEWAY);
    }
}
