//! axum-side views of a request and its response for the lifecycle core.

use axum::extract::{MatchedPath, Request};
use axum::http::response::Parts;
use axum::http::{HeaderMap, Method, StatusCode};

use reqlens_core::lifecycle::{HttpRequest, HttpResponse};

/// What the completion hook still needs after the request body has been
/// handed to the inner service.
#[derive(Debug, Clone)]
pub struct RequestSnapshot {
    method: Method,
    route: Option<String>,
    headers: HeaderMap,
}

impl RequestSnapshot {
    pub fn from_request(req: &Request) -> Self {
        Self {
            method: req.method().clone(),
            route: req
                .extensions()
                .get::<MatchedPath>()
                .map(|mp| mp.as_str().to_owned()),
            headers: req.headers().clone(),
        }
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}

impl HttpRequest for RequestSnapshot {
    fn method(&self) -> &str {
        self.method.as_str()
    }

    fn matched_route(&self) -> Option<&str> {
        self.route.as_deref()
    }
}

/// Status and headers of a finalized response. The body is not needed by the
/// completion hook and stays with the response.
#[derive(Debug, Clone)]
pub struct CompletedResponse {
    status: StatusCode,
    headers: HeaderMap,
}

impl CompletedResponse {
    pub fn from_parts(parts: &Parts) -> Self {
        Self {
            status: parts.status,
            headers: parts.headers.clone(),
        }
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}

impl HttpResponse for CompletedResponse {
    fn status_code(&self) -> u16 {
        self.status.as_u16()
    }
}
