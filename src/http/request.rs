//! Request context and per-request tracing.
//!
//! # Responsibilities
//! - Generate a trace ID (UUID v4) for every request
//! - Resolve the client identity once, before admission
//! - Emit one structured log record and metrics per request
//!
//! # Design Decisions
//! - Context added as early as possible so every later layer can use it
//! - The trace ID is echoed back in `X-Request-ID`

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use axum::{
    body::{Body, HttpBody as _},
    extract::{ConnectInfo, State},
    http::{header, HeaderName, HeaderValue, Request},
    middleware::Next,
    response::Response,
};
use tracing::Instrument;
use uuid::Uuid;

use crate::observability::metrics;
use crate::security::headers::{ClientIdentityResolver, UNKNOWN_CLIENT};
use crate::storage::UserId;

/// Header carrying the trace ID back to the client.
pub const X_REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");

/// Per-request context stored in request extensions.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub trace_id: Uuid,
    pub started_at: Instant,
    /// Identity used for rate limiting.
    pub client: String,
    /// Authenticated subject, set by access control on protected routes.
    pub subject: Option<UserId>,
}

impl RequestContext {
    pub fn new(client: String) -> Self {
        Self {
            trace_id: Uuid::new_v4(),
            started_at: Instant::now(),
            client,
            subject: None,
        }
    }

    /// Context for a request that bypassed the tracing layer.
    pub fn detached() -> Self {
        Self::new(UNKNOWN_CLIENT.to_string())
    }
}

/// Outermost middleware: builds the [`RequestContext`], runs the request in a
/// span carrying the trace ID, and logs the completed exchange.
pub async fn trace_requests(
    State(resolver): State<Arc<ClientIdentityResolver>>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);
    let client = resolver.resolve(request.headers(), peer);
    let context = RequestContext::new(client.clone());
    let trace_id = context.trace_id;
    let started_at = context.started_at;

    let method = request.method().clone();
    let path = request.uri().path().to_string();
    request.extensions_mut().insert(context);

    let span = tracing::info_span!("request", trace_id = %trace_id);
    let mut response = next.run(request).instrument(span.clone()).await;
    let duration = started_at.elapsed();

    if let Ok(value) = HeaderValue::from_str(&trace_id.to_string()) {
        response.headers_mut().insert(X_REQUEST_ID, value);
    }

    let status = response.status().as_u16();
    let bytes = response_bytes(&response);
    span.in_scope(|| {
        tracing::info!(
            trace_id = %trace_id,
            method = %method,
            path = %path,
            status,
            duration_ms = duration.as_secs_f64() * 1000.0,
            client = %client,
            bytes,
            "Request completed"
        );
    });
    metrics::record_request(method.as_str(), status, duration);

    response
}

/// Response size when known up front, otherwise 0.
fn response_bytes(response: &Response) -> u64 {
    response.body().size_hint().exact().unwrap_or_else(|| {
        response
            .headers()
            .get(header::CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse().ok())
            .unwrap_or(0)
    })
}
