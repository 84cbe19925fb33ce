//! Access Control Middleware.
//! Requires a valid bearer identity token on protected routes.

use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::{header::AUTHORIZATION, HeaderMap, Request},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::auth::{TokenError, TokenIssuer};
use crate::http::request::RequestContext;
use crate::http::response::ApiError;
use crate::observability::metrics;

const MISSING_HEADER: &str = "missing authorization header";
const INVALID_FORMAT: &str = "invalid authorization header format";
const INVALID_TOKEN: &str = "invalid or expired token";

pub async fn access_control_middleware(
    State(issuer): State<Arc<TokenIssuer>>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    // 1. Extract the bearer token
    let token = match bearer_token(req.headers()) {
        Ok(token) => token.to_string(),
        Err(message) => {
            metrics::record_auth_failure("header");
            return ApiError::Unauthorized(message).into_response();
        }
    };

    // 2. Validate it
    let subject = match issuer.validate(&token) {
        Ok(subject) => subject,
        Err(e) => {
            let client = req
                .extensions()
                .get::<RequestContext>()
                .map(|ctx| ctx.client.as_str())
                .unwrap_or_default();
            if e == TokenError::BadSignature {
                tracing::warn!(client, path = %req.uri().path(), "Rejected token with invalid signature");
            } else {
                tracing::debug!(client, reason = e.reason(), "Rejected identity token");
            }
            metrics::record_auth_failure(e.reason());
            return ApiError::Unauthorized(INVALID_TOKEN).into_response();
        }
    };

    // 3. Attach the subject to the request context
    match req.extensions_mut().get_mut::<RequestContext>() {
        Some(ctx) => ctx.subject = Some(subject),
        None => {
            let mut ctx = RequestContext::detached();
            ctx.subject = Some(subject);
            req.extensions_mut().insert(ctx);
        }
    }
    next.run(req).await
}

/// Extract the token from `Authorization: Bearer <token>`.
fn bearer_token(headers: &HeaderMap) -> Result<&str, &'static str> {
    let value = match headers.get(AUTHORIZATION) {
        Some(value) if !value.is_empty() => value,
        _ => return Err(MISSING_HEADER),
    };
    let value = value.to_str().map_err(|_| INVALID_FORMAT)?;

    let mut parts = value.split(' ');
    match (parts.next(), parts.next(), parts.next()) {
        (Some("Bearer"), Some(token), None) => Ok(token),
        _ => Err(INVALID_FORMAT),
    }
}
