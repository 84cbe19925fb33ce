//! Route handlers.

use std::time::Duration;

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Extension, Json,
};
use serde::Deserialize;
use serde_json::json;
use validator::Validate;

use super::request::RequestContext;
use super::response::ApiError;
use super::server::AppState;
use crate::auth::AuthResponse;
use crate::storage::User;

#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 6))]
    pub password: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 6))]
    pub password: String,
}

fn parse<T: Validate>(payload: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    let Json(body) = payload.map_err(|e| ApiError::BadRequest {
        error: "invalid request body",
        message: Some(e.body_text()),
    })?;
    body.validate().map_err(|e| ApiError::validation(e.to_string()))?;
    Ok(body)
}

/// `POST /auth/register`
pub async fn register(
    State(state): State<AppState>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<AuthResponse>), ApiError> {
    let body = parse(payload)?;
    let response = state
        .auth
        .register(&body.email, &body.password)
        .await
        .map_err(|e| ApiError::from_auth(e, "failed to register user"))?;
    Ok((StatusCode::CREATED, Json(response)))
}

/// `POST /auth/login`
pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<AuthResponse>, ApiError> {
    let body = parse(payload)?;
    let response = state
        .auth
        .login(&body.email, &body.password)
        .await
        .map_err(|e| ApiError::from_auth(e, "failed to login"))?;
    Ok(Json(response))
}

/// `GET /auth/me`, behind access control.
pub async fn me(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
) -> Result<Json<User>, ApiError> {
    let subject = ctx.subject.ok_or(ApiError::Unauthorized("invalid or expired token"))?;
    let user = state
        .auth
        .current_user(subject)
        .await
        .map_err(|e| ApiError::from_auth(e, "failed to load user"))?;
    Ok(Json(user))
}

/// `GET /healthz` and `GET /ready`
pub async fn health(State(state): State<AppState>) -> Response {
    let probe = tokio::time::timeout(
        Duration::from_secs(state.health_probe_secs),
        state.auth.store().ping(),
    )
    .await;

    match probe {
        Ok(Ok(())) => (StatusCode::OK, Json(json!({"status": "ok", "database": "ok"}))).into_response(),
        Ok(Err(e)) => unhealthy(&e.to_string()),
        Err(_) => unhealthy("probe timed out"),
    }
}

fn unhealthy(reason: &str) -> Response {
    tracing::warn!(reason, "Health probe failed");
    (
        StatusCode::SERVICE_UNAVAILABLE,
        Json(json!({"status": "unhealthy", "database": "unhealthy"})),
    )
        .into_response()
}
