//! Error responses.
//!
//! Every failure leaves the service as JSON `{"error": ..., "message": ...}`
//! with `message` omitted when there is nothing to add.

use std::time::Duration;

use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::auth::{AuthError, PasswordError};

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
}

#[derive(Debug)]
pub enum ApiError {
    BadRequest { error: &'static str, message: Option<String> },
    Unauthorized(&'static str),
    NotFound(&'static str),
    Conflict(&'static str),
    TooManyRequests { retry_after: Duration },
    /// Unexpected failure; `context` names the operation that failed.
    Internal { context: &'static str },
}

impl ApiError {
    pub fn validation(message: impl Into<String>) -> Self {
        ApiError::BadRequest {
            error: "validation failed",
            message: Some(message.into()),
        }
    }

    /// Map an authentication failure, logging anything unexpected.
    pub fn from_auth(err: AuthError, context: &'static str) -> Self {
        match err {
            AuthError::InvalidCredentials => ApiError::Unauthorized("invalid credentials"),
            AuthError::UserExists => ApiError::Conflict("user already exists"),
            AuthError::UserNotFound => ApiError::NotFound("user not found"),
            AuthError::Password(PasswordError::TooLong) => ApiError::validation(PasswordError::TooLong.to_string()),
            other => {
                tracing::error!(error = %other, context, "Request failed");
                ApiError::Internal { context }
            }
        }
    }
}

/// Whole seconds a client should wait, rounded up and never below 1.
pub fn retry_after_secs(retry_after: Duration) -> u64 {
    (retry_after.as_secs_f64().ceil() as u64).max(1)
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error, message) = match self {
            ApiError::BadRequest { error, message } => (StatusCode::BAD_REQUEST, error, message),
            ApiError::Unauthorized(error) => (StatusCode::UNAUTHORIZED, error, None),
            ApiError::NotFound(error) => (StatusCode::NOT_FOUND, error, None),
            ApiError::Conflict(error) => (StatusCode::CONFLICT, error, None),
            ApiError::TooManyRequests { retry_after } => {
                let body = ErrorBody {
                    error: "too many requests",
                    message: Some("rate limit exceeded".to_string()),
                };
                let mut response = (StatusCode::TOO_MANY_REQUESTS, Json(body)).into_response();
                response.headers_mut().insert(
                    header::RETRY_AFTER,
                    HeaderValue::from(retry_after_secs(retry_after)),
                );
                return response;
            }
            ApiError::Internal { context } => (
                StatusCode::INTERNAL_SERVER_ERROR,
                context,
                Some("internal server error".to_string()),
            ),
        };
        (status, Json(ErrorBody { error, message })).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::TokenError;

    #[test]
    fn test_retry_after_rounds_up() {
        assert_eq!(retry_after_secs(Duration::ZERO), 1);
        assert_eq!(retry_after_secs(Duration::from_millis(100)), 1);
        assert_eq!(retry_after_secs(Duration::from_millis(1000)), 1);
        assert_eq!(retry_after_secs(Duration::from_millis(1001)), 2);
    }

    #[test]
    fn test_status_codes() {
        let cases = [
            (ApiError::validation("email: invalid"), StatusCode::BAD_REQUEST),
            (ApiError::Unauthorized("invalid credentials"), StatusCode::UNAUTHORIZED),
            (ApiError::Conflict("user already exists"), StatusCode::CONFLICT),
            (ApiError::TooManyRequests { retry_after: Duration::from_millis(100) }, StatusCode::TOO_MANY_REQUESTS),
            (ApiError::Internal { context: "failed to login" }, StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (error, status) in cases {
            assert_eq!(error.into_response().status(), status);
        }
    }

    #[test]
    fn test_retry_after_header() {
        let response = ApiError::TooManyRequests { retry_after: Duration::from_millis(100) }.into_response();
        assert_eq!(response.headers()[header::RETRY_AFTER], "1");
    }

    #[test]
    fn test_auth_error_mapping() {
        assert!(matches!(
            ApiError::from_auth(AuthError::InvalidCredentials, "failed to login"),
            ApiError::Unauthorized("invalid credentials")
        ));
        assert!(matches!(
            ApiError::from_auth(AuthError::UserExists, "failed to register user"),
            ApiError::Conflict(_)
        ));
        assert!(matches!(
            ApiError::from_auth(AuthError::Password(PasswordError::CorruptDigest), "failed to login"),
            ApiError::Internal { context: "failed to login" }
        ));
        assert!(matches!(
            ApiError::from_auth(AuthError::Token(TokenError::Signing("x".into())), "failed to login"),
            ApiError::Internal { .. }
        ));
    }
}
