//! Identity tokens.
//!
//! HMAC-signed JWTs carrying `{sub, iat, exp}`. Tokens are stateless: nothing
//! is stored server-side, validation depends only on the token, the secret
//! and the clock.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use serde::{Deserialize, Serialize};

use crate::storage::UserId;

/// Algorithm used when issuing.
const SIGNING_ALGORITHM: Algorithm = Algorithm::HS256;

/// Algorithms accepted when validating: the HMAC family only.
const ACCEPTED_ALGORITHMS: [Algorithm; 3] = [Algorithm::HS256, Algorithm::HS384, Algorithm::HS512];

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TokenError {
    #[error("token is malformed")]
    Malformed,
    #[error("token signature is invalid")]
    BadSignature,
    #[error("token has expired")]
    Expired,
    #[error("token has no usable subject")]
    MissingSubject,
    #[error("failed to sign token: {0}")]
    Signing(String),
}

impl TokenError {
    /// Short label for logs and metrics.
    pub fn reason(&self) -> &'static str {
        match self {
            TokenError::Malformed => "malformed",
            TokenError::BadSignature => "bad_signature",
            TokenError::Expired => "expired",
            TokenError::MissingSubject => "missing_subject",
            TokenError::Signing(_) => "signing",
        }
    }
}

#[derive(Debug, Serialize)]
struct Claims {
    sub: UserId,
    iat: u64,
    exp: u64,
}

/// Claims as received; every field is checked explicitly.
#[derive(Debug, Deserialize)]
struct ReceivedClaims {
    #[serde(default)]
    sub: Option<serde_json::Value>,
    exp: i64,
}

#[derive(Debug, Deserialize)]
struct ReceivedHeader {
    alg: String,
}

/// Mints and verifies identity tokens with a process-wide secret.
pub struct TokenIssuer {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    ttl: Duration,
}

impl TokenIssuer {
    pub fn new(secret: &[u8], ttl: Duration) -> Self {
        let mut validation = Validation::new(SIGNING_ALGORITHM);
        validation.algorithms = ACCEPTED_ALGORITHMS.to_vec();
        // Expiry is checked against an explicit clock in `validate_at`.
        validation.validate_exp = false;
        validation.required_spec_claims.clear();

        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            validation,
            ttl,
        }
    }

    /// Issue a token for `subject`, valid from now for the configured TTL.
    pub fn issue(&self, subject: UserId) -> Result<String, TokenError> {
        self.issue_at(subject, unix_now())
    }

    /// Issue a token as if the current time were `issued_at` (unix seconds).
    pub fn issue_at(&self, subject: UserId, issued_at: u64) -> Result<String, TokenError> {
        let claims = Claims {
            sub: subject,
            iat: issued_at,
            exp: issued_at + self.ttl.as_secs(),
        };
        encode(&Header::new(SIGNING_ALGORITHM), &claims, &self.encoding_key)
            .map_err(|e| TokenError::Signing(e.to_string()))
    }

    /// Verify `token` and return its subject.
    pub fn validate(&self, token: &str) -> Result<UserId, TokenError> {
        self.validate_at(token, unix_now())
    }

    /// Verify `token` against the clock value `now` (unix seconds).
    pub fn validate_at(&self, token: &str, now: u64) -> Result<UserId, TokenError> {
        check_algorithm(token)?;

        let data = decode::<ReceivedClaims>(token, &self.decoding_key, &self.validation)
            .map_err(|e| match e.kind() {
                ErrorKind::InvalidSignature
                | ErrorKind::InvalidAlgorithm
                | ErrorKind::InvalidAlgorithmName
                | ErrorKind::InvalidKeyFormat => TokenError::BadSignature,
                ErrorKind::ExpiredSignature => TokenError::Expired,
                _ => TokenError::Malformed,
            })?;

        let claims = data.claims;
        if claims.exp <= now as i64 {
            return Err(TokenError::Expired);
        }
        claims
            .sub
            .as_ref()
            .and_then(serde_json::Value::as_i64)
            .ok_or(TokenError::MissingSubject)
    }
}

/// Inspect the header before any signature work so that tokens naming a
/// non-HMAC algorithm (including `none`) are rejected as forgeries rather
/// than as parse failures.
fn check_algorithm(token: &str) -> Result<(), TokenError> {
    let mut segments = token.split('.');
    let (Some(header), Some(_), Some(_), None) =
        (segments.next(), segments.next(), segments.next(), segments.next())
    else {
        return Err(TokenError::Malformed);
    };

    let bytes = URL_SAFE_NO_PAD
        .decode(header)
        .map_err(|_| TokenError::Malformed)?;
    let header: ReceivedHeader = serde_json::from_slice(&bytes).map_err(|_| TokenError::Malformed)?;

    match header.alg.as_str() {
        "HS256" | "HS384" | "HS512" => Ok(()),
        _ => Err(TokenError::BadSignature),
    }
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
