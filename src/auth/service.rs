//! Registration and login.

use std::sync::Arc;

use serde::Serialize;

use super::password::{CredentialCodec, PasswordError};
use super::token::{TokenError, TokenIssuer};
use crate::storage::{StoreError, User, UserId, UserStore};

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("invalid credentials")]
    InvalidCredentials,
    #[error("user already exists")]
    UserExists,
    #[error("user not found")]
    UserNotFound,
    #[error(transparent)]
    Password(#[from] PasswordError),
    #[error(transparent)]
    Token(#[from] TokenError),
    #[error("storage error: {0}")]
    Storage(StoreError),
    #[error("hashing task failed: {0}")]
    Task(String),
}

/// Successful registration or login.
#[derive(Debug, Clone, Serialize)]
pub struct AuthResponse {
    pub token: String,
    pub user: User,
}

/// Authentication use cases over the storage collaborator.
#[derive(Clone)]
pub struct AuthService {
    store: Arc<dyn UserStore>,
    issuer: Arc<TokenIssuer>,
    codec: CredentialCodec,
}

impl AuthService {
    pub fn new(store: Arc<dyn UserStore>, issuer: Arc<TokenIssuer>, codec: CredentialCodec) -> Self {
        Self { store, issuer, codec }
    }

    pub fn issuer(&self) -> &Arc<TokenIssuer> {
        &self.issuer
    }

    pub fn store(&self) -> &Arc<dyn UserStore> {
        &self.store
    }

    pub async fn register(&self, email: &str, password: &str) -> Result<AuthResponse, AuthError> {
        match self.store.find_by_email(email).await {
            Ok(_) => return Err(AuthError::UserExists),
            Err(StoreError::NotFound) => {}
            Err(e) => return Err(AuthError::Storage(e)),
        }

        let digest = self.hash(password.to_string()).await?;

        let user = self.store.create(email, &digest).await.map_err(|e| match e {
            StoreError::AlreadyExists => AuthError::UserExists,
            other => AuthError::Storage(other),
        })?;

        let token = self.issuer.issue(user.id)?;
        tracing::info!(user_id = user.id, "User registered");
        Ok(AuthResponse { token, user })
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<AuthResponse, AuthError> {
        let user = self.store.find_by_email(email).await.map_err(|e| match e {
            StoreError::NotFound => AuthError::InvalidCredentials,
            other => AuthError::Storage(other),
        })?;

        let valid = match self.verify(user.password_hash.clone(), password.to_string()).await {
            Ok(valid) => valid,
            Err(AuthError::Password(PasswordError::CorruptDigest)) => {
                tracing::error!(user_id = user.id, email = %user.email, "Stored password digest is corrupt");
                return Err(AuthError::Password(PasswordError::CorruptDigest));
            }
            Err(e) => return Err(e),
        };
        if !valid {
            tracing::warn!(user_id = user.id, "Failed login attempt");
            return Err(AuthError::InvalidCredentials);
        }

        let token = self.issuer.issue(user.id)?;
        Ok(AuthResponse { token, user })
    }

    /// Load the user an authenticated request acts as.
    pub async fn current_user(&self, subject: UserId) -> Result<User, AuthError> {
        self.store.find_by_id(subject).await.map_err(|e| match e {
            StoreError::NotFound => AuthError::UserNotFound,
            other => AuthError::Storage(other),
        })
    }

    // Argon2 is CPU bound; keep it off the async workers. A blocking task
    // runs to completion even when the awaiting request is dropped.
    async fn hash(&self, password: String) -> Result<String, AuthError> {
        let codec = self.codec.clone();
        tokio::task::spawn_blocking(move || codec.hash(&password))
            .await
            .map_err(|e| AuthError::Task(e.to_string()))?
            .map_err(AuthError::from)
    }

    async fn verify(&self, digest: String, password: String) -> Result<bool, AuthError> {
        let codec = self.codec.clone();
        tokio::task::spawn_blocking(move || codec.verify(&digest, &password))
            .await
            .map_err(|e| AuthError::Task(e.to_string()))?
            .map_err(AuthError::from)
    }
}
