//! User storage collaborator.
//!
//! The gatekeeper never owns persistence; it talks to storage through the
//! [`UserStore`] capability. [`memory::MemoryUserStore`] is the in-process
//! implementation used by the binary and the tests.

pub mod memory;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;

pub use memory::MemoryUserStore;

/// Stable user identifier, also the `sub` claim of identity tokens.
pub type UserId = i64;

/// A stored user. The digest is never serialized.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct User {
    pub id: UserId,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("user not found")]
    NotFound,
    #[error("user already exists")]
    AlreadyExists,
    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

/// Capability surface the core consumes from persistence.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Insert a new user. A taken email yields [`StoreError::AlreadyExists`].
    async fn create(&self, email: &str, password_hash: &str) -> Result<User, StoreError>;

    async fn find_by_email(&self, email: &str) -> Result<User, StoreError>;

    async fn find_by_id(&self, id: UserId) -> Result<User, StoreError>;

    /// Persist email/digest changes and refresh `updated_at`.
    async fn update(&self, user: &User) -> Result<User, StoreError>;

    async fn delete(&self, id: UserId) -> Result<(), StoreError>;

    /// Connectivity probe used by startup verification and health routes.
    async fn ping(&self) -> Result<(), StoreError>;
}
