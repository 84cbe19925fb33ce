//! In-memory user store.

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use super::{StoreError, User, UserId, UserStore};

/// A thread-safe user table with a unique email index.
///
/// The email index is the uniqueness authority: a user row is only inserted
/// after its email slot has been claimed.
#[derive(Clone, Default)]
pub struct MemoryUserStore {
    users: Arc<DashMap<UserId, User>>,
    emails: Arc<DashMap<String, UserId>>,
    next_id: Arc<AtomicI64>,
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored users.
    pub fn count(&self) -> usize {
        self.users.len()
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn create(&self, email: &str, password_hash: &str) -> Result<User, StoreError> {
        let id = match self.emails.entry(email.to_string()) {
            Entry::Occupied(_) => return Err(StoreError::AlreadyExists),
            Entry::Vacant(slot) => {
                let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
                slot.insert(id);
                id
            }
        };

        let now = Utc::now();
        let user = User {
            id,
            email: email.to_string(),
            password_hash: password_hash.to_string(),
            created_at: now,
            updated_at: now,
        };
        self.users.insert(id, user.clone());
        Ok(user)
    }

    async fn find_by_email(&self, email: &str) -> Result<User, StoreError> {
        let id = self.emails.get(email).map(|r| *r.value()).ok_or(StoreError::NotFound)?;
        self.find_by_id(id).await
    }

    async fn find_by_id(&self, id: UserId) -> Result<User, StoreError> {
        self.users
            .get(&id)
            .map(|r| r.value().clone())
            .ok_or(StoreError::NotFound)
    }

    async fn update(&self, user: &User) -> Result<User, StoreError> {
        let mut stored = self.users.get_mut(&user.id).ok_or(StoreError::NotFound)?;

        if stored.email != user.email {
            match self.emails.entry(user.email.clone()) {
                Entry::Occupied(_) => return Err(StoreError::AlreadyExists),
                Entry::Vacant(slot) => {
                    slot.insert(user.id);
                }
            }
            self.emails.remove(&stored.email);
            stored.email = user.email.clone();
        }
        stored.password_hash = user.password_hash.clone();
        stored.updated_at = Utc::now();
        Ok(stored.clone())
    }

    async fn delete(&self, id: UserId) -> Result<(), StoreError> {
        let (_, user) = self.users.remove(&id).ok_or(StoreError::NotFound)?;
        self.emails.remove(&user.email);
        Ok(())
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_create_and_lookup() {
        let store = MemoryUserStore::new();
        let user = store.create("a@b.com", "digest").await.unwrap();
        assert_eq!(user.id, 1);

        let by_email = store.find_by_email("a@b.com").await.unwrap();
        let by_id = store.find_by_id(user.id).await.unwrap();
        assert_eq!(by_email, user);
        assert_eq!(by_id, user);
        assert!(matches!(store.find_by_email("x@y.com").await, Err(StoreError::NotFound)));
    }

    #[tokio::test]
    async fn test_duplicate_email() {
        let store = MemoryUserStore::new();
        store.create("a@b.com", "d1").await.unwrap();
        let err = store.create("a@b.com", "d2").await.unwrap_err();
        assert!(matches!(err, StoreError::AlreadyExists));
        assert_eq!(store.count(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_creates_same_email() {
        let store = MemoryUserStore::new();
        let mut tasks = Vec::new();
        for _ in 0..16 {
            let store = store.clone();
            tasks.push(tokio::spawn(async move { store.create("race@b.com", "d").await }));
        }
        let mut created = 0;
        for task in tasks {
            if task.await.unwrap().is_ok() {
                created += 1;
            }
        }
        assert_eq!(created, 1);
        assert_eq!(store.count(), 1);
    }

    #[tokio::test]
    async fn test_update_and_delete() {
        let store = MemoryUserStore::new();
        let mut user = store.create("a@b.com", "d1").await.unwrap();
        store.create("taken@b.com", "d").await.unwrap();

        user.email = "taken@b.com".into();
        assert!(matches!(store.update(&user).await, Err(StoreError::AlreadyExists)));

        user.email = "new@b.com".into();
        user.password_hash = "d2".into();
        let updated = store.update(&user).await.unwrap();
        assert_eq!(updated.password_hash, "d2");
        assert!(updated.updated_at >= updated.created_at);
        assert!(matches!(store.find_by_email("a@b.com").await, Err(StoreError::NotFound)));
        assert_eq!(store.find_by_email("new@b.com").await.unwrap().id, user.id);

        store.delete(user.id).await.unwrap();
        assert!(matches!(store.delete(user.id).await, Err(StoreError::NotFound)));
        assert!(matches!(store.find_by_email("new@b.com").await, Err(StoreError::NotFound)));
    }
}
