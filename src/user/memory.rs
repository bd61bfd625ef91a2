//! In-process user store.

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::{Result, ServerError};
use crate::user::{ObjectId, User, UserStore, UserSummary};

/// Volatile [`UserStore`] keeping users in insertion order.
#[derive(Debug, Default)]
pub struct MemoryUserStore {
    users: RwLock<Vec<User>>,
    offline: AtomicBool,
}

impl MemoryUserStore {
    /// Create an empty [`MemoryUserStore`].
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulate a lost connection: every call fails until set back online.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    fn connect(&self) -> Result<()> {
        if self.offline.load(Ordering::SeqCst) {
            Err(ServerError::StoreUnavailable("store is offline".into()))
        } else {
            Ok(())
        }
    }
}

fn email_taken(users: &[User], email: &str, except: Option<&ObjectId>) -> bool {
    users
        .iter()
        .any(|u| u.email == email && Some(&u.id) != except)
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn ping(&self) -> Result<()> {
        self.connect()
    }

    async fn list(&self, limit: usize) -> Result<Vec<UserSummary>> {
        self.connect()?;
        let users = self.users.read().await;
        Ok(users.iter().take(limit).map(UserSummary::from).collect())
    }

    async fn find_by_id(&self, id: &ObjectId) -> Result<Option<User>> {
        self.connect()?;
        let users = self.users.read().await;
        Ok(users.iter().find(|u| &u.id == id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        self.connect()?;
        let users = self.users.read().await;
        Ok(users.iter().find(|u| u.email == email).cloned())
    }

    async fn insert(&self, user: &User) -> Result<()> {
        self.connect()?;
        let mut users = self.users.write().await;
        if email_taken(&users, &user.email, None) {
            return Err(ServerError::Conflict(
                "User with this email already exists".into(),
            ));
        }
        users.push(user.clone());
        Ok(())
    }

    async fn update(&self, user: &User) -> Result<bool> {
        self.connect()?;
        let mut users = self.users.write().await;
        if email_taken(&users, &user.email, Some(&user.id)) {
            return Err(ServerError::Conflict(
                "Email is already in use by another user".into(),
            ));
        }

        match users.iter_mut().find(|u| u.id == user.id) {
            Some(stored) => {
                stored.name.clone_from(&user.name);
                stored.email.clone_from(&user.email);
                stored.image.clone_from(&user.image);
                stored.bio.clone_from(&user.bio);
                stored.is_admin = user.is_admin;
                stored.updated_at = user.updated_at;
                Ok(true)
            },
            None => Ok(false),
        }
    }

    async fn delete(&self, id: &ObjectId) -> Result<bool> {
        self.connect()?;
        let mut users = self.users.write().await;
        let before = users.len();
        users.retain(|u| &u.id != id);
        Ok(users.len() != before)
    }

    async fn clear(&self) -> Result<u64> {
        self.connect()?;
        let mut users = self.users.write().await;
        let removed = users.len() as u64;
        users.clear();
        Ok(removed)
    }

    async fn insert_many(&self, batch: &[User]) -> Result<usize> {
        self.connect()?;
        let mut users = self.users.write().await;
        for (index, user) in batch.iter().enumerate() {
            if email_taken(&users, &user.email, None)
                || email_taken(&batch[..index], &user.email, None)
            {
                return Err(ServerError::Conflict(
                    "User with this email already exists".into(),
                ));
            }
        }
        users.extend_from_slice(batch);
        Ok(batch.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::user::{UserInput, now};

    fn user(email: &str) -> User {
        User::create(
            UserInput {
                name: Some("Test".into()),
                email: Some(email.into()),
                ..Default::default()
            },
            now(),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_insert_keeps_emails_unique() {
        let store = MemoryUserStore::new();
        store.insert(&user("a@x.com")).await.unwrap();

        assert!(matches!(
            store.insert(&user("a@x.com")).await,
            Err(ServerError::Conflict(_))
        ));
        assert_eq!(store.list(50).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_bulk_insert_is_all_or_nothing() {
        let store = MemoryUserStore::new();
        let batch = [user("a@x.com"), user("b@x.com"), user("a@x.com")];

        assert!(store.insert_many(&batch).await.is_err());
        assert!(store.list(50).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_offline_store_fails_every_call() {
        let store = MemoryUserStore::new();
        store.set_offline(true);

        assert!(matches!(
            store.list(50).await,
            Err(ServerError::StoreUnavailable(_))
        ));
        assert!(matches!(
            store.clear().await,
            Err(ServerError::StoreUnavailable(_))
        ));

        store.set_offline(false);
        assert!(store.list(50).await.is_ok());
    }
}
