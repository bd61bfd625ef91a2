use std::sync::Arc;

use axum::extract::FromRef;

use crate::AppState;
use crate::error::{Result, ServerError};
use crate::user::{ObjectId, User, UserInput, UserStore, UserSummary, fixtures, now};

/// Maximum number of users returned by [`UserService::list`].
pub const LIST_LIMIT: usize = 50;

const EMAIL_EXISTS: &str = "User with this email already exists";
const EMAIL_IN_USE: &str = "Email is already in use by another user";
const CLEAR_FAILED: &str = "Failed to clear existing users.";
const INSERT_FAILED: &str = "Failed to seed database.";

/// User manager.
#[derive(Clone)]
pub struct UserService {
    pub store: Arc<dyn UserStore>,
}

impl FromRef<AppState> for UserService {
    fn from_ref(state: &AppState) -> UserService {
        UserService::new(Arc::clone(&state.db.users))
    }
}

impl UserService {
    /// Create a new [`UserService`].
    pub fn new(store: Arc<dyn UserStore>) -> Self {
        Self { store }
    }

    /// First [`LIST_LIMIT`] users, projected.
    pub async fn list(&self) -> Result<Vec<UserSummary>> {
        self.store.list(LIST_LIMIT).await
    }

    /// Find a user by its raw identifier.
    pub async fn get(&self, raw_id: &str) -> Result<User> {
        let id = raw_id.parse::<ObjectId>()?;
        self.store.find_by_id(&id).await?.ok_or(ServerError::NotFound)
    }

    /// Create a user, rejecting an email already taken.
    pub async fn create(&self, input: UserInput) -> Result<User> {
        let user = User::create(input, now())?;

        if self.store.find_by_email(&user.email).await?.is_some() {
            return Err(ServerError::Conflict(EMAIL_EXISTS.into()));
        }

        // the store may still catch a concurrent insert.
        self.store.insert(&user).await.map_err(|err| match err {
            ServerError::Conflict(_) => ServerError::Conflict(EMAIL_EXISTS.into()),
            err => err,
        })?;

        tracing::info!(user_id = %user.id, "user created");
        Ok(user)
    }

    /// Replace the mutable fields of an existing user.
    pub async fn update(&self, raw_id: &str, input: UserInput) -> Result<User> {
        // required fields are checked before the identifier.
        let (_, email) = input.required()?;
        let id = raw_id.parse::<ObjectId>()?;

        let existing = self
            .store
            .find_by_id(&id)
            .await?
            .ok_or(ServerError::NotFound)?;

        if email != existing.email {
            if let Some(other) = self.store.find_by_email(&email).await? {
                if other.id != existing.id {
                    return Err(ServerError::Conflict(EMAIL_IN_USE.into()));
                }
            }
        }

        let user = existing.merge(input, now())?;
        let updated = self.store.update(&user).await.map_err(|err| match err {
            ServerError::Conflict(_) => ServerError::Conflict(EMAIL_IN_USE.into()),
            err => err,
        })?;

        if !updated {
            return Err(ServerError::NotFound);
        }

        tracing::info!(user_id = %user.id, "user updated");
        Ok(user)
    }

    /// Permanently remove a user.
    pub async fn delete(&self, raw_id: &str) -> Result<()> {
        let id = raw_id.parse::<ObjectId>()?;

        if self.store.delete(&id).await? {
            tracing::info!(user_id = %id, "user deleted");
            Ok(())
        } else {
            Err(ServerError::NotFound)
        }
    }

    /// Delete every user then insert the fixture set.
    ///
    /// Returns the number of inserted users.
    pub async fn seed(&self) -> Result<usize> {
        self.store.ping().await?;

        let removed = self.store.clear().await.map_err(|err| {
            tracing::error!(error = %err, "failed to delete existing users");
            ServerError::SeedFailure(CLEAR_FAILED.into())
        })?;

        let count = self
            .store
            .insert_many(&fixtures(now()))
            .await
            .map_err(|err| {
                tracing::error!(error = %err, "failed to insert fixture users");
                ServerError::SeedFailure(INSERT_FAILED.into())
            })?;

        tracing::info!(removed, count, "store reset and seeded");
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, Ordering};

    use async_trait::async_trait;

    use super::*;
    use crate::user::MemoryUserStore;

    fn input(name: &str, email: &str) -> UserInput {
        UserInput {
            name: Some(name.into()),
            email: Some(email.into()),
            ..Default::default()
        }
    }

    fn service() -> UserService {
        UserService::new(Arc::new(MemoryUserStore::new()))
    }

    #[tokio::test]
    async fn test_second_create_with_same_email_conflicts() {
        let users = service();
        users.create(input("A", "a@x.com")).await.unwrap();

        let err = users.create(input("B", "a@x.com")).await.unwrap_err();
        assert!(matches!(err, ServerError::Conflict(msg) if msg == EMAIL_EXISTS));
    }

    #[tokio::test]
    async fn test_update_keeps_own_email_without_conflict() {
        let users = service();
        let user = users.create(input("A", "a@x.com")).await.unwrap();

        let updated = users
            .update(&user.id.to_string(), input("A2", "a@x.com"))
            .await
            .unwrap();
        assert_eq!(updated.name, "A2");
        assert_eq!(updated.email, "a@x.com");
        assert_eq!(updated.created_at, user.created_at);
        assert!(updated.updated_at > user.updated_at);
    }

    #[tokio::test]
    async fn test_update_to_another_users_email_conflicts() {
        let users = service();
        users.create(input("A", "a@x.com")).await.unwrap();
        let b = users.create(input("B", "b@x.com")).await.unwrap();

        let err = users
            .update(&b.id.to_string(), input("B", "a@x.com"))
            .await
            .unwrap_err();
        assert!(matches!(err, ServerError::Conflict(msg) if msg == EMAIL_IN_USE));
    }

    #[tokio::test]
    async fn test_invalid_and_absent_identifiers() {
        let users = service();
        let absent = ObjectId::new().to_string();

        assert!(matches!(
            users.get("nope").await,
            Err(ServerError::InvalidIdentifier)
        ));
        assert!(matches!(
            users.update("nope", input("A", "a@x.com")).await,
            Err(ServerError::InvalidIdentifier)
        ));
        assert!(matches!(
            users.delete("nope").await,
            Err(ServerError::InvalidIdentifier)
        ));

        assert!(matches!(users.get(&absent).await, Err(ServerError::NotFound)));
        assert!(matches!(
            users.update(&absent, input("A", "a@x.com")).await,
            Err(ServerError::NotFound)
        ));
        assert!(matches!(users.delete(&absent).await, Err(ServerError::NotFound)));
    }

    #[tokio::test]
    async fn test_update_checks_fields_before_identifier() {
        let users = service();
        assert!(matches!(
            users.update("nope", UserInput::default()).await,
            Err(ServerError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_list_is_capped() {
        let users = service();
        for i in 0..(LIST_LIMIT + 10) {
            users
                .create(input("User", &format!("user{i}@x.com")))
                .await
                .unwrap();
        }

        assert_eq!(users.list().await.unwrap().len(), LIST_LIMIT);
    }

    #[tokio::test]
    async fn test_seed_twice_leaves_fixture_set() {
        let users = service();
        users.create(input("A", "a@x.com")).await.unwrap();

        assert_eq!(users.seed().await.unwrap(), 5);
        assert_eq!(users.seed().await.unwrap(), 5);

        let listed = users.list().await.unwrap();
        assert_eq!(listed.len(), 5);
        assert!(listed.iter().all(|u| u.email != "a@x.com"));
    }

    #[tokio::test]
    async fn test_seed_on_offline_store() {
        let store = Arc::new(MemoryUserStore::new());
        store.set_offline(true);
        let users = UserService::new(store);

        assert!(matches!(
            users.seed().await,
            Err(ServerError::StoreUnavailable(_))
        ));
    }

    /// Store whose bulk writes can be made to fail.
    #[derive(Default)]
    struct Faulty {
        inner: MemoryUserStore,
        fail_clear: bool,
        fail_insert: bool,
        inserted: AtomicBool,
    }

    #[async_trait]
    impl UserStore for Faulty {
        async fn ping(&self) -> Result<()> {
            Ok(())
        }
        async fn list(&self, limit: usize) -> Result<Vec<UserSummary>> {
            self.inner.list(limit).await
        }
        async fn find_by_id(&self, id: &ObjectId) -> Result<Option<User>> {
            self.inner.find_by_id(id).await
        }
        async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
            self.inner.find_by_email(email).await
        }
        async fn insert(&self, user: &User) -> Result<()> {
            self.inner.insert(user).await
        }
        async fn update(&self, user: &User) -> Result<bool> {
            self.inner.update(user).await
        }
        async fn delete(&self, id: &ObjectId) -> Result<bool> {
            self.inner.delete(id).await
        }
        async fn clear(&self) -> Result<u64> {
            if self.fail_clear {
                return Err(ServerError::StoreUnavailable("write refused".into()));
            }
            self.inner.clear().await
        }
        async fn insert_many(&self, users: &[User]) -> Result<usize> {
            self.inserted.store(true, Ordering::SeqCst);
            if self.fail_insert {
                return Err(ServerError::StoreUnavailable("write refused".into()));
            }
            self.inner.insert_many(users).await
        }
    }

    #[tokio::test]
    async fn test_seed_stops_when_delete_fails() {
        let store = Arc::new(Faulty {
            fail_clear: true,
            ..Default::default()
        });
        let users = UserService::new(Arc::clone(&store) as Arc<dyn UserStore>);

        let err = users.seed().await.unwrap_err();
        assert!(matches!(err, ServerError::SeedFailure(msg) if msg == CLEAR_FAILED));
        assert!(!store.inserted.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_failed_seed_insert_leaves_store_empty() {
        let store = Arc::new(Faulty {
            fail_insert: true,
            ..Default::default()
        });
        let users = UserService::new(Arc::clone(&store) as Arc<dyn UserStore>);
        users.create(input("A", "a@x.com")).await.unwrap();

        let err = users.seed().await.unwrap_err();
        assert!(matches!(err, ServerError::SeedFailure(msg) if msg == INSERT_FAILED));
        assert!(store.inserted.load(Ordering::SeqCst));
        assert!(users.list().await.unwrap().is_empty());
    }
}
