//! Handle store requests.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::database::LazyPool;
use crate::error::{Result, ServerError};
use crate::user::{ObjectId, User, UserSummary};

/// Port for user persistence.
///
/// Every method maps to one atomic store operation. A connection that
/// cannot be established surfaces as [`ServerError::StoreUnavailable`].
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Establish the connection if it is not already open.
    async fn ping(&self) -> Result<()>;

    /// At most `limit` users, in store order.
    async fn list(&self, limit: usize) -> Result<Vec<UserSummary>>;

    async fn find_by_id(&self, id: &ObjectId) -> Result<Option<User>>;

    async fn find_by_email(&self, email: &str) -> Result<Option<User>>;

    /// Insert a new user. Fails with [`ServerError::Conflict`] on a taken email.
    async fn insert(&self, user: &User) -> Result<()>;

    /// Replace mutable fields. Returns `false` if no user has this id.
    async fn update(&self, user: &User) -> Result<bool>;

    /// Returns `false` if no user has this id.
    async fn delete(&self, id: &ObjectId) -> Result<bool>;

    /// Delete every user, returning how many were removed.
    async fn clear(&self) -> Result<u64>;

    /// Bulk insert.
    async fn insert_many(&self, users: &[User]) -> Result<usize>;
}

/// Row of the `users` table.
#[derive(Debug, sqlx::FromRow)]
struct UserRecord {
    id: String,
    name: String,
    email: String,
    image: String,
    bio: String,
    is_admin: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<UserRecord> for User {
    type Error = ServerError;

    fn try_from(record: UserRecord) -> Result<Self> {
        Ok(User {
            id: record.id.parse()?,
            name: record.name,
            email: record.email,
            image: record.image,
            bio: record.bio,
            is_admin: record.is_admin,
            created_at: record.created_at,
            updated_at: record.updated_at,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct SummaryRecord {
    id: String,
    name: String,
    email: String,
    is_admin: bool,
    created_at: DateTime<Utc>,
    image: String,
}

impl TryFrom<SummaryRecord> for UserSummary {
    type Error = ServerError;

    fn try_from(record: SummaryRecord) -> Result<Self> {
        Ok(UserSummary {
            id: record.id.parse()?,
            name: record.name,
            email: record.email,
            is_admin: record.is_admin,
            created_at: record.created_at,
            image: record.image,
        })
    }
}

/// PostgreSQL user repository.
#[derive(Clone)]
pub struct PgUserRepository {
    pool: LazyPool,
}

impl PgUserRepository {
    /// Create a new [`PgUserRepository`].
    pub fn new(pool: LazyPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserStore for PgUserRepository {
    async fn ping(&self) -> Result<()> {
        self.pool.get().await?;
        Ok(())
    }

    async fn list(&self, limit: usize) -> Result<Vec<UserSummary>> {
        let pool = self.pool.get().await?;

        sqlx::query_as::<_, SummaryRecord>(
            r#"SELECT id, name, email, is_admin, created_at, image
                FROM users
                ORDER BY seq
                LIMIT $1"#,
        )
        .bind(limit as i64)
        .fetch_all(&pool)
        .await?
        .into_iter()
        .map(UserSummary::try_from)
        .collect()
    }

    async fn find_by_id(&self, id: &ObjectId) -> Result<Option<User>> {
        let pool = self.pool.get().await?;

        sqlx::query_as::<_, UserRecord>(
            r#"SELECT id, name, email, image, bio, is_admin, created_at, updated_at
                FROM users WHERE id = $1"#,
        )
        .bind(id.to_string())
        .fetch_optional(&pool)
        .await?
        .map(User::try_from)
        .transpose()
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        let pool = self.pool.get().await?;

        sqlx::query_as::<_, UserRecord>(
            r#"SELECT id, name, email, image, bio, is_admin, created_at, updated_at
                FROM users WHERE email = $1"#,
        )
        .bind(email)
        .fetch_optional(&pool)
        .await?
        .map(User::try_from)
        .transpose()
    }

    async fn insert(&self, user: &User) -> Result<()> {
        let pool = self.pool.get().await?;

        sqlx::query(
            r#"INSERT INTO users (id, name, email, image, bio, is_admin, created_at, updated_at)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8)"#,
        )
        .bind(user.id.to_string())
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.image)
        .bind(&user.bio)
        .bind(user.is_admin)
        .bind(user.created_at)
        .bind(user.updated_at)
        .execute(&pool)
        .await?;

        Ok(())
    }

    async fn update(&self, user: &User) -> Result<bool> {
        let pool = self.pool.get().await?;

        let result = sqlx::query(
            r#"UPDATE users
                SET name = $1, email = $2, image = $3, bio = $4, is_admin = $5, updated_at = $6
                WHERE id = $7"#,
        )
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.image)
        .bind(&user.bio)
        .bind(user.is_admin)
        .bind(user.updated_at)
        .bind(user.id.to_string())
        .execute(&pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn delete(&self, id: &ObjectId) -> Result<bool> {
        let pool = self.pool.get().await?;

        let result = sqlx::query(r#"DELETE FROM users WHERE id = $1"#)
            .bind(id.to_string())
            .execute(&pool)
            .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn clear(&self) -> Result<u64> {
        let pool = self.pool.get().await?;

        let result = sqlx::query(r#"DELETE FROM users"#).execute(&pool).await?;
        Ok(result.rows_affected())
    }

    async fn insert_many(&self, users: &[User]) -> Result<usize> {
        let pool = self.pool.get().await?;

        // UNNEST keeps the bulk insert a single statement.
        let result = sqlx::query(
            r#"INSERT INTO users (id, name, email, image, bio, is_admin, created_at, updated_at)
                SELECT * FROM UNNEST($1::text[], $2::text[], $3::text[], $4::text[], $5::text[], $6::bool[], $7::timestamptz[], $8::timestamptz[])"#,
        )
        .bind(users.iter().map(|u| u.id.to_string()).collect::<Vec<_>>())
        .bind(users.iter().map(|u| u.name.clone()).collect::<Vec<_>>())
        .bind(users.iter().map(|u| u.email.clone()).collect::<Vec<_>>())
        .bind(users.iter().map(|u| u.image.clone()).collect::<Vec<_>>())
        .bind(users.iter().map(|u| u.bio.clone()).collect::<Vec<_>>())
        .bind(users.iter().map(|u| u.is_admin).collect::<Vec<_>>())
        .bind(users.iter().map(|u| u.created_at).collect::<Vec<_>>())
        .bind(users.iter().map(|u| u.updated_at).collect::<Vec<_>>())
        .execute(&pool)
        .await?;

        Ok(result.rows_affected() as usize)
    }
}
