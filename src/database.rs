//! database (db) union structure.
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::FromRef;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use tokio::sync::OnceCell;

use crate::AppState;
use crate::error::{Result, ServerError};
use crate::user::{MemoryUserStore, PgUserRepository, UserStore};

pub const DEFAULT_CREDENTIALS: &str = "postgres";
pub const DEFAULT_DATABASE_NAME: &str = "userdir";
pub const DEFAULT_POOL_SIZE: u32 = 10;
const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(5);

/// Handle created on first use and shared by every clone afterwards.
///
/// Concurrent first callers await the same pending initialization.
/// A failed initialization is not kept: the next caller tries again.
#[derive(Debug)]
pub struct LazyHandle<T> {
    cell: Arc<OnceCell<T>>,
}

impl<T> Clone for LazyHandle<T> {
    fn clone(&self) -> Self {
        Self {
            cell: Arc::clone(&self.cell),
        }
    }
}

impl<T> Default for LazyHandle<T> {
    fn default() -> Self {
        Self {
            cell: Arc::new(OnceCell::new()),
        }
    }
}

impl<T: Clone> LazyHandle<T> {
    /// Get the handle, running `init` if nobody did yet.
    pub async fn get_or_init<F, Fut, E>(&self, init: F) -> std::result::Result<T, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = std::result::Result<T, E>>,
    {
        self.cell.get_or_try_init(init).await.cloned()
    }

    /// Whether the handle has been initialized.
    #[cfg(test)]
    fn is_ready(&self) -> bool {
        self.cell.initialized()
    }
}

/// PostgreSQL pool opened on first query.
#[derive(Clone, Debug)]
pub struct LazyPool {
    url: String,
    max_connections: u32,
    handle: LazyHandle<PgPool>,
}

impl LazyPool {
    /// Prepare a pool; no connection is made yet.
    pub fn new(url: impl Into<String>, max_connections: u32) -> Self {
        Self {
            url: url.into(),
            max_connections,
            handle: LazyHandle::default(),
        }
    }

    /// Connection URL built from discrete credentials.
    pub fn url(hostname: &str, username: &str, password: &str, db: &str) -> String {
        format!("postgres://{username}:{password}@{hostname}/{db}")
    }

    /// Shared pool, connecting and migrating on first call.
    pub async fn get(&self) -> Result<PgPool> {
        self.handle
            .get_or_init(|| async {
                let pool = PgPoolOptions::new()
                    .max_connections(self.max_connections)
                    .acquire_timeout(ACQUIRE_TIMEOUT)
                    .connect(&self.url)
                    .await
                    .map_err(|err| {
                        tracing::error!(error = %err, "cannot connect to postgres");
                        ServerError::StoreUnavailable(err.to_string())
                    })?;

                sqlx::migrate!().run(&pool).await.map_err(|err| {
                    tracing::error!(error = %err, "migrations failed");
                    ServerError::StoreUnavailable(err.to_string())
                })?;

                tracing::info!(max_connections = self.max_connections, "postgres connected");
                Ok(pool)
            })
            .await
    }
}

/// Custom db structure to pass to Axum.
#[derive(Clone)]
pub struct Database {
    pub users: Arc<dyn UserStore>,
}

impl Database {
    /// Users stored on PostgreSQL, connected lazily.
    pub fn postgres(pool: LazyPool) -> Self {
        Self {
            users: Arc::new(PgUserRepository::new(pool)),
        }
    }

    /// Users kept in memory for the process lifetime.
    pub fn memory() -> Self {
        Self::with_store(Arc::new(MemoryUserStore::new()))
    }

    /// Use a custom [`UserStore`].
    pub fn with_store(users: Arc<dyn UserStore>) -> Self {
        Self { users }
    }
}

impl FromRef<AppState> for Database {
    fn from_ref(app_state: &AppState) -> Database {
        app_state.db.clone()
    }
}
