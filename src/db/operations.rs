use async_trait::async_trait;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::db::models::User;
use crate::error::{AppError, AuthError, DatabaseError};

/// Storage for user credentials.
///
/// Implementations must enforce username uniqueness themselves: a duplicate
/// `insert_user` fails with [`AuthError::UsernameTaken`] even if the caller
/// checked for the name beforehand.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn find_by_username(&self, username: &str) -> Result<Option<User>, AppError>;

    async fn insert_user(&self, username: &str, password_hash: &str) -> Result<User, AppError>;

    /// Cheap reachability check used by the health endpoint.
    async fn ping(&self) -> Result<(), AppError>;
}

/// Maps a failed `INSERT INTO users` to the error the caller sees.
fn insert_failure(err: sqlx::Error) -> AppError {
    match DatabaseError::from(err) {
        DatabaseError::Duplicate => AuthError::UsernameTaken.into(),
        other => other.into(),
    }
}

pub struct DbOperations {
    pool: Arc<PgPool>,
}

impl DbOperations {
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }

    pub async fn new_with_options(
        url: &str,
        max_connections: u32,
        acquire_timeout: Duration,
    ) -> Result<Self, AppError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(acquire_timeout)
            .connect(url)
            .await
            .map_err(|e| DatabaseError::ConnectionError(e.to_string()))?;

        Ok(Self { pool: Arc::new(pool) })
    }

    pub async fn migrate(&self) -> Result<(), AppError> {
        sqlx::migrate!("./migrations").run(self.pool.as_ref()).await?;
        Ok(())
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[async_trait]
impl CredentialStore for DbOperations {
    async fn find_by_username(&self, username: &str) -> Result<Option<User>, AppError> {
        let mut conn = self.pool.acquire().await?;

        let user = sqlx::query_as::<_, User>(
            "SELECT id, username, password_hash FROM users WHERE username = $1",
        )
        .bind(username)
        .fetch_optional(&mut *conn)
        .await?;

        debug!(found = user.is_some(), "looked up user {}", username);
        Ok(user)
    }

    async fn insert_user(&self, username: &str, password_hash: &str) -> Result<User, AppError> {
        let mut transaction = self.pool.begin().await?;

        let result = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (username, password_hash)
            VALUES ($1, $2)
            RETURNING id, username, password_hash
            "#,
        )
        .bind(username)
        .bind(password_hash)
        .fetch_one(&mut *transaction)
        .await;

        match result {
            Ok(user) => {
                transaction.commit().await?;
                debug!(id = user.id, "inserted user {}", username);
                Ok(user)
            }
            Err(e) => {
                let error = insert_failure(e);
                // The insert error is what the caller needs; a failed rollback
                // still releases the transaction when it is dropped.
                if let Err(rollback) = transaction.rollback().await {
                    warn!("rollback after failed insert of {} failed: {}", username, rollback);
                }
                Err(error)
            }
        }
    }

    async fn ping(&self) -> Result<(), AppError> {
        sqlx::query("SELECT 1").execute(self.pool.as_ref()).await?;
        Ok(())
    }
}
