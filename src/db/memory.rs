use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::db::models::User;
use crate::db::operations::CredentialStore;
use crate::error::{AppError, AuthError};

#[derive(Debug, Default)]
struct Table {
    rows: HashMap<String, User>,
    next_id: i64,
}

/// Process-local credential store.
///
/// Uniqueness is checked and the row inserted under one write lock, so
/// concurrent registrations of the same name cannot both succeed.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCredentialStore {
    table: Arc<RwLock<Table>>,
}

impl InMemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.table.read().await.rows.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Drops a user, e.g. to simulate deletion after a token was issued.
    pub async fn remove(&self, username: &str) -> Option<User> {
        self.table.write().await.rows.remove(username)
    }
}

#[async_trait]
impl CredentialStore for InMemoryCredentialStore {
    async fn find_by_username(&self, username: &str) -> Result<Option<User>, AppError> {
        Ok(self.table.read().await.rows.get(username).cloned())
    }

    async fn insert_user(&self, username: &str, password_hash: &str) -> Result<User, AppError> {
        let mut table = self.table.write().await;
        if table.rows.contains_key(username) {
            return Err(AuthError::UsernameTaken.into());
        }

        table.next_id += 1;
        let user = User {
            id: table.next_id,
            username: username.to_string(),
            password_hash: password_hash.to_string(),
        };
        table.rows.insert(user.username.clone(), user.clone());
        Ok(user)
    }

    async fn ping(&self) -> Result<(), AppError> {
        Ok(())
    }
}
