use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::{debug, info};

use crate::auth::password::PasswordHasher;
use crate::auth::token::TokenIssuer;
use crate::db::models::UserOut;
use crate::db::operations::CredentialStore;
use crate::error::{AppError, AuthError};

pub const TOKEN_TYPE: &str = "Bearer";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
}

/// Registration, login and bearer-token resolution over a [`CredentialStore`].
pub struct AuthService {
    store: Arc<dyn CredentialStore>,
    hasher: PasswordHasher,
    tokens: TokenIssuer,
    // Verified against when the username is unknown, so both login failures cost one Argon2 run
    dummy_hash: OnceCell<String>,
}

const DUMMY_PASSWORD: &str = "login-api-dummy-password";

fn require_credentials(username: &str, password: &str) -> Result<(), AppError> {
    if username.is_empty() {
        return Err(AppError::ValidationError("username must not be empty".into()));
    }
    if password.is_empty() {
        return Err(AppError::ValidationError("password must not be empty".into()));
    }
    Ok(())
}

impl AuthService {
    pub fn new(store: Arc<dyn CredentialStore>, hasher: PasswordHasher, tokens: TokenIssuer) -> Self {
        Self {
            store,
            hasher,
            tokens,
            dummy_hash: OnceCell::new(),
        }
    }

    pub fn tokens(&self) -> &TokenIssuer {
        &self.tokens
    }

    pub fn store(&self) -> &Arc<dyn CredentialStore> {
        &self.store
    }

    pub async fn register(&self, username: &str, password: &str) -> Result<UserOut, AppError> {
        require_credentials(username, password)?;

        // The store's own uniqueness constraint is authoritative; this only
        // skips hashing for names that are obviously taken.
        if self.store.find_by_username(username).await?.is_some() {
            return Err(AuthError::UsernameTaken.into());
        }

        let password_hash = self.hash_password(password).await?;
        let user = self.store.insert_user(username, &password_hash).await?;

        info!(id = user.id, "registered user {}", user.username);
        Ok(user.into())
    }

    pub async fn login(&self, username: &str, password: &str) -> Result<TokenResponse, AppError> {
        require_credentials(username, password)?;

        let user = match self.store.find_by_username(username).await? {
            Some(user) => user,
            None => {
                let dummy = self.dummy_hash().await?;
                self.verify_password(password, dummy).await?;
                return Err(AuthError::InvalidCredentials.into());
            }
        };

        if !self.verify_password(password, &user.password_hash).await? {
            return Err(AuthError::InvalidCredentials.into());
        }

        let access_token = self.tokens.issue(&user.username)?;
        Ok(TokenResponse {
            access_token,
            token_type: TOKEN_TYPE.to_string(),
        })
    }

    pub async fn resolve_current_user(&self, token: &str) -> Result<UserOut, AppError> {
        let subject = self.tokens.verify(token).map_err(|e| {
            debug!(reason = %e, "rejected bearer token");
            AuthError::from(e)
        })?;

        let user = self
            .store
            .find_by_username(&subject)
            .await?
            .ok_or_else(|| {
                debug!("token subject {} no longer exists", subject);
                AuthError::Unauthenticated
            })?;

        Ok(user.into())
    }

    async fn dummy_hash(&self) -> Result<&str, AppError> {
        self.dummy_hash
            .get_or_try_init(|| self.hash_password(DUMMY_PASSWORD))
            .await
            .map(String::as_str)
    }

    async fn hash_password(&self, password: &str) -> Result<String, AppError> {
        let hasher = self.hasher.clone();
        let password = password.to_owned();
        tokio::task::spawn_blocking(move || hasher.hash(&password)).await?
    }

    async fn verify_password(&self, password: &str, hash: &str) -> Result<bool, AppError> {
        let hasher = self.hasher.clone();
        let password = password.to_owned();
        let hash = hash.to_owned();
        Ok(tokio::task::spawn_blocking(move || hasher.verify(&password, &hash)).await?)
    }
}
