pub mod auth;
pub mod config;
pub mod db;
pub mod error;

use actix_web::{web, HttpResponse};
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

pub use error::AppError;
pub type Result<T> = std::result::Result<T, AppError>;
pub use crate::config::Settings;

pub use auth::{AuthService, CurrentUser, PasswordHasher, TokenIssuer};
pub use db::{CredentialStore, DbOperations, InMemoryCredentialStore, User, UserOut};

/// Root endpoint handler
pub async fn root() -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({
        "message": "Welcome to the login API"
    }))
}

/// Health check endpoint handler
/// Returns server status, timestamp and whether the credential store answers;
/// responds 503 with status "degraded" when the store is unreachable
pub async fn health_check(state: web::Data<AppState>) -> HttpResponse {
    let (mut response, status, database) = match state.auth_service.store().ping().await {
        Ok(()) => (HttpResponse::Ok(), "healthy", "up"),
        Err(e) => {
            warn!("Health check could not reach the credential store: {}", e);
            (HttpResponse::ServiceUnavailable(), "degraded", "down")
        }
    };

    response.json(serde_json::json!({
        "status": status,
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "database": database,
    }))
}

// Malformed JSON/form bodies get the same error envelope as every other failure
fn json_config() -> web::JsonConfig {
    web::JsonConfig::default()
        .error_handler(|err, _req| AppError::ValidationError(err.to_string()).into())
}

fn form_config() -> web::FormConfig {
    web::FormConfig::default()
        .error_handler(|err, _req| AppError::ValidationError(err.to_string()).into())
}

/// Registers every route of the API.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(json_config())
        .app_data(form_config())
        .route("/", web::get().to(root))
        .route("/health", web::get().to(health_check))
        .service(
            web::scope("/auth")
                .route("/register", web::post().to(auth::handlers::register))
                .route("/token", web::post().to(auth::handlers::token))
                .route("/login", web::post().to(auth::handlers::login))
                .route("/user/me", web::get().to(auth::handlers::me)),
        );
}

/// Application state shared across all workers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Settings>,
    pub auth_service: Arc<AuthService>,
}

impl AppState {
    /// Connects to Postgres, applies migrations and builds the auth service.
    pub async fn new(config: Settings) -> Result<Self> {
        let db = DbOperations::new_with_options(
            &config.database.url,
            config.database.max_connections,
            Duration::from_secs(config.database.acquire_timeout_secs),
        )
        .await?;
        db.migrate().await?;

        Self::with_store(config, Arc::new(db))
    }

    pub fn with_store(config: Settings, store: Arc<dyn CredentialStore>) -> Result<Self> {
        Self::with_parts(config, store, PasswordHasher::new())
    }

    pub fn with_parts(
        config: Settings,
        store: Arc<dyn CredentialStore>,
        hasher: PasswordHasher,
    ) -> Result<Self> {
        let tokens = TokenIssuer::from_config(&config.auth)?;
        let auth_service = AuthService::new(store, hasher, tokens);

        Ok(Self {
            config: Arc::new(config),
            auth_service: Arc::new(auth_service),
        })
    }
}
