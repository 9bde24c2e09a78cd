use actix_web::{web, HttpResponse};
use serde::Deserialize;
use tracing::{info, warn};

use crate::auth::extractor::CurrentUser;
use crate::error::AppError;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

pub async fn register(
    req: web::Json<Credentials>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    info!("Received registration request for username: {}", req.username);
    match state.auth_service.register(&req.username, &req.password).await {
        Ok(user) => {
            info!("Registration successful for username: {}", req.username);
            Ok(HttpResponse::Ok().json(user))
        }
        Err(e) => {
            warn!("Registration failed for username: {}: {}", req.username, e);
            Err(e)
        }
    }
}

async fn issue_token(credentials: &Credentials, state: &AppState) -> Result<HttpResponse, AppError> {
    info!("Received login request for username: {}", credentials.username);
    match state.auth_service.login(&credentials.username, &credentials.password).await {
        Ok(token) => {
            info!("Login successful for username: {}", credentials.username);
            Ok(HttpResponse::Ok().json(token))
        }
        Err(e) => {
            warn!("Login failed for username: {}: {}", credentials.username, e);
            Err(e)
        }
    }
}

/// OAuth2 password-flow login (`application/x-www-form-urlencoded`).
pub async fn token(
    form: web::Form<Credentials>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    issue_token(&form, &state).await
}

/// JSON login.
pub async fn login(
    req: web::Json<Credentials>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    issue_token(&req, &state).await
}

pub async fn me(user: CurrentUser) -> HttpResponse {
    HttpResponse::Ok().json(user.into_inner())
}
