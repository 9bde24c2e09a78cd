use actix_web::dev::Payload;
use actix_web::http::header;
use actix_web::{web, FromRequest, HttpRequest};
use std::future::Future;
use std::pin::Pin;

use crate::db::models::UserOut;
use crate::error::{AppError, AuthError};
use crate::AppState;

/// The user behind the request's `Authorization: Bearer` token.
pub struct CurrentUser(pub UserOut);

impl CurrentUser {
    pub fn into_inner(self) -> UserOut {
        self.0
    }
}

fn bearer_token(req: &HttpRequest) -> Option<String> {
    req.headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.trim().split_once(' '))
        // Auth schemes are case-insensitive (RFC 7235)
        .filter(|(scheme, _)| scheme.eq_ignore_ascii_case("bearer"))
        .map(|(_, token)| token.trim().to_owned())
        .filter(|t| !t.is_empty())
}

async fn resolve(
    state: Option<web::Data<AppState>>,
    token: Option<String>,
) -> Result<CurrentUser, AppError> {
    let state = state
        .ok_or_else(|| AppError::InternalError("application state not configured".into()))?;
    let token = token.ok_or(AuthError::Unauthenticated)?;
    let user = state.auth_service.resolve_current_user(&token).await?;
    Ok(CurrentUser(user))
}

impl FromRequest for CurrentUser {
    type Error = AppError;
    type Future = Pin<Box<dyn Future<Output = Result<Self, Self::Error>>>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let state = req.app_data::<web::Data<AppState>>().cloned();
        Box::pin(resolve(state, bearer_token(req)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::test::TestRequest;

    #[test]
    fn test_bearer_token_parsing() {
        let req = TestRequest::default()
            .insert_header((header::AUTHORIZATION, "Bearer abc.def.ghi"))
            .to_http_request();
        assert_eq!(bearer_token(&req).as_deref(), Some("abc.def.ghi"));

        for scheme in ["bearer", "BEARER", "BeArEr"] {
            let req = TestRequest::default()
                .insert_header((header::AUTHORIZATION, format!("{} abc.def.ghi", scheme)))
                .to_http_request();
            assert_eq!(bearer_token(&req).as_deref(), Some("abc.def.ghi"), "scheme {}", scheme);
        }

        let req = TestRequest::default()
            .insert_header((header::AUTHORIZATION, "Basic dXNlcjpwYXNz"))
            .to_http_request();
        assert!(bearer_token(&req).is_none());

        let req = TestRequest::default()
            .insert_header((header::AUTHORIZATION, "Bearer "))
            .to_http_request();
        assert!(bearer_token(&req).is_none());

        let req = TestRequest::default()
            .insert_header((header::AUTHORIZATION, "Bearerabc.def.ghi"))
            .to_http_request();
        assert!(bearer_token(&req).is_none());

        let req = TestRequest::default().to_http_request();
        assert!(bearer_token(&req).is_none());
    }
}
