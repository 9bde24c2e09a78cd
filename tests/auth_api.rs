mod common;

use actix_web::http::{header, StatusCode};
use actix_web::{test, web, App};
use chrono::{Duration, Utc};
use jsonwebtoken::Algorithm;
use login_api::TokenIssuer;
use serde_json::{json, Value};

macro_rules! app {
    ($state:expr) => {
        test::init_service(
            App::new()
                .app_data(web::Data::new($state))
                .configure(login_api::configure),
        )
        .await
    };
}

#[test_log::test(actix_web::test)]
async fn test_register_login_and_me() {
    let (state, _) = common::test_state();
    let app = app!(state);

    let register_response = test::TestRequest::post()
        .uri("/auth/register")
        .set_json(json!({ "username": "alice", "password": "hunter2" }))
        .send_request(&app)
        .await;
    assert_eq!(register_response.status(), StatusCode::OK);
    let registered: Value = test::read_body_json(register_response).await;
    assert_eq!(registered["username"], "alice");
    assert!(registered["id"].is_i64());
    assert!(registered.get("password_hash").is_none());

    let login_response = test::TestRequest::post()
        .uri("/auth/token")
        .set_form([("username", "alice"), ("password", "hunter2")])
        .send_request(&app)
        .await;
    assert_eq!(login_response.status(), StatusCode::OK);
    let login_body: Value = test::read_body_json(login_response).await;
    assert_eq!(login_body["token_type"], "Bearer");
    let token = login_body["access_token"].as_str().unwrap().to_string();

    let me_response = test::TestRequest::get()
        .uri("/auth/user/me")
        .insert_header((header::AUTHORIZATION, format!("Bearer {}", token)))
        .send_request(&app)
        .await;
    assert_eq!(me_response.status(), StatusCode::OK);
    let me: Value = test::read_body_json(me_response).await;
    assert_eq!(me, registered);

    for scheme in ["bearer", "BEARER"] {
        let response = test::TestRequest::get()
            .uri("/auth/user/me")
            .insert_header((header::AUTHORIZATION, format!("{} {}", scheme, token)))
            .send_request(&app)
            .await;
        assert_eq!(response.status(), StatusCode::OK, "scheme {}", scheme);
        let me: Value = test::read_body_json(response).await;
        assert_eq!(me, registered);
    }
}

#[test_log::test(actix_web::test)]
async fn test_json_login() {
    let (state, _) = common::test_state();
    let app = app!(state);

    test::TestRequest::post()
        .uri("/auth/register")
        .set_json(json!({ "username": "alice", "password": "hunter2" }))
        .send_request(&app)
        .await;

    let response = test::TestRequest::post()
        .uri("/auth/login")
        .set_json(json!({ "username": "alice", "password": "hunter2" }))
        .send_request(&app)
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = test::read_body_json(response).await;
    assert!(body["access_token"].as_str().is_some());
    assert_eq!(body["token_type"], "Bearer");
}

#[test_log::test(actix_web::test)]
async fn test_duplicate_registration() {
    let (state, store) = common::test_state();
    let app = app!(state);

    let first = test::TestRequest::post()
        .uri("/auth/register")
        .set_json(json!({ "username": "alice", "password": "hunter2" }))
        .send_request(&app)
        .await;
    assert_eq!(first.status(), StatusCode::OK);

    let second = test::TestRequest::post()
        .uri("/auth/register")
        .set_json(json!({ "username": "alice", "password": "something-else" }))
        .send_request(&app)
        .await;
    assert_eq!(second.status(), StatusCode::BAD_REQUEST);
    assert_eq!(store.len().await, 1);
}

#[test_log::test(actix_web::test)]
async fn test_invalid_login_is_indistinguishable() {
    let (state, _) = common::test_state();
    let app = app!(state);

    test::TestRequest::post()
        .uri("/auth/register")
        .set_json(json!({ "username": "alice", "password": "hunter2" }))
        .send_request(&app)
        .await;

    let wrong_password = test::TestRequest::post()
        .uri("/auth/token")
        .set_form([("username", "alice"), ("password", "wrong")])
        .send_request(&app)
        .await;
    let unknown_user = test::TestRequest::post()
        .uri("/auth/token")
        .set_form([("username", "nonexistent"), ("password", "wrong")])
        .send_request(&app)
        .await;

    assert_eq!(wrong_password.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(unknown_user.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(
        wrong_password.headers().get(header::WWW_AUTHENTICATE).unwrap(),
        "Bearer"
    );

    let wrong_password: Value = test::read_body_json(wrong_password).await;
    let unknown_user: Value = test::read_body_json(unknown_user).await;
    assert_eq!(wrong_password, unknown_user);
}

#[test_log::test(actix_web::test)]
async fn test_invalid_registration() {
    let (state, store) = common::test_state();
    let app = app!(state);

    let response = test::TestRequest::post()
        .uri("/auth/register")
        .set_json(json!({ "username": "alice", "password": "" }))
        .send_request(&app)
        .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(store.is_empty().await);
}

#[test_log::test(actix_web::test)]
async fn test_me_rejects_bad_tokens() {
    let (state, _) = common::test_state();
    let auth = state.auth_service.clone();
    let app = app!(state);

    test::TestRequest::post()
        .uri("/auth/register")
        .set_json(json!({ "username": "alice", "password": "hunter2" }))
        .send_request(&app)
        .await;

    let expired = auth
        .tokens()
        .issue_at("alice", Utc::now() - Duration::hours(2))
        .unwrap();
    let forged = TokenIssuer::new(b"not-the-secret", Algorithm::HS256, Duration::minutes(30))
        .unwrap()
        .issue("alice")
        .unwrap();

    let cases = [
        None,
        Some("Bearer invalid_token".to_string()),
        Some(format!("Bearer {}", expired)),
        Some(format!("Bearer {}", forged)),
        Some(format!("Basic {}", forged)),
    ];

    for authorization in cases {
        let mut req = test::TestRequest::get().uri("/auth/user/me");
        if let Some(value) = &authorization {
            req = req.insert_header((header::AUTHORIZATION, value.as_str()));
        }
        let response = req.send_request(&app).await;
        assert_eq!(
            response.status(),
            StatusCode::UNAUTHORIZED,
            "authorization {:?} should be rejected",
            authorization
        );
        assert_eq!(
            response.headers().get(header::WWW_AUTHENTICATE).unwrap(),
            "Bearer"
        );
    }
}

#[test_log::test(actix_web::test)]
async fn test_me_after_user_removed() {
    let (state, store) = common::test_state();
    let app = app!(state);

    test::TestRequest::post()
        .uri("/auth/register")
        .set_json(json!({ "username": "alice", "password": "hunter2" }))
        .send_request(&app)
        .await;
    let login: Value = test::call_and_read_body_json(
        &app,
        test::TestRequest::post()
            .uri("/auth/login")
            .set_json(json!({ "username": "alice", "password": "hunter2" }))
            .to_request(),
    )
    .await;
    let token = login["access_token"].as_str().unwrap().to_string();

    store.remove("alice").await;

    let response = test::TestRequest::get()
        .uri("/auth/user/me")
        .insert_header((header::AUTHORIZATION, format!("Bearer {}", token)))
        .send_request(&app)
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[test_log::test(actix_web::test)]
async fn test_malformed_bodies_use_error_envelope() {
    let (state, store) = common::test_state();
    let app = app!(state);

    let requests = [
        test::TestRequest::post()
            .uri("/auth/register")
            .set_json(json!({ "username": "alice" })),
        test::TestRequest::post()
            .uri("/auth/login")
            .insert_header((header::CONTENT_TYPE, "application/json"))
            .set_payload("not json"),
        test::TestRequest::post()
            .uri("/auth/token")
            .set_form([("username", "alice")]),
    ];

    for req in requests {
        let response = req.send_request(&app).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body: Value = test::read_body_json(response).await;
        assert_eq!(body["error"]["status"], 400);
        assert!(body["error"]["message"]
            .as_str()
            .unwrap()
            .starts_with("Validation error"));
    }
    assert!(store.is_empty().await);
}
