//! End-to-end admin authentication through the router
use atithi_backend::auth::{Claims, TokenIssuer};
use axum::http::{Method, StatusCode};
use chrono::{Duration, Utc};
use serde_json::json;

use crate::test_utils::{
    login, request, send, test_app, test_settings, TEST_JWT_SECRET, TEST_PROVISIONING_KEY,
};

#[tokio::test]
async fn test_login_returns_profile_and_token() {
    let (app, state) = test_app(test_settings()).await;

    let (status, body) = send(
        &app,
        request(
            Method::POST,
            "/api/admin/login",
            Some(json!({ "username": "admin", "password": "admin123" })),
            None,
        ),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["admin"]["username"], "admin");
    assert!(body["admin"]["id"].is_string());
    assert!(body["admin"].get("passwordHash").is_none());

    let claims = state.auth.verify_token(body["token"].as_str().unwrap()).unwrap();
    assert!(claims.is_admin);
    assert_eq!(claims.username, "admin");
}

#[tokio::test]
async fn test_login_failures_are_indistinguishable() {
    let (app, _) = test_app(test_settings()).await;

    let attempt = |username: &'static str, password: &'static str| {
        request(
            Method::POST,
            "/api/admin/login",
            Some(json!({ "username": username, "password": password })),
            None,
        )
    };

    let (wrong_status, wrong_body) = send(&app, attempt("admin", "wrong")).await;
    let (unknown_status, unknown_body) = send(&app, attempt("nope", "admin123")).await;

    assert_eq!(wrong_status, StatusCode::UNAUTHORIZED);
    assert_eq!(unknown_status, StatusCode::UNAUTHORIZED);
    assert_eq!(wrong_body, unknown_body);
    assert_eq!(wrong_body["code"], "AUTH_001");
}

#[tokio::test]
async fn test_login_requires_both_fields() {
    let (app, _) = test_app(test_settings()).await;

    for body in [
        json!({ "username": "admin" }),
        json!({ "password": "admin123" }),
        json!({ "username": "", "password": "" }),
        json!({}),
    ] {
        let (status, reply) = send(
            &app,
            request(Method::POST, "/api/admin/login", Some(body), None),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(reply["code"], "VAL_001");
    }
}

#[tokio::test]
async fn test_login_rejects_malformed_json() {
    let (app, _) = test_app(test_settings()).await;

    let malformed = axum::http::Request::builder()
        .method(Method::POST)
        .uri("/api/admin/login")
        .header("content-type", "application/json")
        .body(axum::body::Body::from("{ username: admin"))
        .unwrap();
    let (status, body) = send(&app, malformed).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VAL_001");
}

#[tokio::test]
async fn test_login_without_admins_is_server_error() {
    let mut settings = test_settings();
    settings.auth.seed_admin = None;
    let (app, _) = test_app(settings).await;

    let (status, body) = send(
        &app,
        request(
            Method::POST,
            "/api/admin/login",
            Some(json!({ "username": "admin", "password": "admin123" })),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["code"], "AUTH_006");
}

#[tokio::test]
async fn test_admin_routes_require_token() {
    let (app, _) = test_app(test_settings()).await;

    let (status, body) = send(
        &app,
        request(Method::GET, "/api/admin/registrations", None, None),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "AUTH_002");

    let (status, _) = send(
        &app,
        request(
            Method::GET,
            "/api/admin/registrations",
            None,
            Some("not.a.token"),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let token = login(&app, "admin", "admin123").await;
    let (status, body) = send(
        &app,
        request(Method::GET, "/api/admin/registrations", None, Some(&token)),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!([]));
}

#[tokio::test]
async fn test_non_admin_token_is_forbidden() {
    let (app, _) = test_app(test_settings()).await;

    let issuer = TokenIssuer::new(TEST_JWT_SECRET.as_bytes(), Duration::hours(1));
    let now = Utc::now().timestamp();
    let token = issuer
        .encode(&Claims {
            id: "visitor_1".to_string(),
            username: "visitor".to_string(),
            is_admin: false,
            iat: now,
            exp: now + 3600,
        })
        .unwrap();

    let (status, body) = send(
        &app,
        request(Method::DELETE, "/api/admin/registrations", None, Some(&token)),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], "AUTH_003");
}

#[tokio::test]
async fn test_expired_token_is_rejected() {
    let (app, _) = test_app(test_settings()).await;

    let issuer = TokenIssuer::new(TEST_JWT_SECRET.as_bytes(), Duration::hours(24));
    let issued = Utc::now() - Duration::hours(25);
    let token = issuer
        .encode(&Claims {
            id: "admin_1".to_string(),
            username: "admin".to_string(),
            is_admin: true,
            iat: issued.timestamp(),
            exp: (issued + Duration::hours(24)).timestamp(),
        })
        .unwrap();

    let (status, _) = send(
        &app,
        request(Method::GET, "/api/admin/registrations", None, Some(&token)),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_register_admin_flow() {
    let (app, _) = test_app(test_settings()).await;
    let register = |key: Option<&str>, username: &str, password: &str| {
        request(
            Method::POST,
            "/api/admin/register",
            Some(json!({
                "username": username,
                "password": password,
                "provisioningKey": key,
            })),
            None,
        )
    };

    let (status, body) = send(&app, register(Some(TEST_PROVISIONING_KEY), "ops", "opspass1")).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["success"], true);
    assert_eq!(body["admin"]["username"], "ops");

    login(&app, "ops", "opspass1").await;

    let (status, body) = send(&app, register(Some(TEST_PROVISIONING_KEY), "ops", "opspass2")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "AUTH_004");

    let (status, body) = send(&app, register(Some(TEST_PROVISIONING_KEY), "ops", "weak")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "AUTH_004");

    let (status, _) = send(&app, register(Some("wrong"), "ops2", "opspass1")).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = send(&app, register(None, "ops2", "opspass1")).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = send(&app, register(Some(TEST_PROVISIONING_KEY), "ops2", "weak")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "AUTH_005");

    // The original password still works after the failed duplicate
    login(&app, "ops", "opspass1").await;
}

#[tokio::test]
async fn test_legacy_admin_key_field() {
    let (app, _) = test_app(test_settings()).await;

    let (status, _) = send(
        &app,
        request(
            Method::POST,
            "/api/admin/register",
            Some(json!({
                "username": "legacy",
                "password": "legacy123",
                "adminKey": TEST_PROVISIONING_KEY,
            })),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
}

#[tokio::test]
async fn test_admin_rate_limit() {
    let mut settings = test_settings();
    settings.rate_limit.admin.max_requests = 3;
    let (app, _) = test_app(settings).await;

    let attempt = || {
        let mut req = request(
            Method::POST,
            "/api/admin/login",
            Some(json!({ "username": "admin", "password": "wrong" })),
            None,
        );
        req.headers_mut()
            .insert("x-real-ip", "192.0.2.10".parse().unwrap());
        req
    };

    for _ in 0..3 {
        let (status, _) = send(&app, attempt()).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }
    let (status, body) = send(&app, attempt()).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(body["code"], "RATE_001");
}
