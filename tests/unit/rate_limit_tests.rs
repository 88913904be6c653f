// ==============================
// tests/unit/rate_limit_tests.rs
// ==============================
//! Fixed-window limiter and its middleware
use std::sync::Arc;
use std::time::Duration;

use atithi_backend::middleware::{rate_limit, RateLimiter};
use axum::{
    body::Body,
    http::{Request, StatusCode},
    middleware::from_fn_with_state,
    routing::get,
    Router,
};
use tower::ServiceExt;

fn limited_app(max_requests: u32) -> Router {
    let limiter = Arc::new(RateLimiter::new(Duration::from_secs(60), max_requests));
    Router::new()
        .route("/", get(|| async { "ok" }))
        .layer(from_fn_with_state(limiter, rate_limit))
}

fn from_ip(ip: &str) -> Request<Body> {
    Request::builder()
        .uri("/")
        .header("x-real-ip", ip)
        .body(Body::empty())
        .unwrap()
}

#[test]
fn test_limiter_counts_per_client() {
    let limiter = RateLimiter::new(Duration::from_secs(60), 3);

    for _ in 0..3 {
        assert!(limiter.check("10.0.0.1"));
    }
    assert!(!limiter.check("10.0.0.1"));
    assert!(limiter.check("10.0.0.2"));
    assert_eq!(limiter.tracked_clients(), 2);
}

#[tokio::test]
async fn test_window_expiry_and_cleanup() {
    let limiter = RateLimiter::new(Duration::from_millis(50), 1);
    assert!(limiter.check("10.0.0.1"));
    assert!(!limiter.check("10.0.0.1"));

    tokio::time::sleep(Duration::from_millis(80)).await;

    limiter.cleanup();
    assert_eq!(limiter.tracked_clients(), 0);
    assert!(limiter.check("10.0.0.1"));
}

#[tokio::test]
async fn test_middleware_returns_429() {
    let app = limited_app(2);

    for _ in 0..2 {
        let response = app.clone().oneshot(from_ip("127.0.0.1")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    let response = app.clone().oneshot(from_ip("127.0.0.1")).await.unwrap();
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);

    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["code"], "RATE_001");

    // Another client is unaffected
    let response = app.oneshot(from_ip("127.0.0.2")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_forwarded_for_identifies_client() {
    let app = limited_app(1);
    let forwarded = |chain: &str| {
        Request::builder()
            .uri("/")
            .header("x-forwarded-for", chain)
            .body(Body::empty())
            .unwrap()
    };

    let response = app.clone().oneshot(forwarded("203.0.113.5, 10.0.0.1")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app.clone().oneshot(forwarded("203.0.113.5")).await.unwrap();
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);

    let response = app.oneshot(forwarded("203.0.113.6, 10.0.0.1")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}
