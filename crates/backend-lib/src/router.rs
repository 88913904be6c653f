// ============================
// crates/backend-lib/src/router.rs
// ============================
//! HTTP router: `/api` routes plus the shared tower layers.
use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderValue, Method},
    middleware::from_fn_with_state,
    routing::{delete, get, post},
    Router,
};
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    set_header::SetResponseHeaderLayer,
    trace::TraceLayer,
};

use crate::config::ServerSettings;
use crate::error::AppError;
use crate::handlers::{admin, health, registrations};
use crate::middleware::{rate_limit, require_admin};
use crate::AppState;

const CORS_MAX_AGE: Duration = Duration::from_secs(24 * 60 * 60);

/// Build the application router
pub fn create_router(state: Arc<AppState>) -> Router {
    // Routes above `route_layer` need an admin token; login and register
    // stay open. The rate limit covers the whole group.
    let admin_routes = Router::new()
        .route(
            "/registrations",
            get(admin::list_registrations).delete(admin::delete_all_registrations),
        )
        .route("/registrations/{id}", delete(admin::delete_registration))
        .route_layer(from_fn_with_state(state.clone(), require_admin))
        .route("/login", post(admin::login))
        .route("/register", post(admin::register_admin))
        .layer(from_fn_with_state(
            state.admin_rate_limiter.clone(),
            rate_limit,
        ));

    let registration_routes = Router::new()
        .route(
            "/registrations",
            post(registrations::create_registration).get(registrations::find_registrations),
        )
        .route("/registrations/{id}", get(registrations::get_registration))
        .layer(from_fn_with_state(
            state.registration_rate_limiter.clone(),
            rate_limit,
        ));

    let api = Router::new()
        .route("/health", get(health::health))
        .nest("/admin", admin_routes)
        .merge(registration_routes);

    let max_body_bytes = state.settings.server.max_body_bytes;
    let cors = cors_layer(&state.settings.server);

    Router::new()
        .nest("/api", api)
        .fallback(not_found)
        .layer(DefaultBodyLimit::max(max_body_bytes))
        .layer(SetResponseHeaderLayer::if_not_present(
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            header::X_FRAME_OPTIONS,
            HeaderValue::from_static("DENY"),
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            header::STRICT_TRANSPORT_SECURITY,
            HeaderValue::from_static("max-age=31536000; includeSubDomains"),
        ))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn not_found() -> AppError {
    AppError::NotFound("Route".to_string())
}

/// CORS for the configured origin list (`*` for any)
pub fn cors_layer(settings: &ServerSettings) -> CorsLayer {
    let origin = if settings.cors_origin.trim() == "*" {
        AllowOrigin::any()
    } else {
        let origins: Vec<HeaderValue> = settings
            .cors_origin
            .split(',')
            .map(str::trim)
            .filter(|o| !o.is_empty())
            .filter_map(|o| match HeaderValue::from_str(o) {
                Ok(value) => Some(value),
                Err(_) => {
                    tracing::warn!(origin = o, "Ignoring invalid CORS origin");
                    None
                },
            })
            .collect();
        AllowOrigin::list(origins)
    };

    CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            header::CACHE_CONTROL,
        ])
        .max_age(CORS_MAX_AGE)
}
