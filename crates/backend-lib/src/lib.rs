// ============================
// atithi-backend/src/lib.rs
// ============================
//! Core backend-lib functionality for the Atithi Guardian registration API.

pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod registrations;
pub mod router;
pub mod storage;
pub mod validation;

use std::sync::Arc;

use crate::auth::{AuthService, DefaultAuth};
use crate::config::Settings;
use crate::error::AppError;
use crate::middleware::RateLimiter;
use crate::storage::{open_store, CredentialStore};

pub use crate::router::create_router;

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    /// Authentication service
    pub auth: Arc<dyn AuthService>,
    /// Credential store
    pub store: Arc<dyn CredentialStore>,
    /// Validated settings
    pub settings: Arc<Settings>,
    /// Limits `/api/admin/*`
    pub admin_rate_limiter: Arc<RateLimiter>,
    /// Limits `/api/registrations*`
    pub registration_rate_limiter: Arc<RateLimiter>,
}

impl AppState {
    /// Wire the auth service to `store` and seed the first admin if the
    /// store has none
    pub async fn new(store: Arc<dyn CredentialStore>, settings: Settings) -> Result<Self, AppError> {
        let auth = DefaultAuth::from_settings(store.clone(), &settings.auth)?;
        if let Some(seed) = &settings.auth.seed_admin {
            auth.seed_admin(seed).await?;
        }

        Ok(Self {
            auth: Arc::new(auth),
            store,
            admin_rate_limiter: Arc::new(RateLimiter::from_limit(settings.rate_limit.admin)),
            registration_rate_limiter: Arc::new(RateLimiter::from_limit(
                settings.rate_limit.registrations,
            )),
            settings: Arc::new(settings),
        })
    }

    /// Open the configured store, then build the state
    pub async fn from_settings(settings: Settings) -> Result<Self, AppError> {
        let store = open_store(&settings.storage).await?;
        Self::new(store, settings).await
    }

    /// Forget clients whose rate limit window has passed
    pub fn cleanup_rate_limiters(&self) {
        self.admin_rate_limiter.cleanup();
        self.registration_rate_limiter.cleanup();
    }
}
