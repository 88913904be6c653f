//! Liveness probe.
use std::sync::Arc;

use atithi_common::HealthStatus;
use axum::{extract::State, Json};
use chrono::Utc;

use crate::AppState;

pub async fn health(State(state): State<Arc<AppState>>) -> Json<HealthStatus> {
    Json(HealthStatus {
        status: "ok".to_string(),
        environment: state.settings.server.environment.clone(),
        timestamp: Utc::now(),
    })
}
