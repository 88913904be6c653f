// ============================
// crates/backend-lib/src/handlers/admin.rs
// ============================
//! Admin endpoints: login, provisioning and registration management.
use std::sync::Arc;

use atithi_common::{
    LoginRequest, LoginResponse, RegisterAdminRequest, RegisterAdminResponse, RegistrationRecord,
    SuccessResponse,
};
use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    Extension, Json,
};
use chrono::Utc;
use metrics::counter;
use serde::Deserialize;

use crate::auth::Claims;
use crate::error::AppError;
use crate::metrics::REGISTRATION_DELETED;
use crate::validation;
use crate::AppState;

/// `POST /api/admin/login`
pub async fn login(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<LoginResponse>, AppError> {
    let Json(request) = payload?;
    let credentials = validation::validate_login(request)?;

    let response = state
        .auth
        .authenticate(&credentials.username, &credentials.password)
        .await?;
    Ok(Json(response))
}

/// `POST /api/admin/register`
pub async fn register_admin(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<RegisterAdminRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<RegisterAdminResponse>), AppError> {
    let Json(request) = payload?;
    let registration = validation::validate_admin_registration(request)?;

    let admin = state
        .auth
        .provision_admin(
            &registration.credentials.username,
            &registration.credentials.password,
            registration.provisioning_key.as_deref().map(String::as_str),
        )
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(RegisterAdminResponse {
            success: true,
            admin,
        }),
    ))
}

/// Filter for the admin listing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusFilter {
    Active,
    Expired,
}

#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub status: Option<StatusFilter>,
}

/// `GET /api/admin/registrations[?status=active|expired]`
pub async fn list_registrations(
    State(state): State<Arc<AppState>>,
    query: Result<Query<ListQuery>, QueryRejection>,
) -> Result<Json<Vec<RegistrationRecord>>, AppError> {
    let Query(query) = query?;
    let mut records = state.store.list_registrations().await?;

    if let Some(filter) = query.status {
        let now = Utc::now();
        records.retain(|r| r.is_active(now) == (filter == StatusFilter::Active));
    }

    Ok(Json(records))
}

/// `DELETE /api/admin/registrations/{id}`
pub async fn delete_registration(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<String>,
) -> Result<Json<SuccessResponse>, AppError> {
    if !state.store.delete_registration(&id).await? {
        return Err(AppError::NotFound("Registration".to_string()));
    }

    counter!(REGISTRATION_DELETED).increment(1);
    tracing::info!(registration_id = %id, admin = %claims.username, "Registration deleted");
    Ok(Json(SuccessResponse::OK))
}

/// `DELETE /api/admin/registrations`
pub async fn delete_all_registrations(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<SuccessResponse>, AppError> {
    state.store.delete_all_registrations().await?;

    tracing::warn!(admin = %claims.username, "All registrations cleared");
    Ok(Json(SuccessResponse::OK))
}
