//! Public registration endpoints used by the tourist web form.
use std::sync::Arc;

use atithi_common::{NewRegistration, RegistrationRecord};
use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    Json,
};
use chrono::Utc;
use metrics::counter;
use serde::Deserialize;

use crate::error::AppError;
use crate::metrics::REGISTRATION_CREATED;
use crate::registrations::build_record;
use crate::validation;
use crate::AppState;

/// `POST /api/registrations`
pub async fn create_registration(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<NewRegistration>, JsonRejection>,
) -> Result<(StatusCode, Json<RegistrationRecord>), AppError> {
    let Json(request) = payload?;
    let validated = validation::validate_registration(request)?;
    let record = build_record(validated, Utc::now());

    state.store.insert_registration(record.clone()).await?;

    counter!(REGISTRATION_CREATED).increment(1);
    tracing::info!(registration_id = %record.id, days = record.days, "Registration created");
    Ok((StatusCode::CREATED, Json(record)))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LookupQuery {
    pub id_hash: Option<String>,
}

/// `GET /api/registrations?idHash=...`. Without a hash nothing is listed.
pub async fn find_registrations(
    State(state): State<Arc<AppState>>,
    query: Result<Query<LookupQuery>, QueryRejection>,
) -> Result<Json<Vec<RegistrationRecord>>, AppError> {
    let Query(query) = query?;
    let Some(id_hash) = query.id_hash.filter(|h| !h.is_empty()) else {
        return Ok(Json(Vec::new()));
    };

    let id_hash = validation::validate_id_hash(&id_hash)?;
    let records = state.store.find_registrations_by_id_hash(&id_hash).await?;
    Ok(Json(records))
}

/// `GET /api/registrations/{id}`
pub async fn get_registration(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<RegistrationRecord>, AppError> {
    state
        .store
        .find_registration(&id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound("Registration".to_string()))
}
