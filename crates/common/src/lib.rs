// ================
// common/src/lib.rs
// ================
//! Common types and structures
//! exchanged between the Atithi Guardian web client and the backend.
//! Field names follow the camelCase JSON the web form and admin panel use.

use chrono::{DateTime, Utc};
use serde::{de, Deserialize, Deserializer, Serialize};

/// Public projection of an admin account. Never carries the password hash.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct AdminProfile {
    /// Opaque account identifier
    pub id: String,
    /// Unique, case-sensitive login name
    pub username: String,
}

/// A stored tourist registration
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationRecord {
    pub id: String,
    pub name: String,
    /// Hex SHA-256 of the trimmed government ID number
    pub id_hash: String,
    /// Trip duration in days. Older data files may hold fractional values,
    /// which are rounded up; `expiresAt` stays authoritative.
    #[serde(deserialize_with = "whole_days")]
    pub days: u32,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

fn whole_days<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    let days = f64::deserialize(deserializer)?;
    if !days.is_finite() || days < 0.0 || days > f64::from(u32::MAX) {
        return Err(de::Error::custom(format!("invalid days value {days}")));
    }
    Ok(days.ceil() as u32)
}

impl RegistrationRecord {
    /// Whether the registration is still valid at `now`
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }
}

/// Body of `POST /api/registrations`.
///
/// Every field is optional on the wire so that missing fields are reported
/// by the backend's validation instead of a deserialization rejection.
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct NewRegistration {
    /// Client-chosen identifier; the server generates one when absent
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    /// Pre-hashed identifier as computed by the web form
    #[serde(default)]
    pub id_hash: Option<String>,
    /// Raw identifier; hashed by the server and never stored
    #[serde(default)]
    pub id_number: Option<String>,
    #[serde(default)]
    pub days: Option<i64>,
}

/// Body of `POST /api/admin/login`
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct LoginRequest {
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

/// Successful login reply
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct LoginResponse {
    pub admin: AdminProfile,
    /// Signed bearer token
    pub token: String,
}

/// Body of `POST /api/admin/register`
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct RegisterAdminRequest {
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    /// Shared provisioning secret. Older clients send it as `adminKey`.
    #[serde(default, alias = "adminKey")]
    pub provisioning_key: Option<String>,
}

/// Reply to a successful admin provisioning
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct RegisterAdminResponse {
    pub success: bool,
    pub admin: AdminProfile,
}

/// Generic acknowledgement for delete operations
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct SuccessResponse {
    pub success: bool,
}

impl SuccessResponse {
    pub const OK: Self = Self { success: true };
}

/// Reply of `GET /api/health`
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct HealthStatus {
    pub status: String,
    pub environment: String,
    pub timestamp: DateTime<Utc>,
}
