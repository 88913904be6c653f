//! Registration record construction.
use atithi_common::RegistrationRecord;
use chrono::{DateTime, Duration, Utc};
use sha2::{Digest, Sha256};

use crate::validation::ValidatedRegistration;

/// Lowercase hex SHA-256 of an identifier, matching the hash the web form
/// computes in the browser
pub fn hash_identifier(identifier: &str) -> String {
    hex::encode(Sha256::digest(identifier.as_bytes()))
}

/// Build the stored record. The server clock is authoritative for both
/// timestamps; a missing id gets a UUID.
pub fn build_record(validated: ValidatedRegistration, now: DateTime<Utc>) -> RegistrationRecord {
    let id = validated
        .id
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

    RegistrationRecord {
        id,
        name: validated.name,
        id_hash: validated.id_hash,
        days: validated.days,
        created_at: now,
        expires_at: now + Duration::days(i64::from(validated.days)),
    }
}
