// ============================
// crates/backend-lib/src/validation/mod.rs
// ============================
//! Request validation.
//!
//! Wire bodies arrive with every field optional. The functions here check
//! them once, at the boundary, and hand back typed values the auth service
//! and the store can trust.

use std::sync::LazyLock;

use atithi_common::{LoginRequest, NewRegistration, RegisterAdminRequest};
use regex::Regex;
use thiserror::Error;
use zeroize::Zeroizing;

use crate::auth::MAX_PASSWORD_BYTES;
use crate::registrations::hash_identifier;

const MAX_NAME_LENGTH: usize = 200;
const MAX_ID_NUMBER_LENGTH: usize = 64;
const MIN_DAYS: i64 = 1;
const MAX_DAYS: i64 = 365;

static USERNAME_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_.-]{3,64}$").unwrap());
static REGISTRATION_ID_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9._-]{1,64}$").unwrap());
static ID_HASH_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9a-fA-F]{64}$").unwrap());

/// Possible validation errors
#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("Username and password are required")]
    MissingCredentials,

    #[error("Invalid username: {0}")]
    InvalidUsername(String),

    #[error("Invalid password: {0}")]
    InvalidPassword(String),

    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    #[error("Invalid name: {0}")]
    InvalidName(String),

    #[error("Invalid days: {0}")]
    InvalidDays(String),

    #[error("Invalid identity: {0}")]
    InvalidIdentity(String),

    #[error("Invalid registration id: {0}")]
    InvalidRegistrationId(String),

    #[error("Invalid request body: {0}")]
    MalformedBody(String),

    #[error("Invalid query: {0}")]
    InvalidQuery(String),
}

/// Result type for validation operations
pub type ValidationResult<T> = Result<T, ValidationError>;

/// A username/password pair with both fields present
pub struct Credentials {
    pub username: String,
    pub password: Zeroizing<String>,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .finish_non_exhaustive()
    }
}

/// Admin provisioning input
#[derive(Debug)]
pub struct AdminRegistration {
    pub credentials: Credentials,
    pub provisioning_key: Option<Zeroizing<String>>,
}

/// A registration body that passed validation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedRegistration {
    /// Client id, if one was supplied
    pub id: Option<String>,
    pub name: String,
    /// Lowercase hex SHA-256 of the identifier
    pub id_hash: String,
    pub days: u32,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

/// Login bodies only need both fields present. Lookup decides the rest, so
/// malformed usernames fail as invalid credentials rather than revealing
/// the username rules.
pub fn validate_login(request: LoginRequest) -> ValidationResult<Credentials> {
    let (Some(username), Some(password)) =
        (non_empty(request.username), non_empty(request.password))
    else {
        return Err(ValidationError::MissingCredentials);
    };

    if password.len() > MAX_PASSWORD_BYTES {
        return Err(ValidationError::InvalidPassword(format!(
            "Password cannot exceed {MAX_PASSWORD_BYTES} bytes"
        )));
    }

    Ok(Credentials {
        username,
        password: Zeroizing::new(password),
    })
}

/// Validate a username chosen at provisioning time
pub fn validate_username(username: &str) -> ValidationResult<&str> {
    if !USERNAME_REGEX.is_match(username) {
        return Err(ValidationError::InvalidUsername(
            "Username must be 3 to 64 letters, digits, '.', '_' or '-'".to_string(),
        ));
    }
    Ok(username)
}

/// Validate an admin provisioning body
pub fn validate_admin_registration(
    request: RegisterAdminRequest,
) -> ValidationResult<AdminRegistration> {
    let credentials = validate_login(LoginRequest {
        username: request.username,
        password: request.password,
    })?;
    validate_username(&credentials.username)?;

    Ok(AdminRegistration {
        credentials,
        provisioning_key: request.provisioning_key.map(Zeroizing::new),
    })
}

/// Validate a registration id (client supplied or from a path)
pub fn validate_registration_id(id: &str) -> ValidationResult<&str> {
    if !REGISTRATION_ID_REGEX.is_match(id) {
        return Err(ValidationError::InvalidRegistrationId(
            "Id must be 1 to 64 letters, digits, '.', '_' or '-'".to_string(),
        ));
    }
    Ok(id)
}

/// Validate an identifier hash and normalise it to lowercase
pub fn validate_id_hash(id_hash: &str) -> ValidationResult<String> {
    if !ID_HASH_REGEX.is_match(id_hash) {
        return Err(ValidationError::InvalidIdentity(
            "idHash must be 64 hexadecimal characters".to_string(),
        ));
    }
    Ok(id_hash.to_ascii_lowercase())
}

/// Validate a new registration body
pub fn validate_registration(request: NewRegistration) -> ValidationResult<ValidatedRegistration> {
    let name = request
        .name
        .as_deref()
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .ok_or(ValidationError::MissingField("name"))?;
    if name.chars().count() > MAX_NAME_LENGTH {
        return Err(ValidationError::InvalidName(format!(
            "Name cannot exceed {MAX_NAME_LENGTH} characters"
        )));
    }

    let days = request.days.ok_or(ValidationError::MissingField("days"))?;
    if !(MIN_DAYS..=MAX_DAYS).contains(&days) {
        return Err(ValidationError::InvalidDays(format!(
            "Days must be between {MIN_DAYS} and {MAX_DAYS}"
        )));
    }
    let days = u32::try_from(days)
        .map_err(|_| ValidationError::InvalidDays(format!("{days} is out of range")))?;

    let id_hash = match (non_empty(request.id_hash), non_empty(request.id_number)) {
        (Some(id_hash), _) => validate_id_hash(id_hash.trim())?,
        (None, Some(id_number)) => {
            let id_number = Zeroizing::new(id_number);
            let trimmed = id_number.trim();
            if trimmed.is_empty() || trimmed.chars().count() > MAX_ID_NUMBER_LENGTH {
                return Err(ValidationError::InvalidIdentity(format!(
                    "idNumber must be 1 to {MAX_ID_NUMBER_LENGTH} characters"
                )));
            }
            hash_identifier(trimmed)
        },
        (None, None) => return Err(ValidationError::MissingField("idHash")),
    };

    let id = match non_empty(request.id) {
        Some(id) => Some(validate_registration_id(&id)?.to_string()),
        None => None,
    };

    Ok(ValidatedRegistration {
        id,
        name: name.to_string(),
        id_hash,
        days,
    })
}
