// ==============
// crates/backend-lib/src/metrics.rs

//! Central place for metric keys
pub const LOGIN_SUCCESS: &str = "auth.login.success";
pub const LOGIN_FAILURE: &str = "auth.login.failure";
pub const TOKEN_REJECTED: &str = "auth.token.rejected";
pub const ADMIN_PROVISIONED: &str = "auth.admin.provisioned";
pub const PROVISIONING_DENIED: &str = "auth.admin.provisioning_denied";
pub const RATE_LIMITED: &str = "http.rate_limited";
pub const REGISTRATION_CREATED: &str = "registration.created";
pub const REGISTRATION_DELETED: &str = "registration.deleted";
