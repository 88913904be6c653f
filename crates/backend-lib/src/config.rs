// ============================
// atithi-backend/src/config.rs
// ============================
//! Configuration management.
//!
//! Settings are layered with figment: built-in defaults, then an optional
//! TOML file, then `ATITHI_` environment variables where `__` separates
//! sections (`ATITHI_AUTH__JWT_SECRET`, `ATITHI_SERVER__PORT`).

use std::net::{IpAddr, SocketAddr};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::auth::{PasswordRequirements, PasswordScheme};

/// Environment variable prefix
pub const ENV_PREFIX: &str = "ATITHI_";

/// Minimum accepted length of a configured signing secret
pub const MIN_JWT_SECRET_LENGTH: usize = 16;

/// Longest accepted token lifetime (one year)
pub const MAX_TOKEN_TTL_HOURS: i64 = 24 * 365;

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] Box<figment::Error>),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

impl From<figment::Error> for ConfigError {
    fn from(e: figment::Error) -> Self {
        ConfigError::Load(Box::new(e))
    }
}

/// Application settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub server: ServerSettings,
    pub storage: StorageSettings,
    pub auth: AuthSettings,
    pub rate_limit: RateLimitSettings,
    pub logging: LoggingSettings,
}

/// HTTP listener settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    /// Free-form deployment name reported by the health endpoint
    pub environment: String,
    /// Allowed CORS origin, `*` for any
    pub cors_origin: String,
    /// Maximum accepted request body in bytes
    pub max_body_bytes: usize,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 5000,
            environment: "development".to_string(),
            cors_origin: "*".to_string(),
            max_body_bytes: 1024 * 1024,
        }
    }
}

/// Which credential store to open
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    File,
    Memory,
    Sqlite,
    /// Needs the `postgres` feature
    Postgres,
}

/// Storage settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageSettings {
    pub backend: StorageBackend,
    /// JSON data file for the file backend
    pub path: PathBuf,
    /// Optional JSON snapshot seeding the memory backend
    pub snapshot: Option<PathBuf>,
    /// Connection URL for the sqlite and postgres backends
    pub database_url: String,
    pub max_connections: u32,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            backend: StorageBackend::File,
            path: PathBuf::from("data/data.json"),
            snapshot: None,
            database_url: "sqlite://data/atithi.db".to_string(),
            max_connections: 5,
        }
    }
}

/// Account created on startup when the store holds no admin
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeedAdmin {
    pub username: String,
    pub password: String,
}

impl SeedAdmin {
    /// Whether this is the well-known development account
    pub fn is_default(&self) -> bool {
        let default = Self::default();
        self.username == default.username && self.password == default.password
    }
}

impl Default for SeedAdmin {
    fn default() -> Self {
        Self {
            username: "admin".to_string(),
            password: "admin123".to_string(),
        }
    }
}

/// Authentication settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthSettings {
    /// HS256 signing secret. A random one is generated when unset.
    pub jwt_secret: Option<String>,
    pub token_ttl_hours: i64,
    /// Shared secret gating `POST /api/admin/register`
    pub provisioning_key: Option<String>,
    /// Let anyone provision admins (local development only)
    pub open_provisioning: bool,
    pub password_scheme: PasswordScheme,
    pub password_requirements: PasswordRequirements,
    pub seed_admin: Option<SeedAdmin>,
}

impl Default for AuthSettings {
    fn default() -> Self {
        Self {
            jwt_secret: None,
            token_ttl_hours: 24,
            provisioning_key: None,
            open_provisioning: false,
            password_scheme: PasswordScheme::default(),
            password_requirements: PasswordRequirements::default(),
            seed_admin: Some(SeedAdmin::default()),
        }
    }
}

/// One fixed window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowLimit {
    pub window_secs: u64,
    pub max_requests: u32,
}

/// Rate limits per route group
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitSettings {
    pub admin: WindowLimit,
    pub registrations: WindowLimit,
}

impl Default for RateLimitSettings {
    fn default() -> Self {
        Self {
            admin: WindowLimit {
                window_secs: 15 * 60,
                max_requests: 20,
            },
            registrations: WindowLimit {
                window_secs: 60,
                max_requests: 30,
            },
        }
    }
}

/// Logging settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// Default filter directive; `RUST_LOG` takes precedence
    pub level: String,
    /// Emit JSON lines instead of human readable output
    pub json: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

impl Settings {
    /// Load from `config.toml` in the working directory plus the environment
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from("config.toml")
    }

    /// Load from a specific TOML file plus the environment. A missing file is
    /// not an error; defaults and environment still apply.
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let settings: Settings = Figment::from(Serialized::defaults(Settings::default()))
            .merge(Toml::file(path.as_ref()))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()?;

        settings.validate()?;
        Ok(settings)
    }

    /// Reject settings the server cannot run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(ConfigError::Invalid("server.port must not be 0".into()));
        }
        if self.server.max_body_bytes == 0 {
            return Err(ConfigError::Invalid("server.max_body_bytes must be positive".into()));
        }

        let level = self.logging.level.to_ascii_lowercase();
        if !LOG_LEVELS.contains(&level.as_str()) {
            return Err(ConfigError::Invalid(format!(
                "logging.level must be one of {LOG_LEVELS:?}, got {:?}",
                self.logging.level
            )));
        }

        if !(1..=MAX_TOKEN_TTL_HOURS).contains(&self.auth.token_ttl_hours) {
            return Err(ConfigError::Invalid(format!(
                "auth.token_ttl_hours must be between 1 and {MAX_TOKEN_TTL_HOURS}"
            )));
        }
        if let Some(secret) = &self.auth.jwt_secret {
            if secret.len() < MIN_JWT_SECRET_LENGTH {
                return Err(ConfigError::Invalid(format!(
                    "auth.jwt_secret must be at least {MIN_JWT_SECRET_LENGTH} characters"
                )));
            }
        }
        self.auth
            .password_scheme
            .validate()
            .map_err(ConfigError::Invalid)?;
        if self.auth.password_requirements.min_length < 4 {
            return Err(ConfigError::Invalid(
                "auth.password_requirements.min_length must be at least 4".into(),
            ));
        }

        for (name, limit) in [
            ("admin", self.rate_limit.admin),
            ("registrations", self.rate_limit.registrations),
        ] {
            if limit.window_secs == 0 || limit.max_requests == 0 {
                return Err(ConfigError::Invalid(format!(
                    "rate_limit.{name} needs a positive window and request count"
                )));
            }
        }

        if self.storage.max_connections == 0 {
            return Err(ConfigError::Invalid("storage.max_connections must be positive".into()));
        }

        Ok(())
    }

    /// Socket address to bind
    pub fn bind_addr(&self) -> Result<SocketAddr, ConfigError> {
        let ip: IpAddr = self
            .server
            .host
            .parse()
            .map_err(|e| ConfigError::Invalid(format!("server.host: {e}")))?;
        Ok(SocketAddr::new(ip, self.server.port))
    }
}

/// Shared, read-only handle on validated settings
#[derive(Debug, Clone)]
pub struct SettingsManager {
    settings: Arc<Settings>,
}

impl SettingsManager {
    pub fn new(settings: Settings) -> Result<Self, ConfigError> {
        settings.validate()?;
        Ok(Self {
            settings: Arc::new(settings),
        })
    }

    pub fn get(&self) -> Arc<Settings> {
        Arc::clone(&self.settings)
    }
}
