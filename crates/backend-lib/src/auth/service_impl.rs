use std::sync::Arc;

use async_trait::async_trait;
use atithi_common::{AdminProfile, LoginResponse};
use chrono::{Duration, Utc};
use metrics::counter;
use subtle::ConstantTimeEq;
use tracing::instrument;
use zeroize::Zeroizing;

use super::token_generator::generate_secret;
use super::{
    validate_password_strength, verify_password, AuthError, AuthService, Claims,
    PasswordRequirements, PasswordScheme, TokenIssuer,
};
use crate::config::{AuthSettings, SeedAdmin};
use crate::metrics::{
    ADMIN_PROVISIONED, LOGIN_FAILURE, LOGIN_SUCCESS, PROVISIONING_DENIED, TOKEN_REJECTED,
};
use crate::storage::{AdminAccount, CredentialStore};

/// Who may create admin accounts through `provision_admin`
#[derive(Clone)]
pub enum ProvisioningPolicy {
    /// Anyone. Local development only.
    Open,
    /// Callers presenting this pre-shared key
    Key(Zeroizing<String>),
    /// Nobody; accounts come from seeding or the CLI
    Closed,
}

impl std::fmt::Debug for ProvisioningPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProvisioningPolicy::Open => f.write_str("Open"),
            ProvisioningPolicy::Key(_) => f.write_str("Key(<redacted>)"),
            ProvisioningPolicy::Closed => f.write_str("Closed"),
        }
    }
}

impl ProvisioningPolicy {
    pub fn from_settings(settings: &AuthSettings) -> Self {
        if settings.open_provisioning {
            return ProvisioningPolicy::Open;
        }
        match settings.provisioning_key.as_deref() {
            Some(key) if !key.is_empty() => ProvisioningPolicy::Key(Zeroizing::new(key.to_string())),
            _ => ProvisioningPolicy::Closed,
        }
    }

    fn admits(&self, presented: Option<&str>) -> bool {
        match (self, presented) {
            (ProvisioningPolicy::Open, _) => true,
            (ProvisioningPolicy::Key(expected), Some(presented)) => {
                presented.as_bytes().ct_eq(expected.as_bytes()).into()
            },
            _ => false,
        }
    }
}

/// The single auth service implementation, parameterised by its store
pub struct DefaultAuth {
    store: Arc<dyn CredentialStore>,
    tokens: TokenIssuer,
    scheme: PasswordScheme,
    requirements: PasswordRequirements,
    provisioning: ProvisioningPolicy,
    /// Verified against when the username is unknown
    decoy_hash: String,
}

impl DefaultAuth {
    pub fn new(
        store: Arc<dyn CredentialStore>,
        tokens: TokenIssuer,
        scheme: PasswordScheme,
        requirements: PasswordRequirements,
        provisioning: ProvisioningPolicy,
    ) -> Result<Self, AuthError> {
        let decoy_hash = scheme
            .hash(&generate_secret())
            .map_err(|e| AuthError::Internal(e.to_string()))?;

        Ok(Self {
            store,
            tokens,
            scheme,
            requirements,
            provisioning,
            decoy_hash,
        })
    }

    /// Build from the `[auth]` settings section
    pub fn from_settings(
        store: Arc<dyn CredentialStore>,
        settings: &AuthSettings,
    ) -> Result<Self, AuthError> {
        let secret = match &settings.jwt_secret {
            Some(secret) => Zeroizing::new(secret.clone()),
            None => {
                tracing::warn!(
                    "auth.jwt_secret is not set; using a random secret, tokens will not survive a restart"
                );
                Zeroizing::new(generate_secret())
            },
        };
        let tokens = TokenIssuer::new(secret.as_bytes(), Duration::hours(settings.token_ttl_hours));

        let provisioning = ProvisioningPolicy::from_settings(settings);
        if matches!(provisioning, ProvisioningPolicy::Open) {
            tracing::warn!("Open admin provisioning is enabled");
        }

        Self::new(
            store,
            tokens,
            settings.password_scheme,
            settings.password_requirements.clone(),
            provisioning,
        )
    }

    pub fn tokens(&self) -> &TokenIssuer {
        &self.tokens
    }

    /// Create an admin without consulting the provisioning policy or the
    /// strength requirements. Used by seeding and the CLI.
    #[instrument(skip(self, password))]
    pub async fn create_admin(
        &self,
        username: &str,
        password: &str,
    ) -> Result<AdminProfile, AuthError> {
        if self.store.find_admin_by_username(username).await?.is_some() {
            return Err(AuthError::DuplicateUsername(username.to_string()));
        }

        let password_hash = self.hash_password(password).await?;
        let account = AdminAccount::new(username, password_hash);
        let profile = account.profile();
        self.store.insert_admin(account).await?;

        counter!(ADMIN_PROVISIONED).increment(1);
        tracing::info!(admin_id = %profile.id, "Admin account created");
        Ok(profile)
    }

    /// Create the seed account when the store holds no admin at all
    pub async fn seed_admin(&self, seed: &SeedAdmin) -> Result<Option<AdminProfile>, AuthError> {
        if self.store.count_admins().await? > 0 {
            return Ok(None);
        }

        if seed.is_default() {
            tracing::warn!(
                username = %seed.username,
                "Seeding the default admin account; change its password before going live"
            );
        }
        self.create_admin(&seed.username, &seed.password).await.map(Some)
    }

    /// Hash on the blocking pool with the configured scheme
    pub async fn hash_password(&self, password: &str) -> Result<String, AuthError> {
        let scheme = self.scheme;
        let plain = Zeroizing::new(password.to_string());
        tokio::task::spawn_blocking(move || scheme.hash(&plain))
            .await
            .map_err(|e| AuthError::Internal(format!("Hashing task failed: {e}")))?
            .map_err(|e| AuthError::Internal(e.to_string()))
    }

    async fn check_password(&self, hash: String, password: &str) -> Result<bool, AuthError> {
        let plain = Zeroizing::new(password.to_string());
        tokio::task::spawn_blocking(move || verify_password(&hash, &plain))
            .await
            .map_err(|e| AuthError::Internal(format!("Verification task failed: {e}")))
    }
}

#[async_trait]
impl AuthService for DefaultAuth {
    #[instrument(skip(self, password))]
    async fn authenticate(
        &self,
        username: &str,
        password: &str,
    ) -> Result<LoginResponse, AuthError> {
        if self.store.count_admins().await? == 0 {
            tracing::error!("Login attempted but no admin accounts are configured");
            return Err(AuthError::NoAdminsConfigured);
        }

        let account = self.store.find_admin_by_username(username).await?;
        let hash = account
            .as_ref()
            .map_or_else(|| self.decoy_hash.clone(), |a| a.password_hash.clone());
        let matched = self.check_password(hash, password).await?;

        match account {
            Some(account) if matched => {
                let token = self.tokens.issue(&account, Utc::now())?;
                counter!(LOGIN_SUCCESS).increment(1);
                tracing::info!(admin_id = %account.id, "Admin logged in");
                Ok(LoginResponse {
                    admin: account.profile(),
                    token,
                })
            },
            _ => {
                counter!(LOGIN_FAILURE).increment(1);
                tracing::warn!("Failed admin login");
                Err(AuthError::InvalidCredentials)
            },
        }
    }

    fn verify_token(&self, token: &str) -> Result<Claims, AuthError> {
        self.tokens.verify(token).inspect_err(|_| {
            counter!(TOKEN_REJECTED).increment(1);
        })
    }

    fn authorize(&self, claims: &Claims) -> Result<(), AuthError> {
        if claims.is_admin {
            Ok(())
        } else {
            tracing::warn!(username = %claims.username, "Non-admin token refused");
            Err(AuthError::Forbidden)
        }
    }

    #[instrument(skip(self, password, provisioning_key))]
    async fn provision_admin(
        &self,
        username: &str,
        password: &str,
        provisioning_key: Option<&str>,
    ) -> Result<AdminProfile, AuthError> {
        if !self.provisioning.admits(provisioning_key) {
            counter!(PROVISIONING_DENIED).increment(1);
            tracing::warn!("Admin provisioning refused");
            return Err(AuthError::Forbidden);
        }

        // A taken username wins over a weak password
        if self.store.find_admin_by_username(username).await?.is_some() {
            return Err(AuthError::DuplicateUsername(username.to_string()));
        }

        if !validate_password_strength(password, &self.requirements) {
            return Err(AuthError::WeakPassword(self.requirements.describe()));
        }

        self.create_admin(username, password).await
    }
}
