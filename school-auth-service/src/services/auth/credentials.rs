//! Email + password verification.

use async_trait::async_trait;
use std::sync::OnceLock;

use super::IdentitySource;
use crate::models::{AuthProvider, Identity};
use crate::services::{Accounts, ServiceError};
use crate::utils::{hash_password, normalize_email, verify_password, Password, PasswordHashString};

/// Hash checked when there is no real one, so unknown emails cost a full verification.
fn dummy_hash() -> Option<&'static PasswordHashString> {
    static DUMMY: OnceLock<Option<PasswordHashString>> = OnceLock::new();
    DUMMY
        .get_or_init(|| hash_password(&Password::new(uuid::Uuid::new_v4().to_string())).ok())
        .as_ref()
}

/// Runs argon2 on the blocking pool. `None` verifies against the dummy hash and never matches.
async fn password_matches(
    password: Password,
    hash: Option<PasswordHashString>,
) -> Result<bool, ServiceError> {
    tokio::task::spawn_blocking(move || match hash {
        Some(hash) => verify_password(&password, &hash).is_ok(),
        None => {
            if let Some(dummy) = dummy_hash() {
                let _ = verify_password(&password, dummy);
            }
            false
        }
    })
    .await
    .map_err(|e| ServiceError::Internal(anyhow::anyhow!("Password check task failed: {}", e)))
}

/// Check an email/password pair against the stored account.
///
/// Unknown email, OAuth-only account, wrong password and inactive account
/// all produce the same `InvalidCredentials`.
pub async fn verify(
    accounts: &Accounts,
    email: &str,
    password: &Password,
) -> Result<Identity, ServiceError> {
    if email.trim().is_empty() || password.is_empty() {
        return Err(ServiceError::MissingCredentials);
    }

    let email = normalize_email(email);
    let account = accounts.find_by_email(&email, true).await?;

    let stored_hash = account
        .as_ref()
        .filter(|a| a.supports_credentials())
        .and_then(|a| a.password_hash.clone())
        .map(PasswordHashString::new);

    if !password_matches(password.clone(), stored_hash).await? {
        tracing::debug!("Credential check failed");
        return Err(ServiceError::InvalidCredentials);
    }

    match account {
        Some(account) if account.is_active => Ok(Identity::from(&account)),
        Some(account) => {
            tracing::info!(account_id = %account.id, "Sign-in refused for inactive account");
            Err(ServiceError::InvalidCredentials)
        }
        None => Err(ServiceError::InvalidCredentials),
    }
}

/// Identity source for the credentials form.
pub struct CredentialSource {
    pub email: String,
    pub password: Password,
}

impl CredentialSource {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: Password::new(password.into()),
        }
    }
}

#[async_trait]
impl IdentitySource for CredentialSource {
    fn provider(&self) -> AuthProvider {
        AuthProvider::Credentials
    }

    async fn resolve_identity(&self, accounts: &Accounts) -> Result<Identity, ServiceError> {
        verify(accounts, &self.email, &self.password).await
    }
}
