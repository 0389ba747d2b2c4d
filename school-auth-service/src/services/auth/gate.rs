//! Admission of accounts arriving through an external identity provider.

use async_trait::async_trait;

use super::IdentitySource;
use crate::models::{Account, AuthProvider, Identity, NewAccount};
use crate::services::{Accounts, ProviderProfile, ServiceError, StoreError};
use crate::utils::normalize_email;

/// Find or provision the account for a provider profile.
///
/// Returning an existing account syncs its avatar, then inactive accounts
/// are denied. A unique-email conflict on create means another sign-in won the
/// race; the winner's account is looked up and used instead.
pub async fn admit_oauth(
    accounts: &Accounts,
    profile: &ProviderProfile,
) -> Result<Identity, ServiceError> {
    let email = normalize_email(&profile.email);
    if email.is_empty() || !profile.email_verified {
        tracing::warn!(provider = %profile.provider, "Provider profile without a verified email");
        return Err(ServiceError::InvalidCredentials);
    }

    if let Some(account) = accounts.find_by_email(&email, false).await? {
        return admit_existing(accounts, account, profile).await;
    }

    let new_account = NewAccount::oauth(
        profile.provider,
        email.clone(),
        profile.name.clone(),
        profile.avatar_url.clone(),
    );

    match accounts.create(new_account).await {
        Ok(account) => {
            tracing::info!(
                account_id = %account.id,
                provider = %profile.provider,
                "Provisioned account from provider sign-in"
            );
            Ok(Identity::from(&account))
        }
        Err(StoreError::DuplicateEmail) => {
            tracing::debug!("Concurrent provisioning detected, retrying as lookup");
            match accounts.find_by_email(&email, false).await? {
                Some(account) => admit_existing(accounts, account, profile).await,
                None => Err(ServiceError::Storage(anyhow::anyhow!(
                    "account missing after duplicate-key conflict"
                ))),
            }
        }
        Err(e) => Err(e.into()),
    }
}

async fn admit_existing(
    accounts: &Accounts,
    mut account: Account,
    profile: &ProviderProfile,
) -> Result<Identity, ServiceError> {
    if let Some(avatar) = profile.avatar_url.as_deref() {
        if account.avatar_url.as_deref() != Some(avatar) {
            accounts.update_avatar(&account.id, avatar).await?;
            account.avatar_url = Some(avatar.to_string());
        }
    }

    if !account.is_active {
        tracing::info!(account_id = %account.id, "Provider sign-in denied for inactive account");
        return Err(ServiceError::AccountInactive);
    }

    Ok(Identity::from(&account))
}

/// Identity source for a completed provider code exchange.
pub struct OAuthSource {
    pub profile: ProviderProfile,
}

impl OAuthSource {
    pub fn new(profile: ProviderProfile) -> Self {
        Self { profile }
    }
}

#[async_trait]
impl IdentitySource for OAuthSource {
    fn provider(&self) -> AuthProvider {
        self.profile.provider
    }

    async fn resolve_identity(&self, accounts: &Accounts) -> Result<Identity, ServiceError> {
        admit_oauth(accounts, &self.profile).await
    }
}
