//! Stamps account attributes onto a session token.

use crate::models::{Account, Identity, SessionToken};
use crate::services::{Accounts, ServiceError};
use crate::utils::normalize_email;

/// Copy the account-derived attributes onto `token`. Other fields are kept.
pub fn stamp(mut token: SessionToken, account: &Account) -> SessionToken {
    token.account_id = Some(account.id.clone());
    token.role = Some(account.role);
    token.avatar_url = account.avatar_url.clone();
    token.fees_are_current = account.fees_are_current;
    token
}

/// With a hint (sign-in), re-read the account and stamp it onto the token.
/// Without one (refresh), the token passes through unchanged.
pub async fn enrich(
    accounts: &Accounts,
    token: SessionToken,
    hint: Option<&Identity>,
) -> Result<SessionToken, ServiceError> {
    let Some(identity) = hint else {
        return Ok(token);
    };

    match accounts
        .find_by_email(&normalize_email(&identity.email), false)
        .await?
    {
        Some(account) => Ok(stamp(token, &account)),
        None => {
            tracing::warn!(account_id = %identity.id, "Account vanished before token stamping");
            Ok(token)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{NewAccount, Role};
    use crate::services::{AccountStore, InMemoryAccountStore};
    use std::sync::Arc;
    use std::time::Duration;

    #[tokio::test]
    async fn test_enrich_is_idempotent() {
        let store = Arc::new(InMemoryAccountStore::new());
        let account = store
            .create(NewAccount::credentials(
                "t@example.com".to_string(),
                Some("Teach".to_string()),
                "hash".to_string(),
            ))
            .await
            .unwrap();
        store.set_role("t@example.com", Role::Teacher);
        store.set_fees_are_current("t@example.com", true);
        let accounts = Accounts::new(store, Duration::from_secs(5));

        let identity = Identity::from(&account);
        let token = SessionToken::fresh(&identity);

        let once = enrich(&accounts, token, Some(&identity)).await.unwrap();
        let twice = enrich(&accounts, once.clone(), Some(&identity)).await.unwrap();

        assert_eq!(once, twice);
        assert_eq!(once.role, Some(Role::Teacher));
        assert_eq!(once.fees_are_current, Some(true));
        assert_eq!(once.account_id.as_deref(), Some(account.id.as_str()));
        assert_eq!(once.name.as_deref(), Some("Teach"));
    }

    #[tokio::test]
    async fn test_without_hint_token_unchanged() {
        let accounts = Accounts::new(Arc::new(InMemoryAccountStore::new()), Duration::from_secs(5));
        let token = SessionToken {
            email: Some("x@example.com".to_string()),
            role: Some(Role::Admin),
            ..SessionToken::default()
        };

        let out = enrich(&accounts, token.clone(), None).await.unwrap();
        assert_eq!(out, token);
    }

    #[tokio::test]
    async fn test_unknown_account_leaves_token_unchanged() {
        let accounts = Accounts::new(Arc::new(InMemoryAccountStore::new()), Duration::from_secs(5));
        let identity = Identity {
            id: "gone".to_string(),
            name: None,
            email: "gone@example.com".to_string(),
            avatar_url: None,
            role: Role::Student,
            fees_are_current: None,
        };
        let token = SessionToken::fresh(&identity);

        let out = enrich(&accounts, token.clone(), Some(&identity)).await.unwrap();
        assert_eq!(out, token);
    }
}
