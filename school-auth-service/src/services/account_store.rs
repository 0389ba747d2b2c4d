use async_trait::async_trait;
use mongodb::{
    bson::{doc, oid::ObjectId, Bson, DateTime, Document},
    error::{ErrorKind, WriteFailure},
    options::FindOneOptions,
};
use std::{
    collections::HashMap,
    future::Future,
    sync::{Arc, Mutex},
    time::Duration,
};
use thiserror::Error;

use super::{MongoDb, ServiceError};
use crate::models::{Account, NewAccount, Role};

const DUPLICATE_KEY_CODE: i32 = 11000;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("An account with this email already exists")]
    DuplicateEmail,

    #[error("Account store failure: {0}")]
    Backend(#[from] anyhow::Error),
}

impl From<StoreError> for ServiceError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::DuplicateEmail => ServiceError::EmailAlreadyRegistered,
            StoreError::Backend(e) => ServiceError::Storage(e),
        }
    }
}

/// Persistence for accounts. Emails passed in are already normalized.
#[async_trait]
pub trait AccountStore: Send + Sync {
    async fn find_by_email(
        &self,
        email: &str,
        include_password_hash: bool,
    ) -> Result<Option<Account>, StoreError>;

    /// Insert a new account. Fails with `DuplicateEmail` when the email is taken.
    async fn create(&self, account: NewAccount) -> Result<Account, StoreError>;

    async fn update_avatar(&self, id: &str, avatar_url: &str) -> Result<(), StoreError>;

    async fn health_check(&self) -> Result<(), StoreError>;
}

pub struct MongoAccountStore {
    db: MongoDb,
}

impl MongoAccountStore {
    pub fn new(db: MongoDb) -> Self {
        Self { db }
    }
}

/// Accounts created by the earlier web app carry ObjectId keys.
fn id_filter(id: &str) -> Document {
    match ObjectId::parse_str(id) {
        Ok(oid) => doc! { "_id": { "$in": [Bson::String(id.to_string()), Bson::ObjectId(oid)] } },
        Err(_) => doc! { "_id": id },
    }
}

fn is_duplicate_key(err: &mongodb::error::Error) -> bool {
    matches!(
        err.kind.as_ref(),
        ErrorKind::Write(WriteFailure::WriteError(we)) if we.code == DUPLICATE_KEY_CODE
    )
}

#[async_trait]
impl AccountStore for MongoAccountStore {
    async fn find_by_email(
        &self,
        email: &str,
        include_password_hash: bool,
    ) -> Result<Option<Account>, StoreError> {
        let options = if include_password_hash {
            None
        } else {
            Some(
                FindOneOptions::builder()
                    .projection(doc! { "password_hash": 0, "password": 0 })
                    .build(),
            )
        };

        self.db
            .users()
            .find_one(doc! { "email": email }, options)
            .await
            .map_err(|e| StoreError::Backend(anyhow::Error::new(e)))
    }

    async fn create(&self, account: NewAccount) -> Result<Account, StoreError> {
        let account = account.into_account();

        match self.db.users().insert_one(&account, None).await {
            Ok(_) => Ok(account.without_password()),
            Err(e) if is_duplicate_key(&e) => Err(StoreError::DuplicateEmail),
            Err(e) => Err(StoreError::Backend(anyhow::Error::new(e))),
        }
    }

    async fn update_avatar(&self, id: &str, avatar_url: &str) -> Result<(), StoreError> {
        self.db
            .users()
            .update_one(
                id_filter(id),
                doc! {
                    "$set": { "avatar_url": avatar_url, "updated_at": DateTime::now() },
                    "$unset": { "image": "" },
                },
                None,
            )
            .await
            .map_err(|e| StoreError::Backend(anyhow::Error::new(e)))?;
        Ok(())
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        self.db
            .health_check()
            .await
            .map_err(|e| StoreError::Backend(anyhow::anyhow!(e.to_string())))
    }
}

/// Process-local store keyed by email. Used by tests and local runs without MongoDB.
#[derive(Default)]
pub struct InMemoryAccountStore {
    accounts: Mutex<HashMap<String, Account>>,
}

impl InMemoryAccountStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_accounts<T>(
        &self,
        f: impl FnOnce(&mut HashMap<String, Account>) -> T,
    ) -> Result<T, StoreError> {
        let mut guard = self
            .accounts
            .lock()
            .map_err(|e| anyhow::anyhow!("In-memory store mutex poisoned: {}", e))?;
        Ok(f(&mut guard))
    }

    pub fn len(&self) -> usize {
        self.with_accounts(|a| a.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Raw stored document, hash included.
    pub fn get(&self, email: &str) -> Option<Account> {
        self.with_accounts(|a| a.get(email).cloned()).ok().flatten()
    }

    pub fn set_active(&self, email: &str, active: bool) {
        let _ = self.with_accounts(|a| {
            if let Some(account) = a.get_mut(email) {
                account.is_active = active;
            }
        });
    }

    pub fn set_role(&self, email: &str, role: Role) {
        let _ = self.with_accounts(|a| {
            if let Some(account) = a.get_mut(email) {
                account.role = role;
            }
        });
    }

    pub fn set_fees_are_current(&self, email: &str, current: bool) {
        let _ = self.with_accounts(|a| {
            if let Some(account) = a.get_mut(email) {
                account.fees_are_current = Some(current);
            }
        });
    }
}

#[async_trait]
impl AccountStore for InMemoryAccountStore {
    async fn find_by_email(
        &self,
        email: &str,
        include_password_hash: bool,
    ) -> Result<Option<Account>, StoreError> {
        self.with_accounts(|a| {
            a.get(email).cloned().map(|account| {
                if include_password_hash {
                    account
                } else {
                    account.without_password()
                }
            })
        })
    }

    async fn create(&self, account: NewAccount) -> Result<Account, StoreError> {
        let account = account.into_account();
        self.with_accounts(|a| {
            if a.contains_key(&account.email) {
                return Err(StoreError::DuplicateEmail);
            }
            a.insert(account.email.clone(), account.clone());
            Ok(account.without_password())
        })?
    }

    async fn update_avatar(&self, id: &str, avatar_url: &str) -> Result<(), StoreError> {
        self.with_accounts(|a| {
            if let Some(account) = a.values_mut().find(|acc| acc.id == id) {
                account.avatar_url = Some(avatar_url.to_string());
                account.updated_at = DateTime::now();
            }
        })
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

/// Store handle used by the auth flow. Every call is bounded by `timeout`;
/// expiry is reported as a storage failure.
#[derive(Clone)]
pub struct Accounts {
    store: Arc<dyn AccountStore>,
    timeout: Duration,
}

impl Accounts {
    pub fn new(store: Arc<dyn AccountStore>, timeout: Duration) -> Self {
        Self { store, timeout }
    }

    async fn bounded<T, F>(&self, op: &'static str, fut: F) -> Result<T, StoreError>
    where
        F: Future<Output = Result<T, StoreError>>,
    {
        match tokio::time::timeout(self.timeout, fut).await {
            Ok(result) => result,
            Err(_) => {
                tracing::error!(
                    operation = op,
                    timeout_ms = self.timeout.as_millis() as u64,
                    "Account store call timed out"
                );
                Err(StoreError::Backend(anyhow::anyhow!(
                    "account store {} timed out",
                    op
                )))
            }
        }
    }

    pub async fn find_by_email(
        &self,
        email: &str,
        include_password_hash: bool,
    ) -> Result<Option<Account>, StoreError> {
        self.bounded(
            "find_by_email",
            self.store.find_by_email(email, include_password_hash),
        )
        .await
    }

    pub async fn create(&self, account: NewAccount) -> Result<Account, StoreError> {
        self.bounded("create", self.store.create(account)).await
    }

    pub async fn update_avatar(&self, id: &str, avatar_url: &str) -> Result<(), StoreError> {
        self.bounded("update_avatar", self.store.update_avatar(id, avatar_url))
            .await
    }

    pub async fn health_check(&self) -> Result<(), StoreError> {
        self.bounded("health_check", self.store.health_check()).await
    }
}
