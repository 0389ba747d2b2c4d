//! Sign-in pipeline: admission, token stamping, session shaping, routing.

pub mod credentials;
pub mod enricher;
pub mod gate;
pub mod router;
pub mod shaper;

pub use credentials::CredentialSource;
pub use enricher::{enrich, stamp};
pub use gate::{admit_oauth, OAuthSource};
pub use router::{dashboard_path, guard_dashboard, resolve_dashboard, DashboardAccess, LOGIN_PATH};
pub use shaper::shape;

use async_trait::async_trait;
use chrono::{NaiveDate, TimeZone, Utc};
use mongodb::bson::DateTime as BsonDateTime;
use validator::{Validate, ValidationError, ValidationErrors};

use crate::dtos::auth::{AccountProfile, RegisterRequest, RegisterResponse};
use crate::models::{AuthProvider, Identity, NewAccount, Session, SessionToken};
use crate::services::{metrics, Accounts, ServiceError, SessionCodec};
use crate::utils::{hash_password, normalize_email, Password};

/// Something that can vouch for an identity: the credentials form or a provider callback.
#[async_trait]
pub trait IdentitySource: Send + Sync {
    fn provider(&self) -> AuthProvider;

    async fn resolve_identity(&self, accounts: &Accounts) -> Result<Identity, ServiceError>;
}

/// Result of a successful sign-in.
#[derive(Debug, Clone)]
pub struct SignedIn {
    pub identity: Identity,
    pub session: Session,
    /// Signed value for the session cookie.
    pub cookie_value: String,
    pub redirect: String,
}

/// A valid session read back from its cookie, re-signed with a fresh expiry.
#[derive(Debug, Clone)]
pub struct ActiveSession {
    pub token: SessionToken,
    pub session: Session,
    pub cookie_value: String,
}

#[derive(Clone)]
pub struct AuthService {
    accounts: Accounts,
    sessions: SessionCodec,
}

impl AuthService {
    pub fn new(accounts: Accounts, sessions: SessionCodec) -> Self {
        Self { accounts, sessions }
    }

    pub fn accounts(&self) -> &Accounts {
        &self.accounts
    }

    pub fn sessions(&self) -> &SessionCodec {
        &self.sessions
    }

    pub async fn sign_in(&self, source: &dyn IdentitySource) -> Result<SignedIn, ServiceError> {
        let provider = source.provider();

        let identity = match source.resolve_identity(&self.accounts).await {
            Ok(identity) => identity,
            Err(e) => {
                metrics::record_sign_in(provider.as_str(), e.kind());
                return Err(e);
            }
        };

        let token = enrich(
            &self.accounts,
            SessionToken::fresh(&identity),
            Some(&identity),
        )
        .await?;

        let (cookie_value, expires) = self.sessions.issue(&token)?;
        let session = shape(&token, Some(expires));
        let redirect = resolve_dashboard(Some(&session));

        metrics::record_sign_in(provider.as_str(), "success");
        tracing::info!(
            account_id = %identity.id,
            provider = %provider,
            role = %session.user.role,
            "Signed in"
        );

        Ok(SignedIn {
            identity,
            session,
            cookie_value,
            redirect,
        })
    }

    /// Decode a session cookie and re-check its account. Invalid or expired
    /// cookies, and cookies whose account is gone or inactive, read as no
    /// session. Account attributes are re-stamped so role changes apply.
    pub async fn read_session(
        &self,
        cookie_value: &str,
    ) -> Result<Option<ActiveSession>, ServiceError> {
        let decoded = match self.sessions.decode(cookie_value) {
            Ok(decoded) => decoded,
            Err(e) => {
                tracing::debug!(error = %e, "Ignoring invalid session cookie");
                return Ok(None);
            }
        };

        let token = enrich(&self.accounts, decoded.token, None).await?;

        let Some(email) = token.email.as_deref().map(normalize_email) else {
            return Ok(None);
        };
        let account = match self.accounts.find_by_email(&email, false).await? {
            Some(account) if account.is_active => account,
            Some(account) => {
                tracing::info!(account_id = %account.id, "Dropping session of inactive account");
                return Ok(None);
            }
            None => {
                tracing::info!("Dropping session of missing account");
                return Ok(None);
            }
        };

        let token = stamp(token, &account);
        let (cookie_value, expires) = self.sessions.issue(&token)?;
        let session = shape(&token, Some(expires));

        Ok(Some(ActiveSession {
            token,
            session,
            cookie_value,
        }))
    }

    pub async fn register(&self, req: RegisterRequest) -> Result<RegisterResponse, ServiceError> {
        let has_email = req.email.as_deref().is_some_and(|e| !e.trim().is_empty());
        let has_password = req.password.as_deref().is_some_and(|p| !p.is_empty());
        if !has_email || !has_password {
            return Err(ServiceError::MissingCredentials);
        }

        let trimmed = RegisterRequest {
            email: req.email.as_deref().map(|e| e.trim().to_string()),
            ..req
        };
        trimmed.validate()?;
        let birth_date = parse_birth_date(trimmed.birth_date.as_deref())?;

        let email = normalize_email(trimmed.email.as_deref().unwrap_or_default());
        let password = Password::new(trimmed.password.unwrap_or_default());

        if self.accounts.find_by_email(&email, false).await?.is_some() {
            metrics::record_registration("conflict");
            return Err(ServiceError::EmailAlreadyRegistered);
        }

        let password_hash = tokio::task::spawn_blocking(move || hash_password(&password))
            .await
            .map_err(|e| ServiceError::Internal(anyhow::anyhow!("Hashing task failed: {}", e)))?
            .map_err(ServiceError::Internal)?;

        let mut new_account = NewAccount::credentials(
            email,
            trimmed.name.filter(|n| !n.trim().is_empty()),
            password_hash.into_string(),
        );
        new_account.birth_date = birth_date
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .map(|dt| BsonDateTime::from_chrono(Utc.from_utc_datetime(&dt)));
        new_account.social_media = trimmed.social_media.filter(|s| !s.trim().is_empty());

        let account = match self.accounts.create(new_account).await {
            Ok(account) => account,
            Err(e) => {
                let err = ServiceError::from(e);
                metrics::record_registration(err.kind());
                return Err(err);
            }
        };

        metrics::record_registration("success");
        tracing::info!(account_id = %account.id, "Account registered");

        Ok(RegisterResponse {
            id: account.id,
            name: account.name,
            email: account.email,
            birth_date,
            social_media: account.social_media,
        })
    }

    /// Profile of the account behind a session token, if it still exists.
    pub async fn profile(
        &self,
        token: &SessionToken,
    ) -> Result<Option<AccountProfile>, ServiceError> {
        let Some(email) = token.email.as_deref() else {
            return Ok(None);
        };

        Ok(self
            .accounts
            .find_by_email(&normalize_email(email), false)
            .await?
            .filter(|account| account.is_active)
            .map(|account| AccountProfile::from(&account)))
    }
}

fn parse_birth_date(value: Option<&str>) -> Result<Option<NaiveDate>, ServiceError> {
    match value.map(str::trim).filter(|v| !v.is_empty()) {
        None => Ok(None),
        Some(v) => NaiveDate::parse_from_str(v, "%Y-%m-%d").map(Some).map_err(|_| {
            let mut errors = ValidationErrors::new();
            let mut error = ValidationError::new("date");
            error.message = Some("Birth date must be YYYY-MM-DD".into());
            errors.add("birthDate", error);
            ServiceError::Validation(errors)
        }),
    }
}
