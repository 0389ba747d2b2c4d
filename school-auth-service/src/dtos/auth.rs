use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::models::{Account, AuthProvider, Identity, Role, Session};

/// Credential sign-in. Missing or null fields are rejected by the
/// verifier, not the JSON layer.
#[derive(Deserialize, ToSchema)]
pub struct LoginRequest {
    #[serde(default)]
    #[schema(example = "alice@example.com")]
    pub email: Option<String>,

    #[serde(default)]
    #[schema(example = "Secret123")]
    pub password: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct LoginResponse {
    #[schema(example = "Signed in")]
    pub message: String,
    pub user: Identity,
    #[schema(example = "/dashboard/student")]
    pub redirect: String,
}

#[derive(Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    #[schema(example = "Alice")]
    pub name: Option<String>,

    #[validate(email(message = "Invalid email format"))]
    #[schema(example = "alice@example.com")]
    pub email: Option<String>,

    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    #[schema(example = "Secret123", min_length = 8)]
    pub password: Option<String>,

    /// `YYYY-MM-DD`
    #[schema(example = "2008-04-17")]
    pub birth_date: Option<String>,

    #[schema(example = "@alice")]
    pub social_media: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RegisterResponse {
    #[schema(example = "550e8400-e29b-41d4-a716-446655440000")]
    pub id: String,
    pub name: Option<String>,
    #[schema(example = "alice@example.com")]
    pub email: String,
    pub birth_date: Option<NaiveDate>,
    pub social_media: Option<String>,
}

/// Current account as shown to its owner.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AccountProfile {
    pub id: String,
    pub name: Option<String>,
    pub email: String,
    pub avatar_url: Option<String>,
    pub role: Role,
    pub provider: AuthProvider,
    pub email_verified: bool,
    pub fees_are_current: Option<bool>,
    pub birth_date: Option<NaiveDate>,
    pub social_media: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<&Account> for AccountProfile {
    fn from(account: &Account) -> Self {
        Self {
            id: account.id.clone(),
            name: account.name.clone(),
            email: account.email.clone(),
            avatar_url: account.avatar_url.clone(),
            role: account.role,
            provider: account.provider,
            email_verified: account.email_verified.is_some(),
            fees_are_current: account.fees_are_current,
            birth_date: account.birth_date.map(|d| d.to_chrono().date_naive()),
            social_media: account.social_media.clone(),
            created_at: account.created_at.to_chrono(),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct DashboardResponse {
    pub role: Role,
    pub session: Session,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct GoogleCallbackQuery {
    pub code: Option<String>,
    pub state: Option<String>,
    /// Set by the provider when the user declines consent.
    pub error: Option<String>,
}
