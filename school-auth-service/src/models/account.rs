//! Account model - one persisted identity per normalized email.

use mongodb::bson::{Bson, DateTime};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;
use utoipa::ToSchema;

/// Dashboard role. Stored lowercase; the legacy Spanish labels are accepted on read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    #[serde(alias = "alumno")]
    Student,
    #[serde(alias = "profesor")]
    Teacher,
    Admin,
    Owner,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Student => "student",
            Role::Teacher => "teacher",
            Role::Admin => "admin",
            Role::Owner => "owner",
        }
    }

    /// Parse a stored role, falling back to `Student` for anything unrecognised.
    pub fn parse_lossy(value: &str) -> Role {
        value.parse().unwrap_or_default()
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "student" | "alumno" => Ok(Role::Student),
            "teacher" | "profesor" => Ok(Role::Teacher),
            "admin" => Ok(Role::Admin),
            "owner" => Ok(Role::Owner),
            _ => Err(format!("Invalid role: {}", s)),
        }
    }
}

fn lossy_role<'de, D>(deserializer: D) -> Result<Role, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value.as_deref().map(Role::parse_lossy).unwrap_or_default())
}

/// Where an account came from. Set once at creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum AuthProvider {
    #[default]
    Credentials,
    Google,
}

impl AuthProvider {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuthProvider::Credentials => "credentials",
            AuthProvider::Google => "google",
        }
    }
}

impl fmt::Display for AuthProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn default_active() -> bool {
    true
}

/// Persisted account document (`users` collection).
///
/// Documents written by the earlier web app use camelCase names, `password`,
/// `image`, `feesUpToDate` and ObjectId ids; those are accepted on read.
#[derive(Clone, Serialize, Deserialize)]
pub struct Account {
    #[serde(rename = "_id", deserialize_with = "string_or_object_id")]
    pub id: String,
    pub email: String,
    /// Only loaded when a lookup explicitly asks for it.
    #[serde(default, alias = "password", skip_serializing_if = "Option::is_none")]
    pub password_hash: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "lossy_role")]
    pub role: Role,
    #[serde(default)]
    pub provider: AuthProvider,
    #[serde(default, alias = "emailVerified")]
    pub email_verified: Option<DateTime>,
    #[serde(default = "default_active", alias = "isActive")]
    pub is_active: bool,
    #[serde(default, alias = "image", skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
    #[serde(default, alias = "feesUpToDate", skip_serializing_if = "Option::is_none")]
    pub fees_are_current: Option<bool>,
    #[serde(default, alias = "birthDate", skip_serializing_if = "Option::is_none")]
    pub birth_date: Option<DateTime>,
    #[serde(default, alias = "socialMedia", skip_serializing_if = "Option::is_none")]
    pub social_media: Option<String>,
    #[serde(default = "DateTime::now", alias = "createdAt")]
    pub created_at: DateTime,
    #[serde(default = "DateTime::now", alias = "updatedAt")]
    pub updated_at: DateTime,
}

fn string_or_object_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Bson::deserialize(deserializer)? {
        Bson::String(id) => Ok(id),
        Bson::ObjectId(oid) => Ok(oid.to_hex()),
        other => Err(serde::de::Error::custom(format!(
            "unsupported _id type: {:?}",
            other.element_type()
        ))),
    }
}

impl Account {
    pub fn supports_credentials(&self) -> bool {
        self.password_hash
            .as_deref()
            .map(|h| !h.is_empty())
            .unwrap_or(false)
    }

    /// Copy without the password hash, as returned by ordinary reads.
    pub fn without_password(mut self) -> Self {
        self.password_hash = None;
        self
    }
}

impl fmt::Debug for Account {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Account")
            .field("id", &self.id)
            .field("email", &self.email)
            .field(
                "password_hash",
                &self.password_hash.as_ref().map(|_| "<redacted>"),
            )
            .field("name", &self.name)
            .field("role", &self.role)
            .field("provider", &self.provider)
            .field("is_active", &self.is_active)
            .field("avatar_url", &self.avatar_url)
            .field("fees_are_current", &self.fees_are_current)
            .finish_non_exhaustive()
    }
}

/// Fields supplied when provisioning an account; the store assigns the rest.
#[derive(Clone)]
pub struct NewAccount {
    pub email: String,
    pub name: Option<String>,
    pub password_hash: Option<String>,
    pub provider: AuthProvider,
    pub email_verified: Option<DateTime>,
    pub avatar_url: Option<String>,
    pub birth_date: Option<DateTime>,
    pub social_media: Option<String>,
}

impl NewAccount {
    /// Credential registration. The hash must already be computed.
    pub fn credentials(email: String, name: Option<String>, password_hash: String) -> Self {
        Self {
            email,
            name,
            password_hash: Some(password_hash),
            provider: AuthProvider::Credentials,
            email_verified: None,
            avatar_url: None,
            birth_date: None,
            social_media: None,
        }
    }

    /// First sign-in through an external provider, which already verified the email.
    pub fn oauth(
        provider: AuthProvider,
        email: String,
        name: Option<String>,
        avatar_url: Option<String>,
    ) -> Self {
        Self {
            email,
            name,
            password_hash: None,
            provider,
            email_verified: Some(DateTime::now()),
            avatar_url,
            birth_date: None,
            social_media: None,
        }
    }

    pub fn into_account(self) -> Account {
        let now = DateTime::now();
        Account {
            id: uuid::Uuid::new_v4().to_string(),
            email: self.email,
            password_hash: self.password_hash,
            name: self.name,
            role: Role::default(),
            provider: self.provider,
            email_verified: self.email_verified,
            is_active: true,
            avatar_url: self.avatar_url,
            fees_are_current: None,
            birth_date: self.birth_date,
            social_media: self.social_media,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Minimal verified identity handed to the session pipeline. Never carries a password.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    #[schema(example = "550e8400-e29b-41d4-a716-446655440000")]
    pub id: String,
    pub name: Option<String>,
    #[schema(example = "alice@example.com")]
    pub email: String,
    pub avatar_url: Option<String>,
    pub role: Role,
    pub fees_are_current: Option<bool>,
}

impl From<&Account> for Identity {
    fn from(account: &Account) -> Self {
        Self {
            id: account.id.clone(),
            name: account.name.clone(),
            email: account.email.clone(),
            avatar_url: account.avatar_url.clone(),
            role: account.role,
            fees_are_current: account.fees_are_current,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mongodb::bson::{self, doc};

    #[test]
    fn test_role_accepts_legacy_labels() {
        assert_eq!("alumno".parse::<Role>(), Ok(Role::Student));
        assert_eq!("Profesor".parse::<Role>(), Ok(Role::Teacher));
        assert_eq!("OWNER".parse::<Role>(), Ok(Role::Owner));
        assert!("janitor".parse::<Role>().is_err());
        assert_eq!(Role::parse_lossy("janitor"), Role::Student);
    }

    #[test]
    fn test_unknown_or_missing_role_reads_as_student() {
        let now = DateTime::now();
        let unknown = doc! {
            "_id": "a1",
            "email": "x@example.com",
            "role": "superuser",
            "created_at": now,
            "updated_at": now,
        };
        let account: Account = bson::from_document(unknown).unwrap();
        assert_eq!(account.role, Role::Student);
        assert!(account.is_active);
        assert_eq!(account.provider, AuthProvider::Credentials);

        let missing = doc! {
            "_id": "a2",
            "email": "y@example.com",
            "created_at": now,
            "updated_at": now,
        };
        let account: Account = bson::from_document(missing).unwrap();
        assert_eq!(account.role, Role::Student);
    }

    #[test]
    fn test_reads_earlier_web_app_document() {
        let oid = bson::oid::ObjectId::new();
        let created = DateTime::now();
        let legacy = doc! {
            "_id": oid,
            "email": "old@example.com",
            "password": "$2b$10$legacyhash",
            "image": "https://img.test/old.png",
            "role": "profesor",
            "provider": "credentials",
            "emailVerified": bson::Bson::Null,
            "isActive": false,
            "feesUpToDate": true,
            "socialMedia": "@old",
            "createdAt": created,
            "updatedAt": created,
        };

        let account: Account = bson::from_document(legacy).unwrap();
        assert_eq!(account.id, oid.to_hex());
        assert_eq!(account.password_hash.as_deref(), Some("$2b$10$legacyhash"));
        assert_eq!(account.avatar_url.as_deref(), Some("https://img.test/old.png"));
        assert_eq!(account.role, Role::Teacher);
        assert!(account.email_verified.is_none());
        assert!(!account.is_active);
        assert_eq!(account.fees_are_current, Some(true));
        assert_eq!(account.social_media.as_deref(), Some("@old"));
        assert_eq!(account.created_at, created);
    }

    #[test]
    fn test_rejects_non_string_id() {
        let now = DateTime::now();
        let bad = doc! { "_id": 42, "email": "n@example.com", "created_at": now, "updated_at": now };
        assert!(bson::from_document::<Account>(bad).is_err());
    }

    #[test]
    fn test_oauth_account_has_no_password_and_verified_email() {
        let account = NewAccount::oauth(
            AuthProvider::Google,
            "new@oauth.com".to_string(),
            Some("New".to_string()),
            None,
        )
        .into_account();

        assert!(!account.supports_credentials());
        assert!(account.email_verified.is_some());
        assert_eq!(account.role, Role::Student);
        assert_eq!(account.provider, AuthProvider::Google);
    }

    #[test]
    fn test_debug_redacts_password_hash() {
        let account = NewAccount::credentials(
            "alice@example.com".to_string(),
            None,
            "$argon2id$v=19$secret-hash".to_string(),
        )
        .into_account();

        let rendered = format!("{:?}", account);
        assert!(!rendered.contains("secret-hash"));
        assert!(rendered.contains("<redacted>"));
    }

    #[test]
    fn test_identity_never_serializes_password() {
        let account = NewAccount::credentials(
            "alice@example.com".to_string(),
            Some("Alice".to_string()),
            "$argon2id$v=19$secret-hash".to_string(),
        )
        .into_account();

        let json = serde_json::to_value(Identity::from(&account)).unwrap();
        assert!(json.get("passwordHash").is_none());
        assert!(!json.to_string().contains("secret-hash"));
        assert_eq!(json["role"], "student");
    }
}
