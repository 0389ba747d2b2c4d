use axum_extra::extract::cookie::{Cookie, SameSite};
use chrono::{DateTime, Duration, TimeZone, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::{SessionConfig, MAX_SESSION_AGE_DAYS, MIN_SESSION_SECRET_LEN};
use crate::models::SessionToken;

/// Signs and reads the session cookie (HS256 JWT).
#[derive(Clone)]
pub struct SessionCodec {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    cookie_name: String,
    max_age_days: i64,
    secure_cookie: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct SessionClaims {
    #[serde(flatten)]
    token: SessionToken,
    /// Issued at (Unix timestamp)
    iat: i64,
    /// Expiration time (Unix timestamp)
    exp: i64,
    jti: String,
}

/// A verified session cookie.
#[derive(Debug, Clone)]
pub struct DecodedSession {
    pub token: SessionToken,
    pub expires: Option<DateTime<Utc>>,
}

impl SessionCodec {
    pub fn new(config: &SessionConfig) -> Result<Self, anyhow::Error> {
        let secret = config.secret.expose_secret().as_bytes();
        if secret.len() < MIN_SESSION_SECRET_LEN {
            return Err(anyhow::anyhow!(
                "Session secret must be at least {} bytes",
                MIN_SESSION_SECRET_LEN
            ));
        }

        if !(1..=MAX_SESSION_AGE_DAYS).contains(&config.max_age_days) {
            return Err(anyhow::anyhow!(
                "Session max age must be between 1 and {} days",
                MAX_SESSION_AGE_DAYS
            ));
        }

        tracing::info!("Session codec initialized with HS256");

        Ok(Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            cookie_name: config.cookie_name.clone(),
            max_age_days: config.max_age_days,
            secure_cookie: config.secure_cookie,
        })
    }

    pub fn cookie_name(&self) -> &str {
        &self.cookie_name
    }

    pub fn max_age_seconds(&self) -> i64 {
        self.max_age_days * 24 * 60 * 60
    }

    /// Sign a token. Returns the cookie value and its expiry.
    pub fn issue(&self, token: &SessionToken) -> Result<(String, DateTime<Utc>), anyhow::Error> {
        let now = Utc::now();
        let exp = now + Duration::days(self.max_age_days);

        let claims = SessionClaims {
            token: token.clone(),
            iat: now.timestamp(),
            exp: exp.timestamp(),
            jti: Uuid::new_v4().to_string(),
        };

        let value = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| anyhow::anyhow!("Failed to encode session token: {}", e))?;

        Ok((value, exp))
    }

    pub fn decode(&self, value: &str) -> Result<DecodedSession, jsonwebtoken::errors::Error> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;

        let data = decode::<SessionClaims>(value, &self.decoding_key, &validation)?;
        let expires = Utc.timestamp_opt(data.claims.exp, 0).single();

        Ok(DecodedSession {
            token: data.claims.token,
            expires,
        })
    }

    pub fn session_cookie(&self, value: String) -> Cookie<'static> {
        Cookie::build((self.cookie_name.clone(), value))
            .path("/")
            .http_only(true)
            .same_site(SameSite::Lax)
            .secure(self.secure_cookie)
            .max_age(time::Duration::seconds(self.max_age_seconds()))
            .build()
    }

    /// Expired cookie that clears the session in the browser.
    pub fn removal_cookie(&self) -> Cookie<'static> {
        Cookie::build((self.cookie_name.clone(), ""))
            .path("/")
            .http_only(true)
            .same_site(SameSite::Lax)
            .secure(self.secure_cookie)
            .max_age(time::Duration::ZERO)
            .build()
    }
}
