use async_trait::async_trait;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use rand::RngCore;
use secrecy::{ExposeSecret, Secret};
use serde::Deserialize;
use sha2::{Digest, Sha256};
use std::collections::HashMap;

use crate::config::GoogleOAuthConfig;
use crate::models::AuthProvider;

const GOOGLE_AUTH_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
const GOOGLE_USERINFO_URL: &str = "https://www.googleapis.com/oauth2/v2/userinfo";

/// Profile returned by an external identity provider after code exchange.
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderProfile {
    pub provider: AuthProvider,
    pub email: String,
    pub email_verified: bool,
    pub name: Option<String>,
    pub avatar_url: Option<String>,
}

#[async_trait]
pub trait OAuthProvider: Send + Sync {
    fn provider(&self) -> AuthProvider;

    /// URL the browser is sent to. `challenge` is the S256 PKCE challenge.
    fn authorization_url(&self, state: &str, challenge: &str) -> String;

    async fn exchange_code(
        &self,
        code: &str,
        verifier: &str,
    ) -> Result<ProviderProfile, anyhow::Error>;
}

/// PKCE verifier/challenge pair (RFC 7636, S256).
pub struct Pkce {
    pub verifier: String,
    pub challenge: String,
}

impl Pkce {
    pub fn generate() -> Self {
        let mut bytes = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut bytes);
        let verifier = URL_SAFE_NO_PAD.encode(bytes);
        let challenge = Self::challenge_for(&verifier);
        Self {
            verifier,
            challenge,
        }
    }

    pub fn challenge_for(verifier: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(verifier.as_bytes());
        URL_SAFE_NO_PAD.encode(hasher.finalize())
    }
}

#[derive(Debug, Deserialize)]
struct GoogleTokenResponse {
    access_token: String,
}

#[derive(Debug, Deserialize)]
struct GoogleUserInfo {
    email: String,
    #[serde(default)]
    verified_email: bool,
    name: Option<String>,
    picture: Option<String>,
}

pub struct GoogleOAuthClient {
    http: reqwest::Client,
    client_id: String,
    client_secret: Secret<String>,
    redirect_uri: String,
}

impl GoogleOAuthClient {
    pub fn new(config: &GoogleOAuthConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            client_id: config.client_id.clone(),
            client_secret: config.client_secret.clone(),
            redirect_uri: config.redirect_uri.clone(),
        }
    }
}

#[async_trait]
impl OAuthProvider for GoogleOAuthClient {
    fn provider(&self) -> AuthProvider {
        AuthProvider::Google
    }

    fn authorization_url(&self, state: &str, challenge: &str) -> String {
        format!(
            "{}?client_id={}&redirect_uri={}&response_type=code&scope=openid%20email%20profile&state={}&code_challenge={}&code_challenge_method=S256",
            GOOGLE_AUTH_URL,
            urlencoding::encode(&self.client_id),
            urlencoding::encode(&self.redirect_uri),
            urlencoding::encode(state),
            challenge
        )
    }

    async fn exchange_code(
        &self,
        code: &str,
        verifier: &str,
    ) -> Result<ProviderProfile, anyhow::Error> {
        let token_res = self
            .http
            .post(GOOGLE_TOKEN_URL)
            .form(&[
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.expose_secret().as_str()),
                ("code", code),
                ("code_verifier", verifier),
                ("grant_type", "authorization_code"),
                ("redirect_uri", self.redirect_uri.as_str()),
            ])
            .send()
            .await
            .map_err(|e| anyhow::anyhow!("Failed to exchange Google code: {}", e))?;

        if !token_res.status().is_success() {
            let status = token_res.status();
            let body = token_res.text().await.unwrap_or_default();
            tracing::error!(status = %status, body = %body, "Google token exchange error");
            return Err(anyhow::anyhow!("Google token exchange returned {}", status));
        }

        let token: GoogleTokenResponse = token_res
            .json()
            .await
            .map_err(|e| anyhow::anyhow!("Failed to parse Google token response: {}", e))?;

        let info: GoogleUserInfo = self
            .http
            .get(GOOGLE_USERINFO_URL)
            .bearer_auth(token.access_token)
            .send()
            .await
            .map_err(|e| anyhow::anyhow!("Failed to fetch Google user info: {}", e))?
            .error_for_status()
            .map_err(|e| anyhow::anyhow!("Google user info request failed: {}", e))?
            .json()
            .await
            .map_err(|e| anyhow::anyhow!("Failed to parse Google user info: {}", e))?;

        Ok(ProviderProfile {
            provider: AuthProvider::Google,
            email: info.email,
            email_verified: info.verified_email,
            name: info.name,
            avatar_url: info.picture,
        })
    }
}

/// Provider double: each known authorization code maps to a fixed profile.
#[derive(Default)]
pub struct MockOAuthProvider {
    profiles: std::sync::Mutex<HashMap<String, ProviderProfile>>,
}

impl MockOAuthProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_profile(self, code: &str, profile: ProviderProfile) -> Self {
        if let Ok(mut profiles) = self.profiles.lock() {
            profiles.insert(code.to_string(), profile);
        }
        self
    }
}

#[async_trait]
impl OAuthProvider for MockOAuthProvider {
    fn provider(&self) -> AuthProvider {
        AuthProvider::Google
    }

    fn authorization_url(&self, state: &str, challenge: &str) -> String {
        format!(
            "https://oauth.test/authorize?state={}&code_challenge={}",
            state, challenge
        )
    }

    async fn exchange_code(
        &self,
        code: &str,
        _verifier: &str,
    ) -> Result<ProviderProfile, anyhow::Error> {
        self.profiles
            .lock()
            .map_err(|e| anyhow::anyhow!("Mock provider mutex poisoned: {}", e))?
            .get(code)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("Unknown authorization code"))
    }
}
