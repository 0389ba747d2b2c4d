//! Shared setup for school-auth-service integration tests.
//!
//! Builds the full router over the in-memory account store and a mock
//! identity provider, driven with `tower::ServiceExt::oneshot`.

#![allow(dead_code)]

use axum::{
    body::Body,
    http::{header, Request, Response, StatusCode},
    Router,
};
use school_auth_service::{
    build_router,
    config::{
        AppConfig, Environment, GoogleOAuthConfig, MongoConfig, RateLimitConfig, SecurityConfig,
        SessionConfig, SwaggerConfig, SwaggerMode,
    },
    models::{AuthProvider, NewAccount},
    services::{AccountStore, InMemoryAccountStore, MockOAuthProvider, ProviderProfile},
    utils::{hash_password, Password},
    AppState,
};
use secrecy::Secret;
use std::net::SocketAddr;
use std::sync::Arc;
use tower::util::ServiceExt;

pub const PUBLIC_URL: &str = "http://localhost:3001";
pub const COOKIE_NAME: &str = "school.session-token";

pub fn test_config() -> AppConfig {
    AppConfig {
        common: service_core::config::Config::default(),
        environment: Environment::Dev,
        service_name: "school-auth-service-test".to_string(),
        service_version: "test".to_string(),
        log_level: "error".to_string(),
        otlp_endpoint: None,
        public_url: PUBLIC_URL.to_string(),
        mongodb: MongoConfig {
            uri: "mongodb://localhost:27017".to_string(),
            database: "school_test".to_string(),
            store_timeout_ms: 2000,
        },
        session: SessionConfig {
            secret: Secret::new("test-session-secret-0123456789abcdef".to_string()),
            cookie_name: COOKIE_NAME.to_string(),
            max_age_days: 30,
            secure_cookie: false,
        },
        google: GoogleOAuthConfig {
            client_id: "test-client".to_string(),
            client_secret: Secret::new("test-secret".to_string()),
            redirect_uri: format!("{}/auth/google/callback", PUBLIC_URL),
        },
        security: SecurityConfig {
            allowed_origins: vec!["http://localhost:3000".to_string()],
        },
        swagger: SwaggerConfig {
            enabled: SwaggerMode::Disabled,
        },
        rate_limit: RateLimitConfig {
            login_attempts: 1000,
            login_window_seconds: 60,
            register_attempts: 1000,
            register_window_seconds: 60,
            global_ip_limit: 1000,
            global_ip_window_seconds: 60,
        },
    }
}

pub fn google_profile(email: &str, avatar: Option<&str>) -> ProviderProfile {
    ProviderProfile {
        provider: AuthProvider::Google,
        email: email.to_string(),
        email_verified: true,
        name: Some("OAuth User".to_string()),
        avatar_url: avatar.map(str::to_string),
    }
}

pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    pub store: Arc<InMemoryAccountStore>,
}

impl TestApp {
    pub async fn spawn() -> Self {
        Self::spawn_with(test_config(), MockOAuthProvider::new()).await
    }

    pub async fn spawn_with(config: AppConfig, oauth: MockOAuthProvider) -> Self {
        let store = Arc::new(InMemoryAccountStore::new());
        Self::spawn_with_store(config, store.clone(), oauth, store).await
    }

    /// Router over an arbitrary store; `store` is kept for seeding and inspection.
    pub async fn spawn_with_store(
        config: AppConfig,
        backend: Arc<dyn AccountStore>,
        oauth: MockOAuthProvider,
        store: Arc<InMemoryAccountStore>,
    ) -> Self {
        let state =
            AppState::new(config, backend, Arc::new(oauth)).expect("Failed to build state");
        let router = build_router(state.clone())
            .await
            .expect("Failed to build router");

        TestApp {
            router,
            state,
            store,
        }
    }

    /// Insert a credentials account directly into the store.
    pub async fn seed_credentials(&self, email: &str, password: &str, name: &str) -> String {
        let hash = hash_password(&Password::new(password.to_string())).expect("hash");
        let account = self
            .store
            .create(NewAccount::credentials(
                email.to_string(),
                Some(name.to_string()),
                hash.into_string(),
            ))
            .await
            .expect("seed account");
        account.id
    }

    pub async fn send(&self, request: Request<Body>) -> Response<Body> {
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to execute request")
    }

    pub async fn post_json(&self, uri: &str, body: serde_json::Value) -> Response<Body> {
        self.send(
            request_builder("POST", uri)
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
    }

    pub async fn get(&self, uri: &str, cookie: Option<&str>) -> Response<Body> {
        let mut builder = request_builder("GET", uri);
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        self.send(builder.body(Body::empty()).unwrap()).await
    }

    /// Sign in through `/auth/login` and return the `name=value` session cookie.
    pub async fn login(&self, email: &str, password: &str) -> String {
        let response = self
            .post_json(
                "/auth/login",
                serde_json::json!({ "email": email, "password": password }),
            )
            .await;
        assert_eq!(response.status(), StatusCode::OK);
        session_cookie(&response).expect("login sets session cookie")
    }
}

pub fn request_builder(method: &str, uri: &str) -> axum::http::request::Builder {
    Request::builder()
        .method(method)
        .uri(uri)
        .extension(axum::extract::ConnectInfo(SocketAddr::from((
            [127, 0, 0, 1],
            8080,
        ))))
}

/// All `Set-Cookie` header values on a response.
pub fn set_cookies(response: &Response<Body>) -> Vec<String> {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .map(str::to_string)
        .collect()
}

/// `name=value` of a non-empty session cookie set by the response.
pub fn session_cookie(response: &Response<Body>) -> Option<String> {
    let prefix = format!("{}=", COOKIE_NAME);
    set_cookies(response)
        .into_iter()
        .filter(|c| c.starts_with(&prefix))
        .filter_map(|c| c.split(';').next().map(str::to_string))
        .find(|pair| pair.len() > prefix.len())
}

pub fn location(response: &Response<Body>) -> String {
    response
        .headers()
        .get(header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string()
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("Failed to read body");
    serde_json::from_slice(&bytes).expect("Body is not JSON")
}
