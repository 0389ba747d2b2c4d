use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use service_core::{
    axum::{
        extract::{Query, State},
        response::Redirect,
    },
    error::AppError,
};

use crate::{
    dtos::auth::GoogleCallbackQuery,
    services::{auth::LOGIN_PATH, OAuthSource, Pkce, ServiceError},
    AppState,
};

const OAUTH_STATE_COOKIE: &str = "oauth_state";
const CODE_VERIFIER_COOKIE: &str = "code_verifier";

fn short_lived_cookie(name: &'static str, value: String, secure: bool) -> Cookie<'static> {
    Cookie::build((name, value))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(secure)
        .max_age(time::Duration::minutes(5))
        .build()
}

fn clear_handshake(jar: CookieJar) -> CookieJar {
    jar.remove(Cookie::build(OAUTH_STATE_COOKIE).path("/"))
        .remove(Cookie::build(CODE_VERIFIER_COOKIE).path("/"))
}

fn denied(state: &AppState, jar: CookieJar) -> (CookieJar, Redirect) {
    let url = state
        .config
        .absolute_url(&format!("{}?error=AccessDenied", LOGIN_PATH));
    (clear_handshake(jar), Redirect::to(&url))
}

/// Start Google sign-in
#[utoipa::path(
    get,
    path = "/auth/google",
    responses(
        (status = 303, description = "Redirect to Google consent screen")
    ),
    tag = "Authentication"
)]
pub async fn google_login(State(state): State<AppState>, jar: CookieJar) -> (CookieJar, Redirect) {
    let state_val = uuid::Uuid::new_v4().to_string();
    let pkce = Pkce::generate();
    let url = state.oauth.authorization_url(&state_val, &pkce.challenge);
    let secure = state.config.session.secure_cookie;

    let jar = jar
        .add(short_lived_cookie(OAUTH_STATE_COOKIE, state_val, secure))
        .add(short_lived_cookie(CODE_VERIFIER_COOKIE, pkce.verifier, secure));

    (jar, Redirect::to(&url))
}

/// Finish Google sign-in
#[utoipa::path(
    get,
    path = "/auth/google/callback",
    params(GoogleCallbackQuery),
    responses(
        (status = 303, description = "Redirect to the role dashboard, or to /login?error=AccessDenied"),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "Authentication"
)]
pub async fn google_callback(
    State(state): State<AppState>,
    jar: CookieJar,
    Query(query): Query<GoogleCallbackQuery>,
) -> Result<(CookieJar, Redirect), AppError> {
    if let Some(error) = query.error.as_deref() {
        tracing::info!(error = %error, "Provider reported sign-in error");
        return Ok(denied(&state, jar));
    }

    let stored_state = jar.get(OAUTH_STATE_COOKIE).map(|c| c.value().to_string());
    if stored_state.is_none() || stored_state != query.state {
        tracing::warn!("OAuth state mismatch");
        return Ok(denied(&state, jar));
    }

    let (Some(code), Some(verifier)) = (
        query.code.as_deref(),
        jar.get(CODE_VERIFIER_COOKIE).map(|c| c.value().to_string()),
    ) else {
        tracing::warn!("OAuth callback without code or verifier");
        return Ok(denied(&state, jar));
    };

    let profile = match state.oauth.exchange_code(code, &verifier).await {
        Ok(profile) => profile,
        Err(e) => {
            tracing::warn!(error = %e, "Provider code exchange failed");
            return Ok(denied(&state, jar));
        }
    };

    match state.auth.sign_in(&OAuthSource::new(profile)).await {
        Ok(signed_in) => {
            let jar = clear_handshake(jar)
                .add(state.auth.sessions().session_cookie(signed_in.cookie_value));
            Ok((jar, Redirect::to(&state.config.absolute_url(&signed_in.redirect))))
        }
        Err(e @ (ServiceError::Storage(_) | ServiceError::Internal(_))) => Err(e.into()),
        Err(e) => {
            tracing::info!(reason = e.kind(), "Provider sign-in denied");
            Ok(denied(&state, jar))
        }
    }
}
