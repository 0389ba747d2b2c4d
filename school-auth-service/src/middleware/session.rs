use axum_extra::extract::cookie::CookieJar;
use service_core::{
    axum::{
        async_trait,
        extract::{FromRequestParts, Request, State},
        http::{header, request::Parts, HeaderValue},
        middleware::Next,
        response::Response,
    },
    error::AppError,
};

use crate::{services::auth::ActiveSession, AppState};

/// Resolve the session cookie into an `ActiveSession` request extension.
/// On the way out a live session's expiry slides and a dead cookie is cleared.
pub async fn session_middleware(
    State(state): State<AppState>,
    jar: CookieJar,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let cookie_name = state.auth.sessions().cookie_name().to_string();

    let presented = jar.get(&cookie_name).map(|c| c.value().to_string());
    let active = match presented.as_deref() {
        Some(value) => state.auth.read_session(value).await?,
        None => None,
    };

    // Refresh a live session; clear a cookie that no longer maps to one.
    let outgoing = match (&active, presented) {
        (Some(active), _) => Some(
            state
                .auth
                .sessions()
                .session_cookie(active.cookie_value.clone()),
        ),
        (None, Some(_)) => Some(state.auth.sessions().removal_cookie()),
        (None, None) => None,
    };
    if let Some(active) = active {
        req.extensions_mut().insert(active);
    }

    let mut response = next.run(req).await;

    if let Some(cookie) = outgoing {
        let prefix = format!("{}=", cookie_name);
        let already_set = response
            .headers()
            .get_all(header::SET_COOKIE)
            .iter()
            .any(|v| v.to_str().map(|s| s.starts_with(&prefix)).unwrap_or(false));

        if !already_set {
            match HeaderValue::from_str(&cookie.to_string()) {
                Ok(v) => {
                    response.headers_mut().append(header::SET_COOKIE, v);
                }
                Err(e) => tracing::error!(error = %e, "Failed to encode session cookie"),
            }
        }
    }

    Ok(response)
}

/// Session if one is present; never rejects.
pub struct CurrentSession(pub Option<ActiveSession>);

#[async_trait]
impl<S> FromRequestParts<S> for CurrentSession
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(CurrentSession(parts.extensions.get::<ActiveSession>().cloned()))
    }
}

/// Session that must be present; 401 otherwise.
pub struct RequireSession(pub ActiveSession);

#[async_trait]
impl<S> FromRequestParts<S> for RequireSession
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<ActiveSession>()
            .cloned()
            .map(RequireSession)
            .ok_or_else(|| AppError::Unauthorized(anyhow::anyhow!("Not signed in")))
    }
}
