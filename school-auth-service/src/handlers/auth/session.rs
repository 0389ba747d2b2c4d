use axum_extra::extract::cookie::CookieJar;
use service_core::{
    axum::{
        extract::State,
        response::{IntoResponse, Redirect},
        Json,
    },
    error::AppError,
};

use crate::{
    dtos::auth::{LoginRequest, LoginResponse},
    middleware::CurrentSession,
    models::Session,
    services::{auth::resolve_dashboard, CredentialSource},
    AppState,
};

/// Sign in with email and password
#[utoipa::path(
    post,
    path = "/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Signed in; session cookie set", body = LoginResponse),
        (status = 400, description = "Email or password missing", body = ErrorResponse),
        (status = 401, description = "Invalid credentials", body = ErrorResponse),
        (status = 429, description = "Too many attempts", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "Authentication"
)]
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(req): Json<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    let source = CredentialSource::new(
        req.email.unwrap_or_default(),
        req.password.unwrap_or_default(),
    );
    let signed_in = state.auth.sign_in(&source).await?;

    let jar = jar.add(state.auth.sessions().session_cookie(signed_in.cookie_value));

    Ok((
        jar,
        Json(LoginResponse {
            message: "Signed in".to_string(),
            user: signed_in.identity,
            redirect: signed_in.redirect,
        }),
    ))
}

/// Current session, or `null` when signed out
#[utoipa::path(
    get,
    path = "/auth/session",
    responses(
        (status = 200, description = "Session, or null when signed out", body = Session)
    ),
    tag = "Authentication"
)]
pub async fn session(CurrentSession(active): CurrentSession) -> Json<Option<Session>> {
    Json(active.map(|a| a.session))
}

/// Send the browser to its landing page
#[utoipa::path(
    get,
    path = "/auth/redirect",
    responses(
        (status = 303, description = "Redirect to /login or the role dashboard")
    ),
    tag = "Authentication"
)]
pub async fn redirect(
    State(state): State<AppState>,
    CurrentSession(active): CurrentSession,
) -> Redirect {
    let path = resolve_dashboard(active.as_ref().map(|a| &a.session));
    Redirect::to(&state.config.absolute_url(&path))
}

/// Clear the session cookie
#[utoipa::path(
    post,
    path = "/auth/signout",
    responses(
        (status = 200, description = "Signed out")
    ),
    tag = "Authentication"
)]
pub async fn signout(State(state): State<AppState>, jar: CookieJar) -> impl IntoResponse {
    let jar = jar.add(state.auth.sessions().removal_cookie());
    (
        jar,
        Json(serde_json::json!({
            "message": "Signed out"
        })),
    )
}
