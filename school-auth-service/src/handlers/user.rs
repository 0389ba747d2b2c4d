use service_core::{
    axum::{extract::State, Json},
    error::AppError,
};

use crate::{dtos::auth::AccountProfile, middleware::RequireSession, AppState};

/// Profile of the signed-in account
#[utoipa::path(
    get,
    path = "/users/me",
    responses(
        (status = 200, description = "Current account", body = AccountProfile),
        (status = 401, description = "Not signed in", body = ErrorResponse)
    ),
    tag = "User",
    security(
        ("session_cookie" = [])
    )
)]
pub async fn get_me(
    State(state): State<AppState>,
    RequireSession(active): RequireSession,
) -> Result<Json<AccountProfile>, AppError> {
    state
        .auth
        .profile(&active.token)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::Unauthorized(anyhow::anyhow!("Not signed in")))
}
