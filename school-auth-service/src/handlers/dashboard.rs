use service_core::{
    axum::{
        extract::{Path, State},
        response::{IntoResponse, Redirect, Response},
        Json,
    },
    error::AppError,
};

use crate::{
    dtos::auth::DashboardResponse,
    middleware::CurrentSession,
    models::Role,
    services::auth::{guard_dashboard, DashboardAccess},
    AppState,
};

/// Role dashboard entry point
#[utoipa::path(
    get,
    path = "/dashboard/{role}",
    params(
        ("role" = String, Path, description = "student, teacher, admin or owner")
    ),
    responses(
        (status = 200, description = "Session may view this dashboard", body = DashboardResponse),
        (status = 303, description = "Redirect to the caller's own dashboard or /login"),
        (status = 404, description = "Unknown role", body = ErrorResponse)
    ),
    tag = "Dashboard"
)]
pub async fn dashboard(
    State(state): State<AppState>,
    Path(role): Path<String>,
    CurrentSession(active): CurrentSession,
) -> Result<Response, AppError> {
    let requested: Role = role
        .parse()
        .map_err(|e: String| AppError::NotFound(anyhow::anyhow!(e)))?;

    let session = active.map(|a| a.session);

    match guard_dashboard(session.as_ref(), requested) {
        DashboardAccess::Allow => match session {
            Some(session) => Ok(Json(DashboardResponse {
                role: requested,
                session,
            })
            .into_response()),
            None => Err(AppError::Unauthorized(anyhow::anyhow!("Not signed in"))),
        },
        DashboardAccess::Redirect(path) => {
            Ok(Redirect::to(&state.config.absolute_url(&path)).into_response())
        }
    }
}
