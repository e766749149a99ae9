use crate::models::auth::{Claims, ErrorResponse};
use crate::models::project::Project;
use crate::AppState;
use axum::http::StatusCode;
use axum::response::Json;
use uuid::Uuid;

pub mod auth;
pub mod billing;
pub mod characters;
pub mod generation;
pub mod notifications;
pub mod projects;
pub mod render;
pub mod scenes;
pub mod voices;

pub type ApiError = (StatusCode, Json<ErrorResponse>);

pub fn internal_error() -> ApiError {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorResponse::new("Internal server error")),
    )
}

pub fn bad_request(message: impl Into<String>) -> ApiError {
    (StatusCode::BAD_REQUEST, Json(ErrorResponse::new(message)))
}

pub fn not_found(message: impl Into<String>) -> ApiError {
    (StatusCode::NOT_FOUND, Json(ErrorResponse::new(message)))
}

pub fn unauthorized(message: impl Into<String>) -> ApiError {
    (StatusCode::UNAUTHORIZED, Json(ErrorResponse::new(message)))
}

/// Resolve the caller's user id from JWT claims.
pub fn claims_user_id(claims: &Claims) -> Result<Uuid, ApiError> {
    claims
        .user_id()
        .map_err(|_| unauthorized("Invalid token subject"))
}

/// Load a project, enforcing that it belongs to the caller.
pub async fn find_owned_project(
    state: &AppState,
    project_id: Uuid,
    user_id: Uuid,
) -> Result<Project, ApiError> {
    sqlx::query_as::<_, Project>("SELECT * FROM projects WHERE id = $1 AND user_id = $2")
        .bind(project_id)
        .bind(user_id)
        .fetch_optional(&state.db_pool)
        .await
        .map_err(|e| {
            tracing::error!("Database error loading project: {}", e);
            internal_error()
        })?
        .ok_or_else(|| not_found("Project not found"))
}
