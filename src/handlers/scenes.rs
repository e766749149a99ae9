use crate::handlers::{
    bad_request, claims_user_id, find_owned_project, internal_error, not_found, ApiError,
};
use crate::middleware::auth::auth_middleware;
use crate::models::auth::Claims;
use crate::models::character::{Character, CharacterResponse};
use crate::models::scene::{Scene, SceneStatus, UpdateSceneRequest};
use crate::services::pipeline;
use crate::AppState;
use axum::{
    extract::{Extension, Path},
    response::Json,
    routing::{delete, get, put, Router},
};
use serde_json::json;
use std::sync::Arc;
use uuid::Uuid;

pub fn scene_routes() -> Router {
    Router::new()
        .route("/api/projects/:id/scenes", get(list_scenes))
        .route("/api/scenes/:id", put(update_scene))
        .route("/api/scenes/:id", delete(delete_scene))
        .layer(axum::middleware::from_fn(auth_middleware))
}

async fn list_scenes(
    Extension(state): Extension<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
    Path(project_id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let user_id = claims_user_id(&claims)?;
    find_owned_project(&state, project_id, user_id).await?;

    let scenes = sqlx::query_as::<_, Scene>(
        "SELECT * FROM scenes WHERE project_id = $1 ORDER BY scene_number ASC",
    )
    .bind(project_id)
    .fetch_all(&state.db_pool)
    .await
    .map_err(|e| {
        tracing::error!("Error listing scenes: {}", e);
        internal_error()
    })?;

    let characters = sqlx::query_as::<_, Character>(
        "SELECT * FROM characters WHERE project_id = $1 ORDER BY created_at ASC",
    )
    .bind(project_id)
    .fetch_all(&state.db_pool)
    .await
    .map_err(|e| {
        tracing::error!("Error loading characters for scenes: {}", e);
        internal_error()
    })?;

    let scenes: Vec<serde_json::Value> = scenes.iter().map(scene_json).collect();
    let characters: Vec<CharacterResponse> =
        characters.into_iter().map(CharacterResponse::from).collect();

    Ok(Json(json!({ "scenes": scenes, "characters": characters })))
}

/// Load a scene, enforcing ownership through its parent project.
async fn find_owned_scene(
    state: &AppState,
    scene_id: Uuid,
    user_id: Uuid,
) -> Result<Scene, ApiError> {
    sqlx::query_as::<_, Scene>(
        "SELECT s.* FROM scenes s
         JOIN projects p ON p.id = s.project_id
         WHERE s.id = $1 AND p.user_id = $2",
    )
    .bind(scene_id)
    .bind(user_id)
    .fetch_optional(&state.db_pool)
    .await
    .map_err(|e| {
        tracing::error!("Database error loading scene: {}", e);
        internal_error()
    })?
    .ok_or_else(|| not_found("Scene not found"))
}

async fn update_scene(
    Extension(state): Extension<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateSceneRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let user_id = claims_user_id(&claims)?;
    let scene = find_owned_scene(&state, id, user_id).await?;

    if let Some(ref status) = payload.status {
        if SceneStatus::parse(status).is_none() {
            return Err(bad_request("Invalid scene status"));
        }
    }

    let start = payload.start_time_seconds.unwrap_or(scene.start_time_seconds);
    let end = payload.end_time_seconds.unwrap_or(scene.end_time_seconds);
    if start < 0 || end <= start {
        return Err(bad_request("Scene end time must be after its start time"));
    }

    let scene = sqlx::query_as::<_, Scene>(
        "UPDATE scenes
         SET title = COALESCE($1, title),
             start_time_seconds = $2,
             end_time_seconds = $3,
             status = COALESCE($4, status),
             dialogue_text = COALESCE($5, dialogue_text),
             updated_at = NOW()
         WHERE id = $6
         RETURNING *",
    )
    .bind(&payload.title)
    .bind(start)
    .bind(end)
    .bind(&payload.status)
    .bind(&payload.dialogue_text)
    .bind(id)
    .fetch_one(&state.db_pool)
    .await
    .map_err(|e| {
        tracing::error!("Error updating scene: {}", e);
        internal_error()
    })?;

    Ok(Json(scene_json(&scene)))
}

async fn delete_scene(
    Extension(state): Extension<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let user_id = claims_user_id(&claims)?;
    find_owned_scene(&state, id, user_id).await?;

    sqlx::query("DELETE FROM scenes WHERE id = $1")
        .bind(id)
        .execute(&state.db_pool)
        .await
        .map_err(|e| {
            tracing::error!("Error deleting scene: {}", e);
            internal_error()
        })?;

    Ok(Json(json!({ "message": "Scene deleted successfully" })))
}

fn scene_json(scene: &Scene) -> serde_json::Value {
    json!({
        "scene_id": scene.id,
        "project_id": scene.project_id,
        "scene_number": scene.scene_number,
        "title": scene.title,
        "description": scene.description,
        "start_time_seconds": scene.start_time_seconds,
        "end_time_seconds": scene.end_time_seconds,
        "duration_seconds": scene.duration_seconds(),
        "status": scene.status,
        "storyboard_url": scene.storyboard_url,
        "dialogue": pipeline::parse_dialogue(scene.dialogue_text.as_deref()),
        "metadata": scene.metadata,
        "created_at": scene.created_at,
        "updated_at": scene.updated_at,
    })
}
