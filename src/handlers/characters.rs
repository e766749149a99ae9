use crate::handlers::{
    bad_request, claims_user_id, find_owned_project, internal_error, not_found, ApiError,
};
use crate::middleware::auth::auth_middleware;
use crate::models::auth::Claims;
use crate::models::character::{
    Character, CharacterResponse, CreateCharactersRequest, UpdateCharacterRequest,
};
use crate::services::media;
use crate::AppState;
use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::Json,
    routing::{delete, get, post, put, Router},
};
use serde_json::json;
use std::sync::Arc;
use uuid::Uuid;

pub fn character_routes() -> Router {
    Router::new()
        .route("/api/projects/:id/characters", post(create_characters))
        .route("/api/projects/:id/characters", get(list_characters))
        .route("/api/characters/:id", put(update_character))
        .route("/api/characters/:id", delete(delete_character))
        .layer(axum::middleware::from_fn(auth_middleware))
}

async fn create_characters(
    Extension(state): Extension<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
    Path(project_id): Path<Uuid>,
    Json(payload): Json<CreateCharactersRequest>,
) -> Result<(StatusCode, Json<serde_json::Value>), ApiError> {
    let user_id = claims_user_id(&claims)?;
    let project = find_owned_project(&state, project_id, user_id).await?;

    if payload.actions.is_empty() {
        return Err(bad_request("At least one character action is required"));
    }

    let mut created: Vec<CharacterResponse> = Vec::with_capacity(payload.actions.len());

    for action in &payload.actions {
        if action.name.trim().is_empty() {
            return Err(bad_request("Character name is required"));
        }

        let image_url = match action.image_choice.as_str() {
            "generated" => {
                let appearance = action
                    .metadata
                    .as_ref()
                    .and_then(|m| m.get("appearance"))
                    .and_then(|v| v.as_str())
                    .unwrap_or(&action.name)
                    .to_string();
                Some(
                    media::generate_character_visual(
                        state.stability_client.as_ref(),
                        &action.name,
                        &appearance,
                        &project.style,
                    )
                    .await,
                )
            }
            "upload" => action
                .metadata
                .as_ref()
                .and_then(|m| m.get("image_url"))
                .and_then(|v| v.as_str())
                .map(|s| s.to_string()),
            other => {
                return Err(bad_request(format!("Unknown image_choice '{}'", other)));
            }
        };

        let character = sqlx::query_as::<_, Character>(
            "INSERT INTO characters (project_id, name, role, image_url, image_metadata, voice_style_id)
             VALUES ($1, $2, $3, $4, $5, $6)
             RETURNING *",
        )
        .bind(project_id)
        .bind(action.name.trim())
        .bind(&action.role)
        .bind(&image_url)
        .bind(&action.metadata)
        .bind(action.voice_style_id)
        .fetch_one(&state.db_pool)
        .await
        .map_err(|e| {
            tracing::error!("Error creating character: {}", e);
            internal_error()
        })?;

        created.push(CharacterResponse::from(character));
    }

    tracing::info!(%project_id, count = created.len(), "Characters created");

    Ok((
        StatusCode::CREATED,
        Json(json!({ "characters": created })),
    ))
}

async fn list_characters(
    Extension(state): Extension<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
    Path(project_id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let user_id = claims_user_id(&claims)?;
    find_owned_project(&state, project_id, user_id).await?;

    let characters = sqlx::query_as::<_, Character>(
        "SELECT * FROM characters WHERE project_id = $1 ORDER BY created_at ASC",
    )
    .bind(project_id)
    .fetch_all(&state.db_pool)
    .await
    .map_err(|e| {
        tracing::error!("Error listing characters: {}", e);
        internal_error()
    })?;

    let characters: Vec<CharacterResponse> =
        characters.into_iter().map(CharacterResponse::from).collect();

    Ok(Json(json!({ "characters": characters })))
}

/// Load a character, enforcing ownership through its parent project.
async fn find_owned_character(
    state: &AppState,
    character_id: Uuid,
    user_id: Uuid,
) -> Result<Character, ApiError> {
    sqlx::query_as::<_, Character>(
        "SELECT c.* FROM characters c
         JOIN projects p ON p.id = c.project_id
         WHERE c.id = $1 AND p.user_id = $2",
    )
    .bind(character_id)
    .bind(user_id)
    .fetch_optional(&state.db_pool)
    .await
    .map_err(|e| {
        tracing::error!("Database error loading character: {}", e);
        internal_error()
    })?
    .ok_or_else(|| not_found("Character not found"))
}

async fn update_character(
    Extension(state): Extension<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateCharacterRequest>,
) -> Result<Json<CharacterResponse>, ApiError> {
    let user_id = claims_user_id(&claims)?;
    find_owned_character(&state, id, user_id).await?;

    if let Some(ref name) = payload.name {
        if name.trim().is_empty() {
            return Err(bad_request("Character name cannot be empty"));
        }
    }

    let character = sqlx::query_as::<_, Character>(
        "UPDATE characters
         SET name = COALESCE($1, name),
             role = COALESCE($2, role),
             image_url = COALESCE($3, image_url),
             image_metadata = COALESCE($4, image_metadata),
             voice_style_id = COALESCE($5, voice_style_id),
             updated_at = NOW()
         WHERE id = $6
         RETURNING *",
    )
    .bind(&payload.name)
    .bind(&payload.role)
    .bind(&payload.image_url)
    .bind(&payload.image_metadata)
    .bind(payload.voice_style_id)
    .bind(id)
    .fetch_one(&state.db_pool)
    .await
    .map_err(|e| {
        tracing::error!("Error updating character: {}", e);
        internal_error()
    })?;

    Ok(Json(CharacterResponse::from(character)))
}

async fn delete_character(
    Extension(state): Extension<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let user_id = claims_user_id(&claims)?;
    find_owned_character(&state, id, user_id).await?;

    sqlx::query("DELETE FROM characters WHERE id = $1")
        .bind(id)
        .execute(&state.db_pool)
        .await
        .map_err(|e| {
            tracing::error!("Error deleting character: {}", e);
            internal_error()
        })?;

    Ok(Json(json!({ "message": "Character deleted successfully" })))
}
