use crate::handlers::{bad_request, claims_user_id, find_owned_project, internal_error, ApiError};
use crate::middleware::auth::auth_middleware;
use crate::models::auth::Claims;
use crate::models::character::Character;
use crate::models::project::{
    is_allowed_style, CreateProjectRequest, Project, ProjectStatus, UpdateProjectRequest,
};
use crate::models::scene::Scene;
use crate::AppState;
use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::Json,
    routing::{delete, get, post, put, Router},
};
use chrono::{DateTime, Utc};
use serde_json::json;
use sqlx::FromRow;
use std::sync::Arc;
use uuid::Uuid;

pub fn project_routes() -> Router {
    Router::new()
        .route("/api/projects", post(create_project))
        .route("/api/projects", get(list_projects))
        .route("/api/projects/:id", get(get_project))
        .route("/api/projects/:id", put(update_project))
        .route("/api/projects/:id", delete(delete_project))
        .layer(axum::middleware::from_fn(auth_middleware))
}

fn validate_create(payload: &CreateProjectRequest) -> Result<(), ApiError> {
    if payload.title.is_empty() || payload.title.len() > 200 {
        return Err(bad_request("Title must be between 1 and 200 characters"));
    }
    if payload.prompt_text.len() < 10 {
        return Err(bad_request("Prompt text must be at least 10 characters"));
    }
    if !(1..=120).contains(&payload.target_length_minutes) {
        return Err(bad_request("Target length must be between 1 and 120 minutes"));
    }
    if !is_allowed_style(&payload.style) {
        return Err(bad_request("Unsupported animation style"));
    }
    Ok(())
}

async fn create_project(
    Extension(state): Extension<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<CreateProjectRequest>,
) -> Result<(StatusCode, Json<serde_json::Value>), ApiError> {
    let user_id = claims_user_id(&claims)?;
    validate_create(&payload)?;

    let project = sqlx::query_as::<_, Project>(
        "INSERT INTO projects (user_id, title, description, prompt_text,
                               target_length_minutes, style, status)
         VALUES ($1, $2, $3, $4, $5, $6, $7)
         RETURNING *",
    )
    .bind(user_id)
    .bind(&payload.title)
    .bind(&payload.description)
    .bind(&payload.prompt_text)
    .bind(payload.target_length_minutes)
    .bind(&payload.style)
    .bind(ProjectStatus::Draft.as_str())
    .fetch_one(&state.db_pool)
    .await
    .map_err(|e| {
        tracing::error!("Error creating project: {}", e);
        internal_error()
    })?;

    Ok((StatusCode::CREATED, Json(project_json(&project))))
}

#[derive(FromRow)]
struct ProjectListRow {
    id: Uuid,
    title: String,
    status: String,
    style: String,
    target_length_minutes: i32,
    thumbnail_url: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    character_count: i64,
    scene_count: i64,
}

async fn list_projects(
    Extension(state): Extension<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let user_id = claims_user_id(&claims)?;

    let rows = sqlx::query_as::<_, ProjectListRow>(
        "SELECT p.id, p.title, p.status, p.style, p.target_length_minutes,
                p.thumbnail_url, p.created_at, p.updated_at,
                (SELECT COUNT(*) FROM characters c WHERE c.project_id = p.id) AS character_count,
                (SELECT COUNT(*) FROM scenes s WHERE s.project_id = p.id) AS scene_count
         FROM projects p
         WHERE p.user_id = $1
         ORDER BY p.created_at DESC",
    )
    .bind(user_id)
    .fetch_all(&state.db_pool)
    .await
    .map_err(|e| {
        tracing::error!("Error listing projects: {}", e);
        internal_error()
    })?;

    let projects: Vec<serde_json::Value> = rows
        .iter()
        .map(|p| {
            json!({
                "project_id": p.id,
                "title": p.title,
                "status": p.status,
                "style": p.style,
                "target_length_minutes": p.target_length_minutes,
                "thumbnail_url": p.thumbnail_url,
                "created_at": p.created_at,
                "updated_at": p.updated_at,
                "character_count": p.character_count,
                "scene_count": p.scene_count,
            })
        })
        .collect();

    Ok(Json(json!({ "projects": projects })))
}

async fn get_project(
    Extension(state): Extension<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let user_id = claims_user_id(&claims)?;
    let project = find_owned_project(&state, id, user_id).await?;

    let characters = sqlx::query_as::<_, Character>(
        "SELECT * FROM characters WHERE project_id = $1 ORDER BY created_at ASC",
    )
    .bind(id)
    .fetch_all(&state.db_pool)
    .await
    .map_err(|e| {
        tracing::error!("Error loading characters: {}", e);
        internal_error()
    })?;

    let scenes = sqlx::query_as::<_, Scene>(
        "SELECT * FROM scenes WHERE project_id = $1 ORDER BY scene_number ASC",
    )
    .bind(id)
    .fetch_all(&state.db_pool)
    .await
    .map_err(|e| {
        tracing::error!("Error loading scenes: {}", e);
        internal_error()
    })?;

    let render_job_count: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM render_jobs WHERE project_id = $1")
            .bind(id)
            .fetch_one(&state.db_pool)
            .await
            .map_err(|e| {
                tracing::error!("Error counting render jobs: {}", e);
                internal_error()
            })?;

    let mut body = project_json(&project);
    body["characters"] = json!(characters);
    body["scenes"] = json!(scenes);
    body["render_job_count"] = json!(render_job_count);

    Ok(Json(body))
}

async fn update_project(
    Extension(state): Extension<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateProjectRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let user_id = claims_user_id(&claims)?;
    find_owned_project(&state, id, user_id).await?;

    if let Some(ref title) = payload.title {
        if title.is_empty() || title.len() > 200 {
            return Err(bad_request("Title must be between 1 and 200 characters"));
        }
    }
    if let Some(ref prompt_text) = payload.prompt_text {
        if prompt_text.len() < 10 {
            return Err(bad_request("Prompt text must be at least 10 characters"));
        }
    }
    if let Some(target) = payload.target_length_minutes {
        if !(1..=120).contains(&target) {
            return Err(bad_request("Target length must be between 1 and 120 minutes"));
        }
    }
    if let Some(ref style) = payload.style {
        if !is_allowed_style(style) {
            return Err(bad_request("Unsupported animation style"));
        }
    }
    if let Some(ref status) = payload.status {
        if ProjectStatus::parse(status).is_none() {
            return Err(bad_request("Invalid project status"));
        }
    }

    let project = sqlx::query_as::<_, Project>(
        "UPDATE projects
         SET title = COALESCE($1, title),
             description = COALESCE($2, description),
             prompt_text = COALESCE($3, prompt_text),
             target_length_minutes = COALESCE($4, target_length_minutes),
             style = COALESCE($5, style),
             status = COALESCE($6, status),
             updated_at = NOW()
         WHERE id = $7
         RETURNING *",
    )
    .bind(&payload.title)
    .bind(&payload.description)
    .bind(&payload.prompt_text)
    .bind(payload.target_length_minutes)
    .bind(&payload.style)
    .bind(&payload.status)
    .bind(id)
    .fetch_one(&state.db_pool)
    .await
    .map_err(|e| {
        tracing::error!("Error updating project: {}", e);
        internal_error()
    })?;

    Ok(Json(project_json(&project)))
}

async fn delete_project(
    Extension(state): Extension<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let user_id = claims_user_id(&claims)?;
    find_owned_project(&state, id, user_id).await?;

    // characters, scenes, and render jobs cascade via foreign keys
    sqlx::query("DELETE FROM projects WHERE id = $1")
        .bind(id)
        .execute(&state.db_pool)
        .await
        .map_err(|e| {
            tracing::error!("Error deleting project: {}", e);
            internal_error()
        })?;

    Ok(Json(json!({ "message": "Project deleted successfully" })))
}

fn project_json(project: &Project) -> serde_json::Value {
    json!({
        "project_id": project.id,
        "user_id": project.user_id,
        "title": project.title,
        "description": project.description,
        "prompt_text": project.prompt_text,
        "target_length_minutes": project.target_length_minutes,
        "style": project.style,
        "status": project.status,
        "thumbnail_url": project.thumbnail_url,
        "final_video_url": project.final_video_url,
        "completed_at": project.completed_at,
        "created_at": project.created_at,
        "updated_at": project.updated_at,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_request() -> CreateProjectRequest {
        CreateProjectRequest {
            title: "My Film".to_string(),
            description: None,
            prompt_text: "Once upon a time in a faraway land".to_string(),
            target_length_minutes: 10,
            style: "2D_flat".to_string(),
        }
    }

    #[test]
    fn accepts_a_valid_create_request() {
        assert!(validate_create(&valid_request()).is_ok());
    }

    #[test]
    fn rejects_bad_titles() {
        let mut req = valid_request();
        req.title = String::new();
        assert!(validate_create(&req).is_err());
        req.title = "x".repeat(201);
        assert!(validate_create(&req).is_err());
    }

    #[test]
    fn rejects_short_prompt_text() {
        let mut req = valid_request();
        req.prompt_text = "too short".to_string();
        assert!(validate_create(&req).is_err());
    }

    #[test]
    fn rejects_out_of_range_target_length() {
        let mut req = valid_request();
        req.target_length_minutes = 0;
        assert!(validate_create(&req).is_err());
        req.target_length_minutes = 121;
        assert!(validate_create(&req).is_err());
        req.target_length_minutes = 120;
        assert!(validate_create(&req).is_ok());
    }

    #[test]
    fn rejects_unknown_style() {
        let mut req = valid_request();
        req.style = "stop_motion".to_string();
        assert!(validate_create(&req).is_err());
    }
}
