use crate::handlers::{
    bad_request, claims_user_id, find_owned_project, internal_error, not_found, ApiError,
};
use crate::middleware::auth::auth_middleware;
use crate::models::auth::Claims;
use crate::models::project::{is_allowed_style, Project, ProjectStatus};
use crate::models::scene::{Scene, SceneStatus};
use crate::services::pipeline;
use crate::AppState;
use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::Json,
    routing::{get, post, Router},
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use uuid::Uuid;

const MIN_SCRIPT_LENGTH: usize = 100;
const DEFAULT_TARGET_MINUTES: i32 = 40;
const DEFAULT_STYLE: &str = "2D_flat";

pub fn generation_routes() -> Router {
    Router::new()
        .route("/api/auto-video/generate", post(generate_video))
        .route("/api/auto-video/status/:project_id", get(generation_status))
        .route(
            "/api/auto-video/preview/:project_id/:scene_number",
            get(scene_preview),
        )
        .layer(axum::middleware::from_fn(auth_middleware))
}

#[derive(Debug, Deserialize)]
pub struct GenerateVideoRequest {
    pub script_text: String,
    pub title: Option<String>,
    pub description: Option<String>,
    pub style: Option<String>,
    pub target_length_minutes: Option<i32>,
}

/// Kick off the full script-to-video workflow. Creates a `processing`
/// project, responds 202 immediately, and runs the pipeline in the
/// background.
async fn generate_video(
    Extension(state): Extension<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<GenerateVideoRequest>,
) -> Result<(StatusCode, Json<serde_json::Value>), ApiError> {
    let user_id = claims_user_id(&claims)?;

    if payload.script_text.len() < MIN_SCRIPT_LENGTH {
        return Err(bad_request(format!(
            "Script text must be at least {} characters",
            MIN_SCRIPT_LENGTH
        )));
    }

    let style = payload.style.unwrap_or_else(|| DEFAULT_STYLE.to_string());
    if !is_allowed_style(&style) {
        return Err(bad_request("Unsupported animation style"));
    }

    let target_length_minutes = payload
        .target_length_minutes
        .unwrap_or(DEFAULT_TARGET_MINUTES);
    if !(1..=120).contains(&target_length_minutes) {
        return Err(bad_request("Target length must be between 1 and 120 minutes"));
    }

    let title = payload
        .title
        .filter(|t| !t.trim().is_empty())
        .unwrap_or_else(|| "Auto-Generated Video".to_string());

    let project = sqlx::query_as::<_, Project>(
        "INSERT INTO projects (user_id, title, description, prompt_text,
                               target_length_minutes, style, status)
         VALUES ($1, $2, $3, $4, $5, $6, $7)
         RETURNING *",
    )
    .bind(user_id)
    .bind(&title)
    .bind(&payload.description)
    .bind(&payload.script_text)
    .bind(target_length_minutes)
    .bind(&style)
    .bind(ProjectStatus::Processing.as_str())
    .fetch_one(&state.db_pool)
    .await
    .map_err(|e| {
        tracing::error!("Error creating auto-video project: {}", e);
        internal_error()
    })?;

    tracing::info!(project_id = %project.id, "Auto-video generation accepted");

    pipeline::spawn_video_generation(state.clone(), project.id);

    Ok((
        StatusCode::ACCEPTED,
        Json(json!({
            "project_id": project.id,
            "status": project.status,
            "message": "Video generation started",
            "workflow": [
                "script_analysis",
                "character_generation",
                "scene_generation",
                "scene_rendering",
                "final_assembly",
            ],
            "estimated_credits": pipeline::credit_cost(target_length_minutes),
            "estimated_time_minutes": estimated_generation_minutes(target_length_minutes),
        })),
    ))
}

async fn generation_status(
    Extension(state): Extension<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
    Path(project_id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let user_id = claims_user_id(&claims)?;
    let project = find_owned_project(&state, project_id, user_id).await?;

    let scenes: Vec<(i32, String)> = sqlx::query_as(
        "SELECT scene_number, status FROM scenes
         WHERE project_id = $1 ORDER BY scene_number ASC",
    )
    .bind(project_id)
    .fetch_all(&state.db_pool)
    .await
    .map_err(|e| {
        tracing::error!("Error loading scene statuses: {}", e);
        internal_error()
    })?;

    let character_count: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM characters WHERE project_id = $1")
            .bind(project_id)
            .fetch_one(&state.db_pool)
            .await
            .map_err(|e| {
                tracing::error!("Error counting characters: {}", e);
                internal_error()
            })?;

    let total_scenes = scenes.len() as i64;
    let completed_scenes = scenes
        .iter()
        .filter(|(_, status)| status == SceneStatus::Completed.as_str())
        .count() as i64;

    let status = ProjectStatus::parse(&project.status).unwrap_or(ProjectStatus::Draft);
    let progress = compute_progress(status, total_scenes, completed_scenes);

    let scene_statuses: Vec<serde_json::Value> = scenes
        .iter()
        .map(|(number, status)| json!({ "scene_number": number, "status": status }))
        .collect();

    Ok(Json(json!({
        "project_id": project.id,
        "status": project.status,
        "progress": progress,
        "character_count": character_count,
        "total_scenes": total_scenes,
        "completed_scenes": completed_scenes,
        "scenes": scene_statuses,
        "final_video_url": project.final_video_url,
        "thumbnail_url": project.thumbnail_url,
    })))
}

async fn scene_preview(
    Extension(state): Extension<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
    Path((project_id, scene_number)): Path<(Uuid, i32)>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let user_id = claims_user_id(&claims)?;
    find_owned_project(&state, project_id, user_id).await?;

    let scene = sqlx::query_as::<_, Scene>(
        "SELECT * FROM scenes WHERE project_id = $1 AND scene_number = $2",
    )
    .bind(project_id)
    .bind(scene_number)
    .fetch_optional(&state.db_pool)
    .await
    .map_err(|e| {
        tracing::error!("Error loading scene preview: {}", e);
        internal_error()
    })?
    .ok_or_else(|| not_found("Scene not found"))?;

    Ok(Json(json!({
        "scene_id": scene.id,
        "project_id": scene.project_id,
        "scene_number": scene.scene_number,
        "title": scene.title,
        "description": scene.description,
        "status": scene.status,
        "duration_seconds": scene.duration_seconds(),
        "storyboard_url": scene.storyboard_url,
        "dialogue": pipeline::parse_dialogue(scene.dialogue_text.as_deref()),
        "metadata": scene.metadata,
    })))
}

/// Rough wall-clock estimate shown to the caller: analysis plus roughly a
/// minute of rendering per two minutes of output.
fn estimated_generation_minutes(target_length_minutes: i32) -> i32 {
    2 + target_length_minutes / 2
}

/// Progress percentage for a generation run: analysis and setup account for
/// the first 20%, per-scene rendering for the next 60%, final assembly for
/// the rest.
fn compute_progress(status: ProjectStatus, total_scenes: i64, completed_scenes: i64) -> u8 {
    match status {
        ProjectStatus::Draft | ProjectStatus::Failed => 0,
        ProjectStatus::Completed => 100,
        ProjectStatus::Processing => {
            if total_scenes == 0 {
                20
            } else {
                let rendered = (completed_scenes as f64 / total_scenes as f64) * 60.0;
                (20.0 + rendered).round() as u8
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn draft_projects_report_zero_progress() {
        assert_eq!(compute_progress(ProjectStatus::Draft, 0, 0), 0);
        assert_eq!(compute_progress(ProjectStatus::Draft, 5, 5), 0);
    }

    #[test]
    fn processing_starts_at_twenty_percent() {
        assert_eq!(compute_progress(ProjectStatus::Processing, 0, 0), 20);
        assert_eq!(compute_progress(ProjectStatus::Processing, 10, 0), 20);
    }

    #[test]
    fn progress_scales_with_completed_scenes() {
        assert_eq!(compute_progress(ProjectStatus::Processing, 10, 5), 50);
        assert_eq!(compute_progress(ProjectStatus::Processing, 10, 10), 80);
        assert_eq!(compute_progress(ProjectStatus::Processing, 3, 1), 40);
    }

    #[test]
    fn completed_projects_are_always_one_hundred() {
        assert_eq!(compute_progress(ProjectStatus::Completed, 0, 0), 100);
        assert_eq!(compute_progress(ProjectStatus::Completed, 10, 3), 100);
    }

    #[test]
    fn failed_projects_report_zero_progress() {
        assert_eq!(compute_progress(ProjectStatus::Failed, 0, 0), 0);
        assert_eq!(compute_progress(ProjectStatus::Failed, 10, 5), 0);
        assert_eq!(compute_progress(ProjectStatus::Failed, 10, 10), 0);
    }

    #[test]
    fn time_estimate_grows_with_target_length() {
        assert_eq!(estimated_generation_minutes(1), 2);
        assert_eq!(estimated_generation_minutes(40), 22);
        assert_eq!(estimated_generation_minutes(120), 62);
    }
}
