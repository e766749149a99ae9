use crate::handlers::{
    bad_request, claims_user_id, find_owned_project, internal_error, not_found, ApiError,
};
use crate::middleware::auth::auth_middleware;
use crate::models::auth::Claims;
use crate::models::render::{
    CreateRenderJobRequest, RenderJob, RenderJobResponse, RenderJobStatus, ALLOWED_OUTPUT_FORMATS,
    ALLOWED_RESOLUTIONS, JOB_TYPE_FINAL_VIDEO, JOB_TYPE_SCENE_RENDER,
};
use crate::AppState;
use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::Json,
    routing::{get, post, Router},
};
use serde_json::json;
use std::sync::Arc;
use uuid::Uuid;

pub fn render_routes() -> Router {
    Router::new()
        .route("/api/projects/:id/render", post(create_render_job))
        .route("/api/render_jobs/:job_id/status", get(render_job_status))
        .layer(axum::middleware::from_fn(auth_middleware))
}

struct JobSpec {
    job_type: &'static str,
    resolution: String,
    output_format: String,
    notify_on_complete: bool,
    scene_id: Option<Uuid>,
}

fn validate_render_request(payload: &CreateRenderJobRequest) -> Result<JobSpec, ApiError> {
    let job_type = match payload.render_type.as_str() {
        "final_video" => JOB_TYPE_FINAL_VIDEO,
        "scene_render" => JOB_TYPE_SCENE_RENDER,
        _ => return Err(bad_request("render_type must be 'final_video' or 'scene_render'")),
    };

    let resolution = payload
        .resolution
        .clone()
        .unwrap_or_else(|| "1080p".to_string());
    if !ALLOWED_RESOLUTIONS.contains(&resolution.as_str()) {
        return Err(bad_request("Resolution must be one of 720p, 1080p, 4k"));
    }

    let output_format = payload
        .output_format
        .clone()
        .unwrap_or_else(|| "mp4".to_string());
    if !ALLOWED_OUTPUT_FORMATS.contains(&output_format.as_str()) {
        return Err(bad_request("Output format must be one of mp4, mov, webm"));
    }

    if job_type == JOB_TYPE_SCENE_RENDER && payload.scene_id.is_none() {
        return Err(bad_request("scene_id is required for scene renders"));
    }

    Ok(JobSpec {
        job_type,
        resolution,
        output_format,
        notify_on_complete: payload.notify_on_complete.unwrap_or(true),
        scene_id: payload.scene_id,
    })
}

async fn create_render_job(
    Extension(state): Extension<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
    Path(project_id): Path<Uuid>,
    Json(payload): Json<CreateRenderJobRequest>,
) -> Result<(StatusCode, Json<RenderJobResponse>), ApiError> {
    let user_id = claims_user_id(&claims)?;
    find_owned_project(&state, project_id, user_id).await?;

    let spec = validate_render_request(&payload)?;

    if let Some(scene_id) = spec.scene_id {
        let exists: Option<Uuid> =
            sqlx::query_scalar("SELECT id FROM scenes WHERE id = $1 AND project_id = $2")
                .bind(scene_id)
                .bind(project_id)
                .fetch_optional(&state.db_pool)
                .await
                .map_err(|e| {
                    tracing::error!("Database error checking scene: {}", e);
                    internal_error()
                })?;
        if exists.is_none() {
            return Err(not_found("Scene not found in this project"));
        }
    }

    let job_payload = json!({
        "resolution": spec.resolution,
        "output_format": spec.output_format,
        "notify_on_complete": spec.notify_on_complete,
        "scene_id": spec.scene_id,
    });

    let job = sqlx::query_as::<_, RenderJob>(
        "INSERT INTO render_jobs (project_id, job_type, payload, status)
         VALUES ($1, $2, $3, $4)
         RETURNING *",
    )
    .bind(project_id)
    .bind(spec.job_type)
    .bind(&job_payload)
    .bind(RenderJobStatus::Queued.as_str())
    .fetch_one(&state.db_pool)
    .await
    .map_err(|e| {
        tracing::error!("Error creating render job: {}", e);
        internal_error()
    })?;

    tracing::info!(job_id = %job.id, %project_id, job_type = spec.job_type, "Render job queued");

    state.job_runner.dispatch(state.clone(), job.id);

    Ok((StatusCode::ACCEPTED, Json(RenderJobResponse::from(job))))
}

async fn render_job_status(
    Extension(state): Extension<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
    Path(job_id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let user_id = claims_user_id(&claims)?;

    let job = sqlx::query_as::<_, RenderJob>(
        "SELECT r.* FROM render_jobs r
         JOIN projects p ON p.id = r.project_id
         WHERE r.id = $1 AND p.user_id = $2",
    )
    .bind(job_id)
    .bind(user_id)
    .fetch_optional(&state.db_pool)
    .await
    .map_err(|e| {
        tracing::error!("Database error loading render job: {}", e);
        internal_error()
    })?
    .ok_or_else(|| not_found("Render job not found"))?;

    let in_progress = state.job_runner.is_active(&job.id).await;

    let mut body = serde_json::to_value(RenderJobResponse::from(job)).map_err(|e| {
        tracing::error!("Error serializing render job: {}", e);
        internal_error()
    })?;
    body["in_progress"] = json!(in_progress);

    Ok(Json(body))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(render_type: &str) -> CreateRenderJobRequest {
        CreateRenderJobRequest {
            render_type: render_type.to_string(),
            resolution: None,
            output_format: None,
            notify_on_complete: None,
            scene_id: None,
        }
    }

    #[test]
    fn final_video_defaults_to_1080p_mp4() {
        let spec = validate_render_request(&request("final_video")).unwrap();
        assert_eq!(spec.job_type, JOB_TYPE_FINAL_VIDEO);
        assert_eq!(spec.resolution, "1080p");
        assert_eq!(spec.output_format, "mp4");
        assert!(spec.notify_on_complete);
    }

    #[test]
    fn scene_render_requires_a_scene_id() {
        assert!(validate_render_request(&request("scene_render")).is_err());

        let mut req = request("scene_render");
        req.scene_id = Some(Uuid::new_v4());
        let spec = validate_render_request(&req).unwrap();
        assert_eq!(spec.job_type, JOB_TYPE_SCENE_RENDER);
    }

    #[test]
    fn rejects_unknown_render_type_resolution_and_format() {
        assert!(validate_render_request(&request("thumbnail")).is_err());

        let mut req = request("final_video");
        req.resolution = Some("8k".to_string());
        assert!(validate_render_request(&req).is_err());

        let mut req = request("final_video");
        req.output_format = Some("avi".to_string());
        assert!(validate_render_request(&req).is_err());
    }
}
