use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

pub const JOB_TYPE_SCENE_RENDER: &str = "scene_render";
pub const JOB_TYPE_FINAL_VIDEO: &str = "final_video_render";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RenderJobStatus {
    Queued,
    Running,
    Success,
    Failed,
}

impl RenderJobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RenderJobStatus::Queued => "queued",
            RenderJobStatus::Running => "running",
            RenderJobStatus::Success => "success",
            RenderJobStatus::Failed => "failed",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct RenderJob {
    pub id: Uuid,
    pub project_id: Uuid,
    pub job_type: String,
    pub payload: Option<serde_json::Value>,
    pub status: String,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub output_url: Option<String>,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct CreateRenderJobRequest {
    pub render_type: String, // "final_video" | "scene_render"
    pub resolution: Option<String>,
    pub output_format: Option<String>,
    pub notify_on_complete: Option<bool>,
    pub scene_id: Option<Uuid>,
}

pub const ALLOWED_RESOLUTIONS: &[&str] = &["720p", "1080p", "4k"];
pub const ALLOWED_OUTPUT_FORMATS: &[&str] = &["mp4", "mov", "webm"];

#[derive(Debug, Serialize)]
pub struct RenderJobResponse {
    pub job_id: Uuid,
    pub project_id: Uuid,
    pub job_type: String,
    pub status: String,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub output_url: Option<String>,
    pub error_message: Option<String>,
}

impl From<RenderJob> for RenderJobResponse {
    fn from(job: RenderJob) -> Self {
        RenderJobResponse {
            job_id: job.id,
            project_id: job.project_id,
            job_type: job.job_type,
            status: job.status,
            started_at: job.started_at,
            completed_at: job.completed_at,
            output_url: job.output_url,
            error_message: job.error_message,
        }
    }
}
