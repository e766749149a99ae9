// src/jobs/render_job.rs
//! Render job executor: runs scene_render and final_video_render jobs with
//! a bounded exponential-backoff retry, keeping the render_jobs row in sync
//! through queued -> running -> success | failed.

use crate::error::PipelineError;
use crate::models::notification::{NOTIFICATION_RENDER_COMPLETE, NOTIFICATION_RENDER_FAILED};
use crate::models::project::{Project, ProjectStatus};
use crate::models::render::{RenderJob, RenderJobStatus, JOB_TYPE_FINAL_VIDEO, JOB_TYPE_SCENE_RENDER};
use crate::models::scene::{Scene, SceneStatus};
use crate::services::{media, pipeline};
use crate::AppState;
use std::time::Duration;
use uuid::Uuid;

const MAX_ATTEMPTS: u32 = 3;
const INITIAL_RETRY_DELAY: Duration = Duration::from_secs(2);

/// Execute one render job to completion, with retries for transient
/// provider failures. Returns the output URL on success.
pub async fn execute_render_job(
    state: &AppState,
    job_id: Uuid,
) -> Result<String, PipelineError> {
    let job = sqlx::query_as::<_, RenderJob>("SELECT * FROM render_jobs WHERE id = $1")
        .bind(job_id)
        .fetch_optional(&state.db_pool)
        .await?
        .ok_or(PipelineError::JobNotFound(job_id))?;

    sqlx::query(
        "UPDATE render_jobs SET status = $1, started_at = NOW() WHERE id = $2",
    )
    .bind(RenderJobStatus::Running.as_str())
    .bind(job_id)
    .execute(&state.db_pool)
    .await?;

    let mut attempt: u32 = 0;
    let mut delay = INITIAL_RETRY_DELAY;
    let result = loop {
        match run_job(state, &job).await {
            Ok(output_url) => break Ok(output_url),
            Err(e) if attempt + 1 < MAX_ATTEMPTS && is_retryable(&e) => {
                attempt += 1;
                tracing::warn!(
                    %job_id,
                    attempt,
                    "Render job attempt failed (retrying in {:?}): {}",
                    delay,
                    e
                );
                tokio::time::sleep(delay).await;
                delay *= 2;
            }
            Err(e) => break Err(e),
        }
    };

    match result {
        Ok(output_url) => {
            sqlx::query(
                "UPDATE render_jobs
                 SET status = $1, completed_at = NOW(), output_url = $2
                 WHERE id = $3",
            )
            .bind(RenderJobStatus::Success.as_str())
            .bind(&output_url)
            .bind(job_id)
            .execute(&state.db_pool)
            .await?;

            notify(state, &job, NOTIFICATION_RENDER_COMPLETE, Some(&output_url)).await;
            Ok(output_url)
        }
        Err(e) => {
            sqlx::query(
                "UPDATE render_jobs
                 SET status = $1, completed_at = NOW(), error_message = $2
                 WHERE id = $3",
            )
            .bind(RenderJobStatus::Failed.as_str())
            .bind(e.to_string())
            .bind(job_id)
            .execute(&state.db_pool)
            .await?;

            notify(state, &job, NOTIFICATION_RENDER_FAILED, None).await;
            Err(e)
        }
    }
}

async fn run_job(state: &AppState, job: &RenderJob) -> Result<String, PipelineError> {
    match job.job_type.as_str() {
        JOB_TYPE_SCENE_RENDER => run_scene_render(state, job).await,
        JOB_TYPE_FINAL_VIDEO => run_final_video_render(state, job).await,
        other => Err(PipelineError::UnknownJobType(other.to_string())),
    }
}

async fn run_scene_render(state: &AppState, job: &RenderJob) -> Result<String, PipelineError> {
    let scene_id = job
        .payload
        .as_ref()
        .and_then(|p| p.get("scene_id"))
        .and_then(|v| v.as_str())
        .and_then(|s| Uuid::parse_str(s).ok())
        .ok_or_else(|| PipelineError::UnknownJobType("scene_render without scene_id".to_string()))?;

    let scene = sqlx::query_as::<_, Scene>("SELECT * FROM scenes WHERE id = $1")
        .bind(scene_id)
        .fetch_optional(&state.db_pool)
        .await?
        .ok_or(PipelineError::SceneNotFound(scene_id))?;

    let project = sqlx::query_as::<_, Project>("SELECT * FROM projects WHERE id = $1")
        .bind(scene.project_id)
        .fetch_optional(&state.db_pool)
        .await?
        .ok_or(PipelineError::ProjectNotFound(scene.project_id))?;

    let voice_type = scene_voice_type(state, &scene).await?;

    pipeline::render_scene(state, &scene, &project.style, &voice_type).await
}

/// Voice type for the scene's first speaker, read back from the character's
/// stored metadata. Falls back to the default voice for narrator-less scenes
/// or unknown speakers.
async fn scene_voice_type(state: &AppState, scene: &Scene) -> Result<String, PipelineError> {
    let dialogue = pipeline::parse_dialogue(scene.dialogue_text.as_deref());
    let Some(line) = dialogue.first() else {
        return Ok("default".to_string());
    };

    let metadata: Option<Option<serde_json::Value>> = sqlx::query_scalar(
        "SELECT image_metadata FROM characters WHERE project_id = $1 AND name = $2",
    )
    .bind(scene.project_id)
    .bind(&line.character)
    .fetch_optional(&state.db_pool)
    .await?;

    Ok(voice_type_from_metadata(metadata.flatten().as_ref())
        .unwrap_or_else(|| "default".to_string()))
}

fn voice_type_from_metadata(metadata: Option<&serde_json::Value>) -> Option<String> {
    metadata?
        .get("voiceType")?
        .as_str()
        .map(|s| s.to_string())
}

/// Stitch all completed scenes into the final cut. Requires every scene of
/// the project to have rendered first.
async fn run_final_video_render(
    state: &AppState,
    job: &RenderJob,
) -> Result<String, PipelineError> {
    let project = sqlx::query_as::<_, Project>("SELECT * FROM projects WHERE id = $1")
        .bind(job.project_id)
        .fetch_optional(&state.db_pool)
        .await?
        .ok_or(PipelineError::ProjectNotFound(job.project_id))?;

    let scenes = sqlx::query_as::<_, Scene>(
        "SELECT * FROM scenes WHERE project_id = $1 ORDER BY scene_number ASC",
    )
    .bind(project.id)
    .fetch_all(&state.db_pool)
    .await?;

    let rendered: Vec<&Scene> = scenes
        .iter()
        .filter(|s| s.status == SceneStatus::Completed.as_str())
        .collect();

    if rendered.len() != scenes.len() {
        return Err(PipelineError::ScenesIncomplete {
            rendered: rendered.len(),
            total: scenes.len(),
        });
    }

    let scene_urls: Vec<String> = rendered
        .iter()
        .filter_map(|s| scene_video_url(s))
        .collect();

    let total_duration: u32 = scenes
        .iter()
        .map(|s| s.duration_seconds().max(0) as u32)
        .sum();

    let output_url = media::assemble_full_video(&scene_urls, total_duration).await;

    let thumbnail_url: Option<String> =
        rendered.first().and_then(|s| s.storyboard_url.clone());

    sqlx::query(
        "UPDATE projects
         SET status = $1, final_video_url = $2, thumbnail_url = $3,
             completed_at = NOW(), updated_at = NOW()
         WHERE id = $4",
    )
    .bind(ProjectStatus::Completed.as_str())
    .bind(&output_url)
    .bind(&thumbnail_url)
    .bind(project.id)
    .execute(&state.db_pool)
    .await?;

    Ok(output_url)
}

fn scene_video_url(scene: &Scene) -> Option<String> {
    scene
        .metadata
        .as_ref()
        .and_then(|m| m.get("videoUrl"))
        .and_then(|v| v.as_str())
        .map(|s| s.to_string())
}

fn is_retryable(err: &PipelineError) -> bool {
    match err {
        PipelineError::Provider(p) => p.is_transient(),
        PipelineError::Database(_) => true,
        _ => false,
    }
}

/// Insert a notification for the project owner, unless the job opted out.
async fn notify(state: &AppState, job: &RenderJob, kind: &str, output_url: Option<&str>) {
    let notify_requested = job
        .payload
        .as_ref()
        .and_then(|p| p.get("notify_on_complete"))
        .and_then(|v| v.as_bool())
        .unwrap_or(true);

    if !notify_requested {
        return;
    }

    let user_id: Option<Uuid> =
        sqlx::query_scalar("SELECT user_id FROM projects WHERE id = $1")
            .bind(job.project_id)
            .fetch_optional(&state.db_pool)
            .await
            .ok()
            .flatten();

    let Some(user_id) = user_id else {
        return;
    };

    let payload = serde_json::json!({
        "job_id": job.id,
        "project_id": job.project_id,
        "job_type": job.job_type,
        "output_url": output_url,
    });

    if let Err(e) = sqlx::query(
        "INSERT INTO notifications (user_id, type, payload) VALUES ($1, $2, $3)",
    )
    .bind(user_id)
    .bind(kind)
    .bind(&payload)
    .execute(&state.db_pool)
    .await
    {
        tracing::warn!(job_id = %job.id, "Failed to write notification: {}", e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ProviderError;

    #[test]
    fn transient_provider_errors_are_retried() {
        let err = PipelineError::Provider(ProviderError::Api {
            provider: "openai",
            status: 503,
            body: String::new(),
        });
        assert!(is_retryable(&err));
    }

    #[test]
    fn permanent_failures_are_not_retried() {
        let err = PipelineError::Provider(ProviderError::GenerationFailed {
            provider: "replicate",
            message: "bad input".to_string(),
        });
        assert!(!is_retryable(&err));

        let err = PipelineError::UnknownJobType("thumbnail_render".to_string());
        assert!(!is_retryable(&err));

        let err = PipelineError::ScenesIncomplete {
            rendered: 2,
            total: 5,
        };
        assert!(!is_retryable(&err));
    }

    #[test]
    fn voice_type_read_from_character_metadata() {
        let metadata = serde_json::json!({
            "personality": "bold",
            "appearance": "tall",
            "voiceType": "energetic",
        });
        assert_eq!(
            voice_type_from_metadata(Some(&metadata)).as_deref(),
            Some("energetic")
        );
    }

    #[test]
    fn voice_type_defaults_when_metadata_is_missing_or_incomplete() {
        assert_eq!(voice_type_from_metadata(None), None);
        assert_eq!(
            voice_type_from_metadata(Some(&serde_json::json!({"appearance": "tall"}))),
            None
        );
        assert_eq!(
            voice_type_from_metadata(Some(&serde_json::json!({"voiceType": 3}))),
            None
        );
    }

    #[test]
    fn retry_delay_doubles_per_attempt() {
        let mut delay = INITIAL_RETRY_DELAY;
        let mut total = Duration::ZERO;
        for _ in 0..(MAX_ATTEMPTS - 1) {
            total += delay;
            delay *= 2;
        }
        // 2s + 4s of waiting across the two retries allowed by MAX_ATTEMPTS.
        assert_eq!(total, Duration::from_secs(6));
    }
}
