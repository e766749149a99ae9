// src/services/pipeline.rs
//! The video generation pipeline: script analysis -> character generation ->
//! scene creation -> per-scene rendering -> final assembly. Runs on a
//! background task; every status transition is persisted so the progress
//! endpoint can report on a live run.

use crate::error::PipelineError;
use crate::models::notification::NOTIFICATION_RENDER_COMPLETE;
use crate::models::project::{Project, ProjectStatus};
use crate::models::scene::{Scene, SceneStatus};
use crate::services::media;
use crate::services::script_analysis::{self, DialogueLine, ScriptAnalysis};
use crate::AppState;
use rust_decimal::Decimal;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

/// Fixed delay between per-scene renders to stay under provider rate limits.
const SCENE_RENDER_DELAY: Duration = Duration::from_secs(1);

/// USD charged per credit.
const CREDIT_PRICE_USD: Decimal = Decimal::from_parts(5, 0, 0, false, 2); // 0.05

/// Credits consumed by one full generation run.
pub fn credit_cost(target_length_minutes: i32) -> i32 {
    target_length_minutes * 2
}

/// Spawn the generation pipeline in the background. Failures mark the
/// project `failed`; the caller has already responded 202.
pub fn spawn_video_generation(state: Arc<AppState>, project_id: Uuid) {
    tokio::spawn(async move {
        tracing::info!(%project_id, "Background video generation started");
        if let Err(e) = run_video_generation(&state, project_id).await {
            tracing::error!(%project_id, "Video generation failed: {}", e);
            if let Err(db_err) = set_project_status(&state, project_id, ProjectStatus::Failed).await
            {
                tracing::error!(%project_id, "Failed to mark project failed: {}", db_err);
            }
        }
    });
}

/// Run the full pipeline for a project already in `processing`.
pub async fn run_video_generation(
    state: &AppState,
    project_id: Uuid,
) -> Result<(), PipelineError> {
    let project = fetch_project(state, project_id).await?;

    // Step 1: script analysis
    let analysis = script_analysis::analyze_script(
        state.openai_client.as_ref(),
        &project.prompt_text,
        project.target_length_minutes.max(1) as u32,
        &project.style,
    )
    .await;

    // Step 2: character generation
    create_characters(state, &project, &analysis).await?;

    // Step 3: scene creation
    let scenes = create_scenes(state, &project, &analysis).await?;
    tracing::info!(%project_id, scene_count = scenes.len(), "Scenes created");

    // Step 4: per-scene rendering. One scene failing does not abort the run.
    let mut scene_videos: Vec<String> = Vec::new();
    for scene in &scenes {
        let voice_type = primary_voice_type(scene, &analysis);
        match render_scene(state, scene, &project.style, &voice_type).await {
            Ok(video_url) => {
                tracing::info!(
                    %project_id,
                    scene_number = scene.scene_number,
                    "Scene {}/{} rendered",
                    scene.scene_number,
                    scenes.len()
                );
                scene_videos.push(video_url);
            }
            Err(e) => {
                tracing::error!(
                    %project_id,
                    scene_number = scene.scene_number,
                    "Failed to render scene: {}",
                    e
                );
            }
        }
        tokio::time::sleep(SCENE_RENDER_DELAY).await;
    }

    // Step 5: final assembly
    tracing::info!(%project_id, "Assembling final video");
    let total_duration: u32 = analysis.scenes.iter().map(|s| s.duration).sum();
    let final_video_url = media::assemble_full_video(&scene_videos, total_duration).await;

    finalize_project(state, &project, &final_video_url).await?;

    tracing::info!(%project_id, "Video generation complete");
    Ok(())
}

async fn fetch_project(state: &AppState, project_id: Uuid) -> Result<Project, PipelineError> {
    sqlx::query_as::<_, Project>("SELECT * FROM projects WHERE id = $1")
        .bind(project_id)
        .fetch_optional(&state.db_pool)
        .await?
        .ok_or(PipelineError::ProjectNotFound(project_id))
}

pub async fn set_project_status(
    state: &AppState,
    project_id: Uuid,
    status: ProjectStatus,
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE projects SET status = $1, updated_at = NOW() WHERE id = $2")
        .bind(status.as_str())
        .bind(project_id)
        .execute(&state.db_pool)
        .await?;
    Ok(())
}

async fn create_characters(
    state: &AppState,
    project: &Project,
    analysis: &ScriptAnalysis,
) -> Result<(), PipelineError> {
    for character in &analysis.characters {
        let image_url = media::generate_character_visual(
            state.stability_client.as_ref(),
            &character.name,
            &character.appearance,
            &project.style,
        )
        .await;

        let metadata = serde_json::json!({
            "personality": character.personality,
            "appearance": character.appearance,
            "voiceType": character.voice_type,
        });

        sqlx::query(
            "INSERT INTO characters (project_id, name, role, image_url, image_metadata)
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(project.id)
        .bind(&character.name)
        .bind(&character.role)
        .bind(&image_url)
        .bind(&metadata)
        .execute(&state.db_pool)
        .await?;
    }

    tracing::info!(
        project_id = %project.id,
        character_count = analysis.characters.len(),
        "Characters generated"
    );
    Ok(())
}

async fn create_scenes(
    state: &AppState,
    project: &Project,
    analysis: &ScriptAnalysis,
) -> Result<Vec<Scene>, PipelineError> {
    let mut offset_seconds: i32 = 0;

    for scene in &analysis.scenes {
        let start = offset_seconds;
        let end = offset_seconds + scene.duration as i32;
        offset_seconds = end;

        let dialogue_text = serde_json::to_string(&scene.dialogue).unwrap_or_default();
        let metadata = serde_json::json!({
            "visualElements": scene.visual_elements,
            "backgroundMusic": scene.background_music,
            "cameraAngles": scene.camera_angles,
        });

        sqlx::query(
            "INSERT INTO scenes (project_id, scene_number, title, description,
                                 start_time_seconds, end_time_seconds, status,
                                 dialogue_text, metadata)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
             ON CONFLICT (project_id, scene_number) DO NOTHING",
        )
        .bind(project.id)
        .bind(scene.scene_number as i32)
        .bind(&scene.title)
        .bind(&scene.description)
        .bind(start)
        .bind(end)
        .bind(SceneStatus::Pending.as_str())
        .bind(&dialogue_text)
        .bind(&metadata)
        .execute(&state.db_pool)
        .await?;
    }

    let scenes = sqlx::query_as::<_, Scene>(
        "SELECT * FROM scenes WHERE project_id = $1 ORDER BY scene_number ASC",
    )
    .bind(project.id)
    .fetch_all(&state.db_pool)
    .await?;

    Ok(scenes)
}

/// Render a single scene: background image, dialogue audio, animation.
/// Updates the scene row through `rendering` to `completed` or `failed`
/// and returns the scene video URL.
pub async fn render_scene(
    state: &AppState,
    scene: &Scene,
    style: &str,
    voice_type: &str,
) -> Result<String, PipelineError> {
    set_scene_status(state, scene.id, SceneStatus::Rendering).await?;

    let dialogue = parse_dialogue(scene.dialogue_text.as_deref());
    let visual_elements = scene
        .metadata
        .as_ref()
        .and_then(|m| m.get("visualElements"))
        .and_then(|v| v.as_array())
        .map(|items| {
            items
                .iter()
                .filter_map(|v| v.as_str().map(|s| s.to_string()))
                .collect::<Vec<_>>()
        })
        .unwrap_or_default();

    let background_url = media::generate_scene_background(
        state.stability_client.as_ref(),
        scene.description.as_deref().unwrap_or(&scene.title),
        style,
        &visual_elements,
    )
    .await;

    let audio_url = if dialogue.is_empty() {
        None
    } else {
        let full_dialogue = dialogue
            .iter()
            .map(|d| d.text.as_str())
            .collect::<Vec<_>>()
            .join(" ");
        Some(
            media::generate_voice_audio(
                state.elevenlabs_client.as_ref(),
                &full_dialogue,
                voice_type,
            )
            .await,
        )
    };

    let duration = scene.duration_seconds().max(1) as u32;
    let video_url = media::animate_scene(
        state.replicate_client.as_ref(),
        &background_url,
        duration,
    )
    .await;

    let result = sqlx::query(
        "UPDATE scenes
         SET status = $1,
             storyboard_url = $2,
             metadata = COALESCE(metadata, '{}'::jsonb) || $3,
             updated_at = NOW()
         WHERE id = $4",
    )
    .bind(SceneStatus::Completed.as_str())
    .bind(&background_url)
    .bind(serde_json::json!({
        "backgroundUrl": background_url,
        "audioUrl": audio_url,
        "videoUrl": video_url,
    }))
    .bind(scene.id)
    .execute(&state.db_pool)
    .await;

    if let Err(e) = result {
        set_scene_status(state, scene.id, SceneStatus::Failed).await.ok();
        return Err(e.into());
    }

    Ok(video_url)
}

async fn set_scene_status(
    state: &AppState,
    scene_id: Uuid,
    status: SceneStatus,
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE scenes SET status = $1, updated_at = NOW() WHERE id = $2")
        .bind(status.as_str())
        .bind(scene_id)
        .execute(&state.db_pool)
        .await?;
    Ok(())
}

/// Voice type for a scene's first speaker, looked up in the analysis.
fn primary_voice_type(scene: &Scene, analysis: &ScriptAnalysis) -> String {
    let dialogue = parse_dialogue(scene.dialogue_text.as_deref());
    dialogue
        .first()
        .and_then(|line| {
            analysis
                .characters
                .iter()
                .find(|c| c.name == line.character)
                .map(|c| c.voice_type.clone())
        })
        .unwrap_or_else(|| "default".to_string())
}

pub fn parse_dialogue(dialogue_text: Option<&str>) -> Vec<DialogueLine> {
    dialogue_text
        .and_then(|text| serde_json::from_str(text).ok())
        .unwrap_or_default()
}

/// Mark the project completed, write the notification, and charge credits.
async fn finalize_project(
    state: &AppState,
    project: &Project,
    final_video_url: &str,
) -> Result<(), PipelineError> {
    let thumbnail_url: Option<String> = sqlx::query_scalar(
        "SELECT storyboard_url FROM scenes
         WHERE project_id = $1 AND storyboard_url IS NOT NULL
         ORDER BY scene_number ASC LIMIT 1",
    )
    .bind(project.id)
    .fetch_optional(&state.db_pool)
    .await?;

    sqlx::query(
        "UPDATE projects
         SET status = $1, final_video_url = $2, thumbnail_url = $3,
             completed_at = NOW(), updated_at = NOW()
         WHERE id = $4",
    )
    .bind(ProjectStatus::Completed.as_str())
    .bind(final_video_url)
    .bind(&thumbnail_url)
    .bind(project.id)
    .execute(&state.db_pool)
    .await?;

    sqlx::query(
        "INSERT INTO notifications (user_id, type, payload) VALUES ($1, $2, $3)",
    )
    .bind(project.user_id)
    .bind(NOTIFICATION_RENDER_COMPLETE)
    .bind(serde_json::json!({
        "project_id": project.id,
        "project_title": project.title,
        "output_url": final_video_url,
    }))
    .execute(&state.db_pool)
    .await?;

    let credits = credit_cost(project.target_length_minutes);
    let amount = Decimal::from(credits) * CREDIT_PRICE_USD;

    sqlx::query(
        "INSERT INTO billing_records (user_id, project_id, credits_used, amount_charged, description)
         VALUES ($1, $2, $3, $4, $5)",
    )
    .bind(project.user_id)
    .bind(project.id)
    .bind(credits)
    .bind(amount)
    .bind(format!("Video generation: {}", project.title))
    .execute(&state.db_pool)
    .await?;

    sqlx::query(
        "UPDATE users SET credits_balance = credits_balance - $1, updated_at = NOW() WHERE id = $2",
    )
    .bind(credits)
    .bind(project.user_id)
    .execute(&state.db_pool)
    .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn credit_cost_scales_with_target_length() {
        assert_eq!(credit_cost(1), 2);
        assert_eq!(credit_cost(40), 80);
        assert_eq!(credit_cost(120), 240);
    }

    #[test]
    fn credit_price_is_five_cents() {
        assert_eq!(CREDIT_PRICE_USD, Decimal::from_str("0.05").unwrap());
        let amount = Decimal::from(credit_cost(40)) * CREDIT_PRICE_USD;
        assert_eq!(amount, Decimal::from_str("4.00").unwrap());
    }

    #[test]
    fn dialogue_parses_serialized_lines() {
        let text = r#"[{"character":"Ada","text":"Hello","emotion":"happy"}]"#;
        let lines = parse_dialogue(Some(text));
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].character, "Ada");
        assert_eq!(lines[0].emotion, "happy");
    }

    #[test]
    fn dialogue_tolerates_missing_or_invalid_text() {
        assert!(parse_dialogue(None).is_empty());
        assert!(parse_dialogue(Some("not json")).is_empty());
        assert!(parse_dialogue(Some("{}")).is_empty());
    }
}
