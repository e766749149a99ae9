use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SceneStatus {
    Pending,
    Rendering,
    Completed,
    Failed,
}

impl SceneStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SceneStatus::Pending => "pending",
            SceneStatus::Rendering => "rendering",
            SceneStatus::Completed => "completed",
            SceneStatus::Failed => "failed",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "pending" => Some(SceneStatus::Pending),
            "rendering" => Some(SceneStatus::Rendering),
            "completed" => Some(SceneStatus::Completed),
            "failed" => Some(SceneStatus::Failed),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Scene {
    pub id: Uuid,
    pub project_id: Uuid,
    pub scene_number: i32,
    pub title: String,
    pub description: Option<String>,
    pub start_time_seconds: i32,
    pub end_time_seconds: i32,
    pub status: String,
    pub storyboard_url: Option<String>,
    pub dialogue_text: Option<String>,
    pub metadata: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Scene {
    pub fn duration_seconds(&self) -> i32 {
        self.end_time_seconds - self.start_time_seconds
    }
}

#[derive(Debug, Deserialize)]
pub struct UpdateSceneRequest {
    pub title: Option<String>,
    pub start_time_seconds: Option<i32>,
    pub end_time_seconds: Option<i32>,
    pub status: Option<String>,
    pub dialogue_text: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scene_status_round_trips() {
        for status in [
            SceneStatus::Pending,
            SceneStatus::Rendering,
            SceneStatus::Completed,
            SceneStatus::Failed,
        ] {
            assert_eq!(SceneStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(SceneStatus::parse("queued"), None);
    }
}
