use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Status field state machine: draft -> processing -> completed | failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProjectStatus {
    Draft,
    Processing,
    Completed,
    Failed,
}

impl ProjectStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProjectStatus::Draft => "draft",
            ProjectStatus::Processing => "processing",
            ProjectStatus::Completed => "completed",
            ProjectStatus::Failed => "failed",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "draft" => Some(ProjectStatus::Draft),
            "processing" => Some(ProjectStatus::Processing),
            "completed" => Some(ProjectStatus::Completed),
            "failed" => Some(ProjectStatus::Failed),
            _ => None,
        }
    }
}

pub const ALLOWED_STYLES: &[&str] = &["2D_flat", "3D", "anime", "cartoon", "realistic"];

pub fn is_allowed_style(style: &str) -> bool {
    ALLOWED_STYLES.contains(&style)
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Project {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub prompt_text: String,
    pub target_length_minutes: i32,
    pub style: String,
    pub status: String,
    pub thumbnail_url: Option<String>,
    pub final_video_url: Option<String>,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct CreateProjectRequest {
    pub title: String,
    pub description: Option<String>,
    pub prompt_text: String,
    pub target_length_minutes: i32,
    pub style: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateProjectRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub prompt_text: Option<String>,
    pub target_length_minutes: Option<i32>,
    pub style: Option<String>,
    pub status: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_round_trips_through_strings() {
        for status in [
            ProjectStatus::Draft,
            ProjectStatus::Processing,
            ProjectStatus::Completed,
            ProjectStatus::Failed,
        ] {
            assert_eq!(ProjectStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(ProjectStatus::parse("rendering"), None);
    }

    #[test]
    fn style_whitelist() {
        assert!(is_allowed_style("2D_flat"));
        assert!(is_allowed_style("anime"));
        assert!(!is_allowed_style("claymation"));
    }
}
