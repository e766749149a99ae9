use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct VoiceStyle {
    pub id: Uuid,
    pub name: String,
    pub language: String,
    pub accent: String,
    pub description: Option<String>,
    pub sample_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
