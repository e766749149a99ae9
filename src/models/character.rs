use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Character {
    pub id: Uuid,
    pub project_id: Uuid,
    pub name: String,
    pub role: String,
    pub image_url: Option<String>,
    pub image_metadata: Option<serde_json::Value>,
    pub voice_style_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One entry of the batch character-creation request.
#[derive(Debug, Deserialize)]
pub struct CharacterAction {
    pub name: String,
    pub role: String,
    pub image_choice: String, // "generated" | "upload"
    pub metadata: Option<serde_json::Value>,
    pub voice_style_id: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct CreateCharactersRequest {
    pub actions: Vec<CharacterAction>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateCharacterRequest {
    pub name: Option<String>,
    pub role: Option<String>,
    pub image_url: Option<String>,
    pub image_metadata: Option<serde_json::Value>,
    pub voice_style_id: Option<Uuid>,
}

#[derive(Debug, Serialize)]
pub struct CharacterResponse {
    pub character_id: Uuid,
    pub project_id: Uuid,
    pub name: String,
    pub role: String,
    pub image_url: Option<String>,
    pub image_metadata: Option<serde_json::Value>,
    pub voice_style_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Character> for CharacterResponse {
    fn from(c: Character) -> Self {
        CharacterResponse {
            character_id: c.id,
            project_id: c.project_id,
            name: c.name,
            role: c.role,
            image_url: c.image_url,
            image_metadata: c.image_metadata,
            voice_style_id: c.voice_style_id,
            created_at: c.created_at,
            updated_at: c.updated_at,
        }
    }
}
