use crate::handlers::{internal_error, ApiError};
use crate::models::voice::VoiceStyle;
use crate::AppState;
use axum::{
    extract::Extension,
    response::Json,
    routing::{get, Router},
};
use serde_json::json;
use std::sync::Arc;

/// Voice styles are reference data, readable without authentication.
pub fn voice_routes() -> Router {
    Router::new().route("/api/voice_styles", get(list_voice_styles))
}

async fn list_voice_styles(
    Extension(state): Extension<Arc<AppState>>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let voice_styles = sqlx::query_as::<_, VoiceStyle>(
        "SELECT * FROM voice_styles ORDER BY name ASC",
    )
    .fetch_all(&state.db_pool)
    .await
    .map_err(|e| {
        tracing::error!("Error listing voice styles: {}", e);
        internal_error()
    })?;

    Ok(Json(json!({ "voice_styles": voice_styles })))
}
