use crate::handlers::{claims_user_id, internal_error, not_found, ApiError};
use crate::middleware::auth::auth_middleware;
use crate::models::auth::Claims;
use crate::models::notification::{ListNotificationsQuery, Notification};
use crate::AppState;
use axum::{
    extract::{Extension, Path, Query},
    response::Json,
    routing::{get, put, Router},
};
use serde_json::json;
use std::sync::Arc;
use uuid::Uuid;

const DEFAULT_PAGE_SIZE: i64 = 20;
const MAX_PAGE_SIZE: i64 = 100;

pub fn notification_routes() -> Router {
    Router::new()
        .route("/api/notifications", get(list_notifications))
        .route("/api/notifications/:id/read", put(mark_read))
        .layer(axum::middleware::from_fn(auth_middleware))
}

async fn list_notifications(
    Extension(state): Extension<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
    Query(query): Query<ListNotificationsQuery>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let user_id = claims_user_id(&claims)?;

    let limit = query
        .limit
        .unwrap_or(DEFAULT_PAGE_SIZE)
        .clamp(1, MAX_PAGE_SIZE);
    let offset = query.offset.unwrap_or(0).max(0);
    let unread_only = query.unread_only.unwrap_or(false);

    let notifications = sqlx::query_as::<_, Notification>(
        "SELECT * FROM notifications
         WHERE user_id = $1 AND ($2 = FALSE OR is_read = FALSE)
         ORDER BY created_at DESC
         LIMIT $3 OFFSET $4",
    )
    .bind(user_id)
    .bind(unread_only)
    .bind(limit)
    .bind(offset)
    .fetch_all(&state.db_pool)
    .await
    .map_err(|e| {
        tracing::error!("Error listing notifications: {}", e);
        internal_error()
    })?;

    let unread_count: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM notifications WHERE user_id = $1 AND is_read = FALSE",
    )
    .bind(user_id)
    .fetch_one(&state.db_pool)
    .await
    .map_err(|e| {
        tracing::error!("Error counting unread notifications: {}", e);
        internal_error()
    })?;

    Ok(Json(json!({
        "notifications": notifications,
        "unread_count": unread_count,
        "limit": limit,
        "offset": offset,
    })))
}

async fn mark_read(
    Extension(state): Extension<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<Json<Notification>, ApiError> {
    let user_id = claims_user_id(&claims)?;

    let notification = sqlx::query_as::<_, Notification>(
        "UPDATE notifications SET is_read = TRUE
         WHERE id = $1 AND user_id = $2
         RETURNING *",
    )
    .bind(id)
    .bind(user_id)
    .fetch_optional(&state.db_pool)
    .await
    .map_err(|e| {
        tracing::error!("Error marking notification read: {}", e);
        internal_error()
    })?
    .ok_or_else(|| not_found("Notification not found"))?;

    Ok(Json(notification))
}
