use crate::handlers::{claims_user_id, internal_error, not_found, ApiError};
use crate::middleware::auth::auth_middleware;
use crate::models::auth::Claims;
use crate::models::billing::CreditsResponse;
use crate::AppState;
use axum::{
    extract::Extension,
    response::Json,
    routing::{get, Router},
};
use chrono::{Datelike, TimeZone, Utc};
use std::sync::Arc;

pub fn billing_routes() -> Router {
    Router::new()
        .route("/api/billing/credits", get(get_credits))
        .layer(axum::middleware::from_fn(auth_middleware))
}

async fn get_credits(
    Extension(state): Extension<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<CreditsResponse>, ApiError> {
    let user_id = claims_user_id(&claims)?;

    let credits_balance: Option<i32> =
        sqlx::query_scalar("SELECT credits_balance FROM users WHERE id = $1")
            .bind(user_id)
            .fetch_optional(&state.db_pool)
            .await
            .map_err(|e| {
                tracing::error!("Database error loading credits: {}", e);
                internal_error()
            })?;

    let credits_balance = credits_balance.ok_or_else(|| not_found("User not found"))?;

    let now = Utc::now();
    let month_start = Utc
        .with_ymd_and_hms(now.year(), now.month(), 1, 0, 0, 0)
        .single()
        .unwrap_or(now);

    let projects_this_month: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM projects WHERE user_id = $1 AND created_at >= $2",
    )
    .bind(user_id)
    .bind(month_start)
    .fetch_one(&state.db_pool)
    .await
    .map_err(|e| {
        tracing::error!("Error counting monthly projects: {}", e);
        internal_error()
    })?;

    let credits_used_this_month: i64 = sqlx::query_scalar(
        "SELECT COALESCE(SUM(credits_used), 0)
         FROM billing_records WHERE user_id = $1 AND created_at >= $2",
    )
    .bind(user_id)
    .bind(month_start)
    .fetch_one(&state.db_pool)
    .await
    .map_err(|e| {
        tracing::error!("Error summing monthly credits: {}", e);
        internal_error()
    })?;

    Ok(Json(CreditsResponse {
        user_id,
        credits_balance,
        projects_this_month,
        credits_used_this_month,
    }))
}
