//! Notifications, activity log, dashboard counters and liveness.

use axum::Json;
use axum::extract::State;
use partbid_core::Stats;
use partbid_core::models::{ActivityLog, Id, Notification};
use serde::Deserialize;
use serde_json::{Value, json};

use super::AppState;
use super::error::ApiError;
use super::extract::{ApiPath, ApiQuery, CurrentUser};

#[derive(Debug, Default, Deserialize)]
pub struct ActivityQuery {
    pub limit: Option<usize>,
}

/// `GET /health`
pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// `GET /api/notifications`: the caller's own, newest first.
pub async fn list_notifications(
    State(state): State<AppState>,
    caller: CurrentUser,
) -> Result<Json<Vec<Notification>>, ApiError> {
    Ok(Json(state.market.list_notifications(&caller.viewer).await?))
}

/// `PATCH /api/notifications/{id}`: mark read.
pub async fn mark_notification_read(
    State(state): State<AppState>,
    caller: CurrentUser,
    ApiPath(notification_id): ApiPath<Id>,
) -> Result<Json<Notification>, ApiError> {
    Ok(Json(
        state
            .market
            .mark_notification_read(&caller.viewer, notification_id)
            .await?,
    ))
}

/// `GET /api/activity?limit=`
pub async fn list_activity(
    State(state): State<AppState>,
    caller: CurrentUser,
    ApiQuery(query): ApiQuery<ActivityQuery>,
) -> Result<Json<Vec<ActivityLog>>, ApiError> {
    Ok(Json(
        state
            .market
            .list_activity_logs(&caller.viewer, query.limit)
            .await?,
    ))
}

/// `GET /api/stats`
pub async fn stats(
    State(state): State<AppState>,
    caller: CurrentUser,
) -> Result<Json<Stats>, ApiError> {
    Ok(Json(state.market.compute_stats(&caller.viewer).await?))
}
