//! HTTP handlers for the notification feed

use std::collections::HashSet;

use axum::{extract::State, Json};
use chrono::Utc;
use serde::Deserialize;
use shared::NotificationFeed;

use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::services::NotificationService;
use crate::AppState;

/// Request body for the notification feed
#[derive(Debug, Default, Deserialize)]
pub struct FeedRequest {
    /// Identifiers the client has already acknowledged
    #[serde(default)]
    pub read_ids: HashSet<String>,
}

/// Compute the notification feed from current stock
pub async fn get_notification_feed(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(request): Json<FeedRequest>,
) -> AppResult<Json<NotificationFeed>> {
    let service = NotificationService::new(
        state.db,
        state.config.notifications.refresh_interval_secs,
    );
    let feed = service
        .feed(current_user.0.establishment_id, &request.read_ids, Utc::now())
        .await?;
    Ok(Json(feed))
}
