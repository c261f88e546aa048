//! Notification feed service
//!
//! Alerts are derived from current stock on every request; nothing is stored.
//! The read set belongs to the client and is passed in with each request.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use shared::{classify, unread_count, NotificationFeed, NotificationRecord};
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::AppResult;
use crate::services::StockService;

/// Notification service for the derived stock alert feed
#[derive(Clone)]
pub struct NotificationService {
    db: PgPool,
    refresh_interval_secs: u64,
}

impl NotificationService {
    /// Create a new NotificationService instance
    pub fn new(db: PgPool, refresh_interval_secs: u64) -> Self {
        Self {
            db,
            refresh_interval_secs,
        }
    }

    /// Build the feed for an establishment at `now`
    pub async fn feed(
        &self,
        establishment_id: Uuid,
        read_ids: &HashSet<String>,
        now: DateTime<Utc>,
    ) -> AppResult<NotificationFeed> {
        let lots = StockService::new(self.db.clone())
            .snapshots(establishment_id)
            .await?;

        let notifications = classify(&lots, read_ids, now);

        tracing::debug!(
            establishment_id = %establishment_id,
            lots = lots.len(),
            notifications = notifications.len(),
            "Notification feed computed"
        );

        Ok(build_feed(notifications, self.refresh_interval_secs))
    }
}

/// Wrap classified records with the counters clients display
pub fn build_feed(notifications: Vec<NotificationRecord>, refresh_after_secs: u64) -> NotificationFeed {
    NotificationFeed {
        unread_count: unread_count(&notifications),
        notifications,
        refresh_after_secs,
    }
}
