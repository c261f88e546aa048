//! Derived stock notification models
//!
//! Notification records are a projection of current stock state. They are
//! never stored; only the identifiers the user has acknowledged are persisted,
//! client-side.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Condition a notification reports
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    StockEmpty,
    StockLow,
    ExpiringSoon,
    Expired,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationKind::StockEmpty => "stock_empty",
            NotificationKind::StockLow => "stock_low",
            NotificationKind::ExpiringSoon => "expiring_soon",
            NotificationKind::Expired => "expired",
        }
    }

    /// Deterministic identifier for this condition on a given stock lot
    pub fn notification_id(&self, stock_lot_id: &str) -> String {
        format!("{}-{}", self.as_str(), stock_lot_id)
    }
}

impl std::fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Critical,
    Warning,
}

impl Severity {
    /// Sort rank, lower first
    pub fn rank(&self) -> u8 {
        match self {
            Severity::Critical => 0,
            Severity::Warning => 1,
        }
    }
}

/// An alert derived from one stock lot
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NotificationRecord {
    pub id: String,
    pub kind: NotificationKind,
    pub severity: Severity,
    pub title: String,
    pub message: String,
    pub unread: bool,
    pub product_id: Uuid,
    pub product_name: String,
    /// Store identifier of the lot, kept opaque
    pub stock_lot_id: String,
}

/// Notification feed returned to clients
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationFeed {
    pub notifications: Vec<NotificationRecord>,
    pub unread_count: usize,
    /// How long the client should wait before asking again
    pub refresh_after_secs: u64,
}
