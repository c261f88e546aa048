//! Stock lot models

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::types::Unit;
use crate::validation::validate_non_negative;

/// One tracked quantity-on-hand record for a product
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StockLot {
    pub id: Uuid,
    pub product_id: Uuid,
    pub quantity: Decimal,
    pub unit_price: Decimal,
    pub expiry_date: Option<NaiveDate>,
    /// When the lot was purchased; adjustments never move it
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl StockLot {
    /// Value of the lot at its purchase price, recomputed on every read
    pub fn total_value(&self) -> Decimal {
        self.quantity * self.unit_price
    }
}

/// Product fields carried alongside a stock lot in the notification feed
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProductRef {
    pub name: String,
    pub unit: Unit,
}

/// Stock lot as consumed by the notification classifier, already tenant-scoped
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StockLotSnapshot {
    /// Opaque store identifier; only used to key notifications
    pub id: String,
    pub product_id: Uuid,
    pub quantity: Decimal,
    pub min_threshold: Decimal,
    pub expiry_date: Option<NaiveDate>,
    pub product: ProductRef,
}

/// Dashboard band for a stock level.
///
/// `Watch` is the softer band between the threshold and 1.5x the threshold.
/// It is display-only and never produces a notification.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StockLevel {
    Out,
    Low,
    Watch,
    Ok,
    Untracked,
}

impl StockLevel {
    pub fn classify(quantity: Decimal, threshold: Decimal) -> Self {
        if threshold <= Decimal::ZERO {
            return StockLevel::Untracked;
        }
        if quantity <= Decimal::ZERO {
            StockLevel::Out
        } else if quantity <= threshold {
            StockLevel::Low
        } else if quantity <= threshold * Decimal::new(15, 1) {
            StockLevel::Watch
        } else {
            StockLevel::Ok
        }
    }
}

/// Input for recording a delivery or purchase as a new lot
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct RecordStockLotInput {
    pub product_id: Uuid,
    #[validate(custom = "validate_non_negative")]
    pub quantity: Decimal,
    #[validate(custom = "validate_non_negative")]
    pub unit_price: Decimal,
    pub expiry_date: Option<NaiveDate>,
}

/// Input for a manual adjustment or sale-driven decrement
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct AdjustStockInput {
    #[validate(custom = "validate_non_negative")]
    pub quantity: Decimal,
    #[validate(length(max = 500))]
    pub reason: Option<String>,
}

/// Stock line in the dashboard summary
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StockLevelLine {
    pub stock_lot_id: Uuid,
    pub product_id: Uuid,
    pub product_name: String,
    pub quantity: Decimal,
    pub min_threshold: Decimal,
    pub total_value: Decimal,
    pub level: StockLevel,
}

/// Stock summary for an establishment
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StockSummary {
    pub total_value: Decimal,
    pub lot_count: usize,
    pub lines: Vec<StockLevelLine>,
}
