//! Product catalogue models

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::types::Unit;
use crate::validation::validate_non_negative;

/// Storage category of a product
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ProductCategory {
    Frozen,
    Fresh,
    Dry,
    Beverage,
    Other,
}

impl ProductCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProductCategory::Frozen => "frozen",
            ProductCategory::Fresh => "fresh",
            ProductCategory::Dry => "dry",
            ProductCategory::Beverage => "beverage",
            ProductCategory::Other => "other",
        }
    }

    pub fn from_code(code: &str) -> Self {
        match code {
            "frozen" => ProductCategory::Frozen,
            "fresh" => ProductCategory::Fresh,
            "dry" => ProductCategory::Dry,
            "beverage" => ProductCategory::Beverage,
            _ => ProductCategory::Other,
        }
    }
}

/// A stock-tracked product
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    pub id: Uuid,
    pub name: String,
    pub category: ProductCategory,
    pub unit: Unit,
    /// Zero means the product is not tracked for stock alerts
    pub min_stock_threshold: Decimal,
    pub created_at: DateTime<Utc>,
}

/// Input for creating a product
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateProductInput {
    #[validate(length(min = 1, max = 120))]
    pub name: String,
    pub category: ProductCategory,
    pub unit: Unit,
    #[validate(custom = "validate_non_negative")]
    pub min_stock_threshold: Decimal,
}
