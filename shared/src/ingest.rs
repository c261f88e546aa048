//! Narrowing of loosely typed rows into validated domain types
//!
//! Rows coming from the hosted store's client are plain JSON whose shape is
//! only loosely guaranteed: numbers may arrive as strings, dates may be
//! missing or malformed. Everything is checked here once, so the costing and
//! classification routines only ever see fully typed data.

use std::str::FromStr;

use chrono::{DateTime, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use uuid::Uuid;

use crate::models::{MenuItemIngredient, ProductRef, StockLotSnapshot};
use crate::types::Unit;

/// Why a row could not be narrowed
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum IngestError {
    #[error("row is not an object: {0}")]
    Malformed(String),

    #[error("missing field `{0}`")]
    MissingField(&'static str),

    #[error("field `{field}` is not a valid id: {value}")]
    InvalidId { field: &'static str, value: String },

    #[error("field `{field}` is not a number: {value}")]
    InvalidNumber { field: &'static str, value: String },

    #[error("field `{field}` must be greater than zero")]
    NotPositive { field: &'static str },

    #[error("unknown unit `{0}`")]
    UnknownUnit(String),
}

/// Product columns joined onto a stock lot row
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawProductRef {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub unit: Option<String>,
}

/// Stock lot row as delivered by the store client
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawStockLotRow {
    #[serde(default)]
    pub id: Option<Value>,
    #[serde(default, alias = "product_id")]
    pub product_id: Option<Value>,
    #[serde(default)]
    pub quantity: Option<Value>,
    #[serde(default, alias = "min_threshold", alias = "minStockThreshold")]
    pub min_threshold: Option<Value>,
    #[serde(default, alias = "expiry_date")]
    pub expiry_date: Option<Value>,
    #[serde(default)]
    pub product: Option<RawProductRef>,
}

/// Recipe row as delivered by the store client
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawIngredientRow {
    #[serde(default)]
    pub id: Option<Value>,
    #[serde(default, alias = "menu_item_id")]
    pub menu_item_id: Option<Value>,
    #[serde(default, alias = "product_id")]
    pub product_id: Option<Value>,
    #[serde(default)]
    pub quantity: Option<Value>,
    #[serde(default)]
    pub unit: Option<String>,
}

impl TryFrom<RawStockLotRow> for StockLotSnapshot {
    type Error = IngestError;

    fn try_from(row: RawStockLotRow) -> Result<Self, Self::Error> {
        let id = required_key(row.id.as_ref(), "id")?;
        let product_id = required_id(row.product_id.as_ref(), "productId")?;
        let quantity = required_decimal(row.quantity.as_ref(), "quantity")?;
        // Untracked when absent
        let min_threshold = optional_decimal(row.min_threshold.as_ref(), "minThreshold")?
            .unwrap_or(Decimal::ZERO);
        let expiry_date = row.expiry_date.as_ref().and_then(parse_date);

        let product = row.product.unwrap_or_default();
        let unit = product
            .unit
            .as_deref()
            .and_then(Unit::from_code)
            .unwrap_or(Unit::Piece);

        Ok(StockLotSnapshot {
            id,
            product_id,
            quantity,
            min_threshold,
            expiry_date,
            product: ProductRef {
                name: product
                    .name
                    .filter(|n| !n.trim().is_empty())
                    .unwrap_or_else(|| "Unnamed product".to_string()),
                unit,
            },
        })
    }
}

impl TryFrom<RawIngredientRow> for MenuItemIngredient {
    type Error = IngestError;

    fn try_from(row: RawIngredientRow) -> Result<Self, Self::Error> {
        let id = required_id(row.id.as_ref(), "id")?;
        let menu_item_id = required_id(row.menu_item_id.as_ref(), "menuItemId")?;
        let product_id = required_id(row.product_id.as_ref(), "productId")?;
        let quantity = required_decimal(row.quantity.as_ref(), "quantity")?;
        if quantity <= Decimal::ZERO {
            return Err(IngestError::NotPositive { field: "quantity" });
        }
        let code = row.unit.ok_or(IngestError::MissingField("unit"))?;
        let unit = Unit::from_code(code.trim()).ok_or(IngestError::UnknownUnit(code))?;

        Ok(MenuItemIngredient {
            id,
            menu_item_id,
            product_id,
            quantity,
            unit,
        })
    }
}

/// A row that was skipped during narrowing
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RejectedRow {
    pub index: usize,
    pub reason: String,
}

/// Outcome of narrowing a batch of rows
#[derive(Debug, Clone, PartialEq)]
pub struct Narrowed<T> {
    pub accepted: Vec<T>,
    pub rejected: Vec<RejectedRow>,
}

/// Narrow every stock lot row that can be narrowed, collecting the rest
pub fn narrow_stock_lots(rows: &[Value]) -> Narrowed<StockLotSnapshot> {
    narrow::<RawStockLotRow, StockLotSnapshot>(rows)
}

/// Narrow every ingredient row that can be narrowed, collecting the rest
pub fn narrow_ingredients(rows: &[Value]) -> Narrowed<MenuItemIngredient> {
    narrow::<RawIngredientRow, MenuItemIngredient>(rows)
}

fn narrow<R, T>(rows: &[Value]) -> Narrowed<T>
where
    R: for<'de> Deserialize<'de>,
    T: TryFrom<R, Error = IngestError>,
{
    let mut accepted = Vec::with_capacity(rows.len());
    let mut rejected = Vec::new();

    for (index, value) in rows.iter().enumerate() {
        let result = R::deserialize(value)
            .map_err(|e| IngestError::Malformed(e.to_string()))
            .and_then(T::try_from);
        match result {
            Ok(item) => accepted.push(item),
            Err(e) => rejected.push(RejectedRow {
                index,
                reason: e.to_string(),
            }),
        }
    }

    Narrowed { accepted, rejected }
}

fn required_id(value: Option<&Value>, field: &'static str) -> Result<Uuid, IngestError> {
    match value {
        None | Some(Value::Null) => Err(IngestError::MissingField(field)),
        Some(Value::String(s)) => Uuid::parse_str(s.trim()).map_err(|_| IngestError::InvalidId {
            field,
            value: s.clone(),
        }),
        Some(other) => Err(IngestError::InvalidId {
            field,
            value: other.to_string(),
        }),
    }
}

/// Store keys are opaque: any non-empty string or number is accepted
fn required_key(value: Option<&Value>, field: &'static str) -> Result<String, IngestError> {
    match value {
        None | Some(Value::Null) => Err(IngestError::MissingField(field)),
        Some(Value::String(s)) if s.trim().is_empty() => Err(IngestError::MissingField(field)),
        Some(Value::String(s)) => Ok(s.trim().to_string()),
        Some(Value::Number(n)) => Ok(n.to_string()),
        Some(other) => Err(IngestError::InvalidId {
            field,
            value: other.to_string(),
        }),
    }
}

fn required_decimal(value: Option<&Value>, field: &'static str) -> Result<Decimal, IngestError> {
    optional_decimal(value, field)?.ok_or(IngestError::MissingField(field))
}

fn optional_decimal(
    value: Option<&Value>,
    field: &'static str,
) -> Result<Option<Decimal>, IngestError> {
    let text = match value {
        None | Some(Value::Null) => return Ok(None),
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::String(s)) if s.trim().is_empty() => return Ok(None),
        Some(Value::String(s)) => s.trim().to_string(),
        Some(other) => {
            return Err(IngestError::InvalidNumber {
                field,
                value: other.to_string(),
            })
        }
    };

    Decimal::from_str(&text)
        .or_else(|_| Decimal::from_scientific(&text))
        .map(Some)
        .map_err(|_| IngestError::InvalidNumber { field, value: text })
}

/// Accepts `YYYY-MM-DD` or an RFC 3339 timestamp; anything else is no date
fn parse_date(value: &Value) -> Option<NaiveDate> {
    let text = value.as_str()?.trim();
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .or_else(|| DateTime::parse_from_rfc3339(text).ok().map(|dt| dt.date_naive()))
}
