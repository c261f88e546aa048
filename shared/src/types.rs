//! Common types used across the platform

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// Unit of measure for products and recipe quantities
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Unit {
    #[serde(rename = "kg")]
    Kilogram,
    #[serde(rename = "g")]
    Gram,
    #[serde(rename = "L")]
    Liter,
    #[serde(rename = "mL")]
    Milliliter,
    #[serde(rename = "unit")]
    Piece,
}

/// Physical dimension a unit measures
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dimension {
    Mass,
    Volume,
    Count,
}

impl Unit {
    pub fn code(&self) -> &'static str {
        match self {
            Unit::Kilogram => "kg",
            Unit::Gram => "g",
            Unit::Liter => "L",
            Unit::Milliliter => "mL",
            Unit::Piece => "unit",
        }
    }

    pub fn dimension(&self) -> Dimension {
        match self {
            Unit::Kilogram | Unit::Gram => Dimension::Mass,
            Unit::Liter | Unit::Milliliter => Dimension::Volume,
            Unit::Piece => Dimension::Count,
        }
    }

    /// How many base units (g, mL, unit) one of this unit holds
    fn base_factor(&self) -> Decimal {
        match self {
            Unit::Kilogram | Unit::Liter => Decimal::ONE_THOUSAND,
            Unit::Gram | Unit::Milliliter | Unit::Piece => Decimal::ONE,
        }
    }

    /// Convert a price quoted per `self` into a price per `target`.
    ///
    /// Returns `None` when the units measure different dimensions.
    pub fn convert_price(&self, price: Decimal, target: Unit) -> Option<Decimal> {
        if self.dimension() != target.dimension() {
            return None;
        }
        Some(price * target.base_factor() / self.base_factor())
    }

    /// Parse the codes stored in the database and sent by clients
    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "kg" => Some(Unit::Kilogram),
            "g" => Some(Unit::Gram),
            "L" | "l" => Some(Unit::Liter),
            "mL" | "ml" => Some(Unit::Milliliter),
            "unit" => Some(Unit::Piece),
            _ => None,
        }
    }
}

impl std::fmt::Display for Unit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

/// Round a currency amount to cents, half-up
pub fn round_currency(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Round a percentage to one decimal place, half-up
pub fn round_percent(percent: Decimal) -> Decimal {
    percent.round_dp_with_strategy(1, RoundingStrategy::MidpointAwayFromZero)
}
