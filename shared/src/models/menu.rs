//! Menu item and recipe models

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::types::Unit;
use crate::validation::{validate_non_negative, validate_positive};

/// A dish or drink on the menu
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MenuItem {
    pub id: Uuid,
    pub name: String,
    pub category: String,
    pub selling_price: Decimal,
    pub is_active: bool,
}

/// One recipe line of a menu item
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MenuItemIngredient {
    pub id: Uuid,
    pub menu_item_id: Uuid,
    pub product_id: Uuid,
    /// Quantity required per serving
    pub quantity: Decimal,
    pub unit: Unit,
}

/// Derived cost fields of a menu item, never stored
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct MenuItemCosts {
    pub cost_price: Decimal,
    pub margin_amount: Decimal,
    pub margin_percent: Decimal,
}

/// Menu item together with its freshly computed costs
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MenuItemWithCosts {
    #[serde(flatten)]
    pub item: MenuItem,
    #[serde(flatten)]
    pub costs: MenuItemCosts,
}

/// Input for one recipe line
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct IngredientInput {
    pub product_id: Uuid,
    #[validate(custom = "validate_positive")]
    pub quantity: Decimal,
    pub unit: Unit,
}

/// Input for creating a menu item with its recipe
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateMenuItemInput {
    #[validate(length(min = 1, max = 120))]
    pub name: String,
    #[validate(length(min = 1, max = 60))]
    pub category: String,
    #[validate(custom = "validate_non_negative")]
    pub selling_price: Decimal,
    #[validate]
    pub ingredients: Vec<IngredientInput>,
}
