//! Menu service: recipes and live cost/margin figures

use std::collections::HashMap;

use rust_decimal::Decimal;
use serde::Serialize;
use shared::{
    cost_breakdown, CostBreakdown, CreateMenuItemInput, LatestPriceResolver, MenuItem,
    MenuItemIngredient, MenuItemWithCosts, Unit,
};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::services::{ProductService, StockService};

const ITEM_INGREDIENTS_QUERY: &str = r#"
    SELECT id, menu_item_id, product_id, quantity, unit
    FROM menu_item_ingredients
    WHERE menu_item_id = $1
    ORDER BY position, id
"#;

const ESTABLISHMENT_INGREDIENTS_QUERY: &str = r#"
    SELECT mii.id, mii.menu_item_id, mii.product_id, mii.quantity, mii.unit
    FROM menu_item_ingredients mii
    JOIN menu_items mi ON mi.id = mii.menu_item_id
    WHERE mi.establishment_id = $1 AND mi.is_active = true
    ORDER BY mii.menu_item_id, mii.position, mii.id
"#;

/// Menu service for recipes and costing
#[derive(Clone)]
pub struct MenuService {
    db: PgPool,
}

/// A menu item with its recipe and cost breakdown
#[derive(Debug, Clone, Serialize)]
pub struct MenuItemDetail {
    #[serde(flatten)]
    pub item: MenuItem,
    pub ingredients: Vec<MenuItemIngredient>,
    pub breakdown: CostBreakdown,
}

/// Row for menu item queries
#[derive(Debug, FromRow)]
struct MenuItemRow {
    id: Uuid,
    name: String,
    category: String,
    selling_price: Decimal,
    is_active: bool,
}

impl From<MenuItemRow> for MenuItem {
    fn from(row: MenuItemRow) -> Self {
        MenuItem {
            id: row.id,
            name: row.name,
            category: row.category,
            selling_price: row.selling_price,
            is_active: row.is_active,
        }
    }
}

/// Row for ingredient queries
#[derive(Debug, FromRow)]
struct IngredientRow {
    id: Uuid,
    menu_item_id: Uuid,
    product_id: Uuid,
    quantity: Decimal,
    unit: String,
}

impl TryFrom<IngredientRow> for MenuItemIngredient {
    type Error = AppError;

    fn try_from(row: IngredientRow) -> Result<Self, Self::Error> {
        let unit = Unit::from_code(&row.unit).ok_or_else(|| {
            AppError::Internal(format!("Unknown unit '{}' on ingredient {}", row.unit, row.id))
        })?;

        Ok(MenuItemIngredient {
            id: row.id,
            menu_item_id: row.menu_item_id,
            product_id: row.product_id,
            quantity: row.quantity,
            unit,
        })
    }
}

impl MenuService {
    /// Create a new MenuService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// List active menu items with costs computed from current prices
    pub async fn list_items(&self, establishment_id: Uuid) -> AppResult<Vec<MenuItemWithCosts>> {
        let items: Vec<MenuItem> = sqlx::query_as::<_, MenuItemRow>(
            r#"
            SELECT id, name, category, selling_price, is_active
            FROM menu_items
            WHERE establishment_id = $1 AND is_active = true
            ORDER BY category, name
            "#,
        )
        .bind(establishment_id)
        .fetch_all(&self.db)
        .await?
        .into_iter()
        .map(MenuItem::from)
        .collect();

        let mut by_item: HashMap<Uuid, Vec<MenuItemIngredient>> = HashMap::new();
        for ingredient in self.ingredients_for_establishment(establishment_id).await? {
            by_item
                .entry(ingredient.menu_item_id)
                .or_default()
                .push(ingredient);
        }

        let resolver = self.price_resolver(establishment_id).await?;

        Ok(items
            .into_iter()
            .map(|item| {
                let ingredients = by_item.remove(&item.id).unwrap_or_default();
                let breakdown = cost_breakdown(&item, &ingredients, &resolver);
                log_unpriced(&item, &breakdown);
                MenuItemWithCosts {
                    item,
                    costs: breakdown.costs,
                }
            })
            .collect())
    }

    /// One menu item with its recipe and cost breakdown
    pub async fn get_item(&self, establishment_id: Uuid, item_id: Uuid) -> AppResult<MenuItemDetail> {
        let item: MenuItem = sqlx::query_as::<_, MenuItemRow>(
            r#"
            SELECT id, name, category, selling_price, is_active
            FROM menu_items
            WHERE id = $1 AND establishment_id = $2
            "#,
        )
        .bind(item_id)
        .bind(establishment_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Menu item".to_string()))?
        .into();

        let ingredients = sqlx::query_as::<_, IngredientRow>(ITEM_INGREDIENTS_QUERY)
            .bind(item_id)
            .fetch_all(&self.db)
            .await?
            .into_iter()
            .map(MenuItemIngredient::try_from)
            .collect::<AppResult<Vec<_>>>()?;

        let resolver = self.price_resolver(establishment_id).await?;
        let breakdown = cost_breakdown(&item, &ingredients, &resolver);
        log_unpriced(&item, &breakdown);

        Ok(MenuItemDetail {
            item,
            ingredients,
            breakdown,
        })
    }

    /// Create a menu item with its recipe
    pub async fn create_item(
        &self,
        establishment_id: Uuid,
        input: CreateMenuItemInput,
    ) -> AppResult<MenuItemDetail> {
        input.validate()?;

        let products = ProductService::new(self.db.clone());
        for ingredient in &input.ingredients {
            products
                .ensure_owned(establishment_id, ingredient.product_id)
                .await?;
        }

        let mut tx = self.db.begin().await?;

        let row = sqlx::query_as::<_, MenuItemRow>(
            r#"
            INSERT INTO menu_items (establishment_id, name, category, selling_price)
            VALUES ($1, $2, $3, $4)
            RETURNING id, name, category, selling_price, is_active
            "#,
        )
        .bind(establishment_id)
        .bind(input.name.trim())
        .bind(input.category.trim())
        .bind(input.selling_price)
        .fetch_one(&mut *tx)
        .await?;

        for (position, ingredient) in (0i32..).zip(&input.ingredients) {
            sqlx::query(
                r#"
                INSERT INTO menu_item_ingredients (menu_item_id, product_id, quantity, unit, position)
                VALUES ($1, $2, $3, $4, $5)
                "#,
            )
            .bind(row.id)
            .bind(ingredient.product_id)
            .bind(ingredient.quantity)
            .bind(ingredient.unit.code())
            .bind(position)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        tracing::info!(
            menu_item_id = %row.id,
            ingredients = input.ingredients.len(),
            "Menu item created"
        );

        self.get_item(establishment_id, row.id).await
    }

    async fn ingredients_for_establishment(
        &self,
        establishment_id: Uuid,
    ) -> AppResult<Vec<MenuItemIngredient>> {
        sqlx::query_as::<_, IngredientRow>(ESTABLISHMENT_INGREDIENTS_QUERY)
            .bind(establishment_id)
            .fetch_all(&self.db)
            .await?
            .into_iter()
            .map(MenuItemIngredient::try_from)
            .collect()
    }

    async fn price_resolver(&self, establishment_id: Uuid) -> AppResult<LatestPriceResolver> {
        let products = ProductService::new(self.db.clone())
            .list_products(establishment_id)
            .await?;
        let lots = StockService::new(self.db.clone())
            .price_history(establishment_id)
            .await?;

        Ok(LatestPriceResolver::from_lots(&lots, &products))
    }
}

fn log_unpriced(item: &MenuItem, breakdown: &CostBreakdown) {
    if !breakdown.unpriced_products.is_empty() {
        tracing::warn!(
            menu_item_id = %item.id,
            unpriced = breakdown.unpriced_products.len(),
            "Ingredients without a price were costed at zero"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Recipe lines come back in the order they were entered
    #[test]
    fn test_ingredient_queries_follow_entry_order() {
        assert!(ITEM_INGREDIENTS_QUERY.contains("ORDER BY position, id"));
        assert!(ESTABLISHMENT_INGREDIENTS_QUERY.contains("ORDER BY mii.menu_item_id, mii.position"));
    }
}
