//! Menu item cost and margin calculation
//!
//! Costs are recomputed from current product prices every time a menu item is
//! read. A product without a price contributes nothing to the cost instead of
//! failing the whole item.

use std::collections::HashMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{MenuItem, MenuItemCosts, MenuItemIngredient, Product, StockLot};
use crate::types::{round_currency, round_percent, Unit};

/// Looks up the current unit price of a product.
///
/// The returned price must already be expressed per `unit`, the unit the
/// recipe quantity is written in.
pub trait PriceResolver {
    fn unit_price(&self, product_id: Uuid, unit: Unit) -> Option<Decimal>;
}

impl<F> PriceResolver for F
where
    F: Fn(Uuid, Unit) -> Option<Decimal>,
{
    fn unit_price(&self, product_id: Uuid, unit: Unit) -> Option<Decimal> {
        self(product_id, unit)
    }
}

/// Resolves prices from the most recently updated stock lot of each product
#[derive(Debug, Clone, Default)]
pub struct LatestPriceResolver {
    prices: HashMap<Uuid, LatestPrice>,
}

#[derive(Debug, Clone, Copy)]
struct LatestPrice {
    price: Decimal,
    unit: Unit,
    /// Purchase time, then lot id to break ties
    rank: (chrono::DateTime<chrono::Utc>, Uuid),
}

impl LatestPriceResolver {
    /// Build from the establishment's lots and the products they belong to.
    ///
    /// The most recently purchased lot wins; quantity adjustments do not
    /// change which price is current. Lots whose product is unknown are
    /// ignored.
    pub fn from_lots<'a>(
        lots: impl IntoIterator<Item = &'a StockLot>,
        products: impl IntoIterator<Item = &'a Product>,
    ) -> Self {
        let units: HashMap<Uuid, Unit> = products.into_iter().map(|p| (p.id, p.unit)).collect();
        let mut prices: HashMap<Uuid, LatestPrice> = HashMap::new();

        for lot in lots {
            let Some(&unit) = units.get(&lot.product_id) else {
                continue;
            };
            let candidate = LatestPrice {
                price: lot.unit_price,
                unit,
                rank: (lot.created_at, lot.id),
            };
            prices
                .entry(lot.product_id)
                .and_modify(|current| {
                    if candidate.rank > current.rank {
                        *current = candidate;
                    }
                })
                .or_insert(candidate);
        }

        Self { prices }
    }

    pub fn len(&self) -> usize {
        self.prices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prices.is_empty()
    }
}

impl PriceResolver for LatestPriceResolver {
    fn unit_price(&self, product_id: Uuid, unit: Unit) -> Option<Decimal> {
        let latest = self.prices.get(&product_id)?;
        latest.unit.convert_price(latest.price, unit)
    }
}

/// Cost contribution of one recipe line
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IngredientCost {
    pub ingredient_id: Uuid,
    pub product_id: Uuid,
    pub quantity: Decimal,
    pub unit: Unit,
    /// `None` when no price could be resolved
    pub unit_price: Option<Decimal>,
    pub line_cost: Decimal,
}

/// Full costing of a menu item
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CostBreakdown {
    pub lines: Vec<IngredientCost>,
    /// Products that had no resolvable price and were costed at zero
    pub unpriced_products: Vec<Uuid>,
    #[serde(flatten)]
    pub costs: MenuItemCosts,
}

/// Cost each recipe line and derive the margin of the menu item
pub fn cost_breakdown<R>(
    menu_item: &MenuItem,
    ingredients: &[MenuItemIngredient],
    resolver: &R,
) -> CostBreakdown
where
    R: PriceResolver + ?Sized,
{
    let mut lines = Vec::with_capacity(ingredients.len());
    let mut unpriced_products = Vec::new();
    let mut total = Decimal::ZERO;

    for ingredient in ingredients {
        let unit_price = resolver.unit_price(ingredient.product_id, ingredient.unit);
        let line_cost = match unit_price {
            Some(price) => ingredient.quantity * price,
            None => {
                unpriced_products.push(ingredient.product_id);
                Decimal::ZERO
            }
        };
        total += line_cost;

        lines.push(IngredientCost {
            ingredient_id: ingredient.id,
            product_id: ingredient.product_id,
            quantity: ingredient.quantity,
            unit: ingredient.unit,
            unit_price,
            line_cost,
        });
    }

    CostBreakdown {
        lines,
        unpriced_products,
        costs: margins(menu_item.selling_price, total),
    }
}

/// Compute `cost_price`, `margin_amount` and `margin_percent` of a menu item
pub fn compute_costs<R>(
    menu_item: &MenuItem,
    ingredients: &[MenuItemIngredient],
    resolver: &R,
) -> MenuItemCosts
where
    R: PriceResolver + ?Sized,
{
    cost_breakdown(menu_item, ingredients, resolver).costs
}

/// Margin figures from a selling price and an unrounded ingredient cost
pub fn margins(selling_price: Decimal, total_cost: Decimal) -> MenuItemCosts {
    let cost_price = round_currency(total_cost);
    let margin_amount = round_currency(selling_price - cost_price);
    let margin_percent = if selling_price > Decimal::ZERO {
        round_percent(margin_amount / selling_price * Decimal::ONE_HUNDRED)
    } else {
        Decimal::ZERO
    };

    MenuItemCosts {
        cost_price,
        margin_amount,
        margin_percent,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn menu_item(selling_price: &str) -> MenuItem {
        MenuItem {
            id: Uuid::new_v4(),
            name: "Salade niçoise".to_string(),
            category: "starters".to_string(),
            selling_price: dec(selling_price),
            is_active: true,
        }
    }

    fn ingredient(item: &MenuItem, product_id: Uuid, quantity: &str, unit: Unit) -> MenuItemIngredient {
        MenuItemIngredient {
            id: Uuid::new_v4(),
            menu_item_id: item.id,
            product_id,
            quantity: dec(quantity),
            unit,
        }
    }

    fn product(unit: Unit) -> Product {
        Product {
            id: Uuid::new_v4(),
            name: "Tomatoes".to_string(),
            category: crate::models::ProductCategory::Fresh,
            unit,
            min_stock_threshold: Decimal::ZERO,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_two_ingredients_margin() {
        let item = menu_item("10.00");
        let bread = Uuid::new_v4();
        let cheese = Uuid::new_v4();
        let ingredients = vec![
            ingredient(&item, bread, "2", Unit::Piece),
            ingredient(&item, cheese, "1", Unit::Piece),
        ];
        let resolver = |id: Uuid, _: Unit| {
            if id == bread {
                Some(dec("1.50"))
            } else if id == cheese {
                Some(dec("3.00"))
            } else {
                None
            }
        };

        let costs = compute_costs(&item, &ingredients, &resolver);
        assert_eq!(costs.cost_price, dec("6.00"));
        assert_eq!(costs.margin_amount, dec("4.00"));
        assert_eq!(costs.margin_percent, dec("40.0"));
    }

    #[test]
    fn test_missing_price_contributes_zero() {
        let item = menu_item("8.00");
        let priced = Uuid::new_v4();
        let unpriced = Uuid::new_v4();
        let ingredients = vec![
            ingredient(&item, priced, "0.5", Unit::Kilogram),
            ingredient(&item, unpriced, "3", Unit::Piece),
        ];
        let resolver = |id: Uuid, _: Unit| (id == priced).then(|| dec("4.00"));

        let breakdown = cost_breakdown(&item, &ingredients, &resolver);
        assert_eq!(breakdown.costs.cost_price, dec("2.00"));
        assert_eq!(breakdown.unpriced_products, vec![unpriced]);
        assert_eq!(breakdown.lines[1].line_cost, Decimal::ZERO);
        assert_eq!(breakdown.lines[1].unit_price, None);
    }

    /// Breakdown lines keep the recipe order
    #[test]
    fn test_lines_follow_recipe_order() {
        let item = menu_item("14.00");
        let ingredients: Vec<_> = ["0.2", "0.05", "1", "0.15"]
            .iter()
            .map(|q| ingredient(&item, Uuid::new_v4(), q, Unit::Kilogram))
            .collect();
        let resolver = |_: Uuid, _: Unit| Some(dec("10.00"));

        let breakdown = cost_breakdown(&item, &ingredients, &resolver);

        let expected: Vec<Uuid> = ingredients.iter().map(|i| i.id).collect();
        let actual: Vec<Uuid> = breakdown.lines.iter().map(|l| l.ingredient_id).collect();
        assert_eq!(actual, expected);
    }

    #[test]
    fn test_no_ingredients() {
        let item = menu_item("12.50");
        let costs = compute_costs(&item, &[], &|_: Uuid, _: Unit| None::<Decimal>);
        assert_eq!(costs.cost_price, Decimal::ZERO);
        assert_eq!(costs.margin_amount, dec("12.50"));
        assert_eq!(costs.margin_percent, dec("100.0"));
    }

    #[test]
    fn test_zero_selling_price_has_zero_percent() {
        let item = menu_item("0");
        let product_id = Uuid::new_v4();
        let ingredients = vec![ingredient(&item, product_id, "1", Unit::Piece)];
        let costs = compute_costs(&item, &ingredients, &|_: Uuid, _: Unit| Some(dec("2.00")));
        assert_eq!(costs.cost_price, dec("2.00"));
        assert_eq!(costs.margin_amount, dec("-2.00"));
        assert_eq!(costs.margin_percent, Decimal::ZERO);

        let empty = compute_costs(&item, &[], &|_: Uuid, _: Unit| None::<Decimal>);
        assert_eq!(empty.margin_percent, Decimal::ZERO);
    }

    #[test]
    fn test_rounding_half_up() {
        // 3 x 0.335 = 1.005 -> 1.01
        let item = menu_item("3.00");
        let product_id = Uuid::new_v4();
        let ingredients = vec![ingredient(&item, product_id, "3", Unit::Piece)];
        let costs = compute_costs(&item, &ingredients, &|_: Uuid, _: Unit| Some(dec("0.335")));
        assert_eq!(costs.cost_price, dec("1.01"));
        assert_eq!(costs.margin_amount, dec("1.99"));
        // 1.99 / 3 = 66.333..
        assert_eq!(costs.margin_percent, dec("66.3"));
    }

    #[test]
    fn test_latest_price_resolver_uses_most_recent_lot() {
        let flour = product(Unit::Kilogram);
        let now = Utc::now();
        let old = StockLot {
            id: Uuid::new_v4(),
            product_id: flour.id,
            quantity: dec("10"),
            unit_price: dec("1.00"),
            expiry_date: None,
            created_at: now - Duration::days(10),
            updated_at: now - Duration::days(10),
        };
        let recent = StockLot {
            id: Uuid::new_v4(),
            product_id: flour.id,
            quantity: dec("5"),
            unit_price: dec("1.20"),
            expiry_date: None,
            created_at: now,
            updated_at: now,
        };

        let resolver = LatestPriceResolver::from_lots([&recent, &old], [&flour]);
        assert_eq!(resolver.unit_price(flour.id, Unit::Kilogram), Some(dec("1.20")));
        // Recipe written in grams gets a price per gram
        assert_eq!(resolver.unit_price(flour.id, Unit::Gram), Some(dec("0.0012")));
        assert_eq!(resolver.unit_price(flour.id, Unit::Liter), None);
        assert_eq!(resolver.unit_price(Uuid::new_v4(), Unit::Kilogram), None);
    }

    #[test]
    fn test_adjusting_an_old_lot_keeps_the_newer_purchase_price() {
        let flour = product(Unit::Kilogram);
        let now = Utc::now();
        // Bought last week, decremented by a sale just now
        let adjusted = StockLot {
            id: Uuid::new_v4(),
            product_id: flour.id,
            quantity: dec("3"),
            unit_price: dec("1.00"),
            expiry_date: None,
            created_at: now - Duration::days(7),
            updated_at: now,
        };
        let newer = StockLot {
            id: Uuid::new_v4(),
            product_id: flour.id,
            quantity: dec("25"),
            unit_price: dec("1.50"),
            expiry_date: None,
            created_at: now - Duration::hours(1),
            updated_at: now - Duration::hours(1),
        };

        for lots in [[&adjusted, &newer], [&newer, &adjusted]] {
            let resolver = LatestPriceResolver::from_lots(lots, [&flour]);
            assert_eq!(resolver.unit_price(flour.id, Unit::Kilogram), Some(dec("1.50")));
        }
    }

    #[test]
    fn test_same_purchase_time_resolves_by_lot_id() {
        let flour = product(Unit::Kilogram);
        let bought = Utc::now();
        let lot = |id: u128, price: &str| StockLot {
            id: Uuid::from_u128(id),
            product_id: flour.id,
            quantity: dec("1"),
            unit_price: dec(price),
            expiry_date: None,
            created_at: bought,
            updated_at: bought,
        };
        let (low, high) = (lot(1, "2.00"), lot(2, "2.40"));

        let forward = LatestPriceResolver::from_lots([&low, &high], [&flour]);
        let backward = LatestPriceResolver::from_lots([&high, &low], [&flour]);
        assert_eq!(forward.unit_price(flour.id, Unit::Kilogram), Some(dec("2.40")));
        assert_eq!(backward.unit_price(flour.id, Unit::Kilogram), Some(dec("2.40")));
    }

    #[test]
    fn test_resolver_ignores_lots_of_unknown_products() {
        let lot = StockLot {
            id: Uuid::new_v4(),
            product_id: Uuid::new_v4(),
            quantity: dec("1"),
            unit_price: dec("9.99"),
            expiry_date: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let resolver = LatestPriceResolver::from_lots([&lot], std::iter::empty::<&Product>());
        assert!(resolver.is_empty());
    }

    #[test]
    fn test_gram_recipe_against_kilogram_stock() {
        let butter = product(Unit::Kilogram);
        let lot = StockLot {
            id: Uuid::new_v4(),
            product_id: butter.id,
            quantity: dec("4"),
            unit_price: dec("9.00"),
            expiry_date: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let resolver = LatestPriceResolver::from_lots([&lot], [&butter]);
        let item = menu_item("6.00");
        let ingredients = vec![ingredient(&item, butter.id, "50", Unit::Gram)];

        let costs = compute_costs(&item, &ingredients, &resolver);
        assert_eq!(costs.cost_price, dec("0.45"));
        assert_eq!(costs.margin_amount, dec("5.55"));
        assert_eq!(costs.margin_percent, dec("92.5"));
    }
}
