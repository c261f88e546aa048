//! WebAssembly module for the Restaurant Stock Management Platform
//!
//! Provides client-side computation for:
//! - Menu item cost and margin calculation
//! - Stock notification classification
//! - The acknowledged-notification read set, persisted in `localStorage`

use std::collections::HashSet;

use chrono::{DateTime, TimeZone, Utc};
use serde::Serialize;
use wasm_bindgen::prelude::*;

// Re-export shared types for use in JavaScript
pub use shared::models::*;
pub use shared::types::*;

use shared::{
    classify, cost_breakdown, mark_all_read, mark_read, narrow_ingredients, narrow_stock_lots,
    unread_count, CostBreakdown, LatestPriceResolver, ReadStore, RejectedRow,
};

/// `localStorage` key holding the read set as a JSON array
pub const READ_SET_KEY: &str = "stock-notifications:read";

/// Initialize the WASM module
#[wasm_bindgen(start)]
pub fn init() {
    web_sys::console::debug_1(&JsValue::from_str("stock-management-wasm loaded"));
}

// ============================================================================
// Read Set Persistence
// ============================================================================

/// Read set stored in the browser's `localStorage`
pub struct LocalStorageReadStore {
    key: String,
}

impl LocalStorageReadStore {
    pub fn new(key: impl Into<String>) -> Self {
        Self { key: key.into() }
    }

    fn storage(&self) -> Result<web_sys::Storage, JsValue> {
        web_sys::window()
            .ok_or_else(|| JsValue::from_str("No window available"))?
            .local_storage()?
            .ok_or_else(|| JsValue::from_str("localStorage is not available"))
    }
}

impl Default for LocalStorageReadStore {
    fn default() -> Self {
        Self::new(READ_SET_KEY)
    }
}

impl ReadStore for LocalStorageReadStore {
    type Error = JsValue;

    fn load(&self) -> Result<HashSet<String>, Self::Error> {
        let raw = self.storage()?.get_item(&self.key)?;
        Ok(parse_read_set(raw.as_deref()))
    }

    fn save(&self, read_set: &HashSet<String>) -> Result<(), Self::Error> {
        let mut ids: Vec<&String> = read_set.iter().collect();
        ids.sort();
        let json = serde_json::to_string(&ids)
            .map_err(|e| JsValue::from_str(&format!("Cannot encode read set: {}", e)))?;
        self.storage()?.set_item(&self.key, &json)
    }
}

/// Current read set, or an empty one when the store cannot be read.
///
/// Classification must still work when storage is blocked; everything then
/// shows as unread.
pub fn read_set_or_empty<S, F>(store: &S, on_error: F) -> HashSet<String>
where
    S: ReadStore,
    F: FnOnce(S::Error),
{
    store.load().unwrap_or_else(|e| {
        on_error(e);
        HashSet::new()
    })
}

fn browser_read_set() -> HashSet<String> {
    read_set_or_empty(&LocalStorageReadStore::default(), |e| {
        web_sys::console::warn_2(
            &JsValue::from_str("Read notifications unavailable, showing all as unread:"),
            &e,
        )
    })
}

/// Decode a stored read set; unreadable content counts as empty
pub fn parse_read_set(raw: Option<&str>) -> HashSet<String> {
    raw.and_then(|s| serde_json::from_str::<Vec<String>>(s).ok())
        .map(|ids| ids.into_iter().collect())
        .unwrap_or_default()
}

// ============================================================================
// Notifications
// ============================================================================

/// Classification result handed to JavaScript
#[derive(Debug, Serialize)]
pub struct ClassificationOutput {
    pub notifications: Vec<NotificationRecord>,
    pub unread_count: usize,
    /// Rows skipped because they could not be read
    pub rejected: Vec<RejectedRow>,
}

/// Classify loosely typed stock lot rows against a read set
pub fn classify_rows(
    lots_json: &str,
    read_set: &HashSet<String>,
    now: DateTime<Utc>,
) -> Result<ClassificationOutput, String> {
    let rows: Vec<serde_json::Value> =
        serde_json::from_str(lots_json).map_err(|e| format!("Invalid stock lots JSON: {}", e))?;
    let narrowed = narrow_stock_lots(&rows);
    let notifications = classify(&narrowed.accepted, read_set, now);

    Ok(ClassificationOutput {
        unread_count: unread_count(&notifications),
        notifications,
        rejected: narrowed.rejected,
    })
}

/// Resolve the evaluation instant; callers may omit it to use the browser clock
fn instant_from_millis(now_ms: Option<f64>) -> Result<DateTime<Utc>, JsValue> {
    let millis = now_ms.unwrap_or_else(js_sys::Date::now);
    Utc.timestamp_millis_opt(millis as i64)
        .single()
        .ok_or_else(|| JsValue::from_str("Invalid timestamp"))
}

/// Classify stock lots into notifications, flagging those already read
#[wasm_bindgen]
pub fn classify_stock_notifications(
    lots_json: &str,
    now_ms: Option<f64>,
) -> Result<String, JsValue> {
    let read_set = browser_read_set();
    let output = classify_rows(lots_json, &read_set, instant_from_millis(now_ms)?)
        .map_err(|e| JsValue::from_str(&e))?;

    serde_json::to_string(&output).map_err(|e| JsValue::from_str(&e.to_string()))
}

/// Number of unread notifications, for badges
#[wasm_bindgen]
pub fn unread_notification_count(lots_json: &str, now_ms: Option<f64>) -> Result<u32, JsValue> {
    let read_set = browser_read_set();
    let output = classify_rows(lots_json, &read_set, instant_from_millis(now_ms)?)
        .map_err(|e| JsValue::from_str(&e))?;

    Ok(output.unread_count as u32)
}

/// Acknowledge one notification
#[wasm_bindgen]
pub fn mark_notification_read(id: &str) -> Result<(), JsValue> {
    mark_read(&LocalStorageReadStore::default(), id).map(|_| ())
}

/// Acknowledge every notification in a classified list
#[wasm_bindgen]
pub fn mark_all_notifications_read(notifications_json: &str) -> Result<(), JsValue> {
    let records: Vec<NotificationRecord> = serde_json::from_str(notifications_json)
        .map_err(|e| JsValue::from_str(&format!("Invalid notifications JSON: {}", e)))?;

    mark_all_read(&LocalStorageReadStore::default(), &records).map(|_| ())
}

// ============================================================================
// Costing
// ============================================================================

/// Cost a menu item from its recipe rows and the establishment's stock lots
pub fn cost_menu_item(
    item_json: &str,
    ingredients_json: &str,
    lots_json: &str,
    products_json: &str,
) -> Result<CostBreakdown, String> {
    let item: MenuItem =
        serde_json::from_str(item_json).map_err(|e| format!("Invalid menu item JSON: {}", e))?;
    let rows: Vec<serde_json::Value> = serde_json::from_str(ingredients_json)
        .map_err(|e| format!("Invalid ingredients JSON: {}", e))?;
    let lots: Vec<StockLot> =
        serde_json::from_str(lots_json).map_err(|e| format!("Invalid stock lots JSON: {}", e))?;
    let products: Vec<Product> =
        serde_json::from_str(products_json).map_err(|e| format!("Invalid products JSON: {}", e))?;

    let ingredients = narrow_ingredients(&rows).accepted;
    let resolver = LatestPriceResolver::from_lots(&lots, &products);

    Ok(cost_breakdown(&item, &ingredients, &resolver))
}

/// Compute cost price and margins of a menu item
#[wasm_bindgen]
pub fn compute_menu_item_costs(
    item_json: &str,
    ingredients_json: &str,
    lots_json: &str,
    products_json: &str,
) -> Result<String, JsValue> {
    let breakdown = cost_menu_item(item_json, ingredients_json, lots_json, products_json)
        .map_err(|e| JsValue::from_str(&e))?;

    serde_json::to_string(&breakdown).map_err(|e| JsValue::from_str(&e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    const LOT_ID: &str = "6f1c2a9e-8d44-4b1e-9a3f-2f6b1d0c7e55";
    const PRODUCT_ID: &str = "0b7d5e3a-1c2f-4a8b-9e6d-3c4f5a6b7c8d";
    const ITEM_ID: &str = "9a8b7c6d-5e4f-4a3b-8c2d-1e0f9a8b7c6d";

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 15, 9, 0, 0).unwrap()
    }

    #[test]
    fn test_parse_read_set() {
        let set = parse_read_set(Some(r#"["expired-a","stock_low-b"]"#));
        assert_eq!(set.len(), 2);
        assert!(set.contains("expired-a"));
        assert!(parse_read_set(Some("{corrupt")).is_empty());
        assert!(parse_read_set(None).is_empty());
    }

    #[test]
    fn test_classify_rows_flags_read_and_rejects() {
        let lots = format!(
            r#"[
                {{"id":"{LOT_ID}","productId":"{PRODUCT_ID}","quantity":"0","minThreshold":"2",
                  "expiryDate":"2024-03-14","product":{{"name":"Milk","unit":"L"}}}},
                {{"productId":"{PRODUCT_ID}","quantity":1}}
            ]"#
        );
        let read: HashSet<String> = [format!("expired-{}", LOT_ID)].into_iter().collect();

        let output = classify_rows(&lots, &read, now()).unwrap();
        assert_eq!(output.notifications.len(), 2);
        assert_eq!(output.unread_count, 1);
        // Unread critical first, then the acknowledged one
        assert_eq!(output.notifications[0].id, format!("stock_empty-{}", LOT_ID));
        assert!(!output.notifications[1].unread);
        assert_eq!(output.rejected.len(), 1);
        assert_eq!(output.rejected[0].index, 1);
    }

    struct BlockedStore;

    impl ReadStore for BlockedStore {
        type Error = String;

        fn load(&self) -> Result<HashSet<String>, Self::Error> {
            Err("SecurityError: access denied".to_string())
        }

        fn save(&self, _: &HashSet<String>) -> Result<(), Self::Error> {
            Err("SecurityError: access denied".to_string())
        }
    }

    #[test]
    fn test_blocked_storage_still_classifies() {
        let mut reported = None;
        let read_set = read_set_or_empty(&BlockedStore, |e| reported = Some(e));
        assert!(read_set.is_empty());
        assert_eq!(reported.as_deref(), Some("SecurityError: access denied"));

        let lots = format!(
            r#"[{{"id":"abc","productId":"{PRODUCT_ID}","quantity":4,"expiryDate":"2024-03-14"}}]"#
        );
        let output = classify_rows(&lots, &read_set, now()).unwrap();
        assert_eq!(output.notifications.len(), 1);
        assert_eq!(output.unread_count, 1);
    }

    #[test]
    fn test_mark_read_still_reports_blocked_storage() {
        assert!(mark_read(&BlockedStore, "expired-abc").is_err());
    }

    #[test]
    fn test_plain_store_id_matches_read_set() {
        let lots = format!(
            r#"[{{"id":"abc","productId":"{PRODUCT_ID}","quantity":4,"expiryDate":"2024-03-14",
                 "product":{{"name":"Yaourt","unit":"unit"}}}}]"#
        );
        let read: HashSet<String> = ["expired-abc".to_string()].into_iter().collect();

        let output = classify_rows(&lots, &read, now()).unwrap();

        assert!(output.rejected.is_empty());
        assert_eq!(output.notifications.len(), 1);
        assert_eq!(output.notifications[0].id, "expired-abc");
        assert!(!output.notifications[0].unread);
        assert_eq!(output.unread_count, 0);
    }

    #[test]
    fn test_classify_rows_invalid_json() {
        assert!(classify_rows("not json", &HashSet::new(), now()).is_err());
    }

    #[test]
    fn test_cost_menu_item() {
        let item = format!(
            r#"{{"id":"{ITEM_ID}","name":"Café crème","category":"drinks","selling_price":"3.50","is_active":true}}"#
        );
        let ingredients = format!(
            r#"[{{"id":"{LOT_ID}","menuItemId":"{ITEM_ID}","productId":"{PRODUCT_ID}","quantity":"200","unit":"mL"}}]"#
        );
        let lots = format!(
            r#"[{{"id":"{LOT_ID}","product_id":"{PRODUCT_ID}","quantity":"12","unit_price":"1.20",
                 "expiry_date":null,"created_at":"2024-03-10T08:00:00Z",
                 "updated_at":"2024-03-10T08:00:00Z"}}]"#
        );
        let products = format!(
            r#"[{{"id":"{PRODUCT_ID}","name":"Milk","category":"fresh","unit":"L",
                 "min_stock_threshold":"4","created_at":"2024-01-01T00:00:00Z"}}]"#
        );

        let breakdown = cost_menu_item(&item, &ingredients, &lots, &products).unwrap();
        // 200 mL at 1.20 per litre
        assert_eq!(breakdown.costs.cost_price, Decimal::new(24, 2));
        assert_eq!(breakdown.costs.margin_amount, Decimal::new(326, 2));
        assert_eq!(breakdown.costs.margin_percent, Decimal::new(931, 1));
        assert!(breakdown.unpriced_products.is_empty());
    }
}
