//! Stock notification classification
//!
//! Notifications are recomputed from the current stock lots on every call.
//! Each lot is checked on two independent dimensions:
//! - Stock: empty or at/below its minimum threshold (tracked products only)
//! - Expiry: expired, expiring within 3 days (critical) or within 7 days (warning)
//!
//! Identifiers are `"<kind>-<lotId>"`, so the same condition always maps to
//! the same id and the externally persisted read set stays valid across
//! refreshes.

use std::collections::HashSet;
use std::convert::Infallible;
use std::sync::{Arc, RwLock};

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;

use crate::models::{NotificationKind, NotificationRecord, Severity, StockLotSnapshot};

/// Days left at or below which an expiring lot is critical
pub const EXPIRY_CRITICAL_DAYS: i64 = 3;
/// Days left at or below which an expiring lot is reported at all
pub const EXPIRY_WARNING_DAYS: i64 = 7;

/// Derive the prioritized notification list for an establishment's stock.
///
/// `read_set` holds the identifiers the user already acknowledged; matching
/// records are kept but flagged as read. Output is ordered by severity, then
/// unread before read, then input order.
pub fn classify(
    stock_lots: &[StockLotSnapshot],
    read_set: &HashSet<String>,
    now: DateTime<Utc>,
) -> Vec<NotificationRecord> {
    let mut records = Vec::new();

    for lot in stock_lots {
        if let Some((kind, severity)) = stock_condition(lot.quantity, lot.min_threshold) {
            records.push(build_record(lot, kind, severity, read_set, stock_message(lot, kind)));
        }

        if let Some(expiry) = lot.expiry_date {
            let days_left = days_until_expiry(expiry, now);
            if let Some((kind, severity)) = expiry_condition(days_left) {
                records.push(build_record(
                    lot,
                    kind,
                    severity,
                    read_set,
                    expiry_message(&lot.product.name, days_left),
                ));
            }
        }
    }

    // sort_by_key is stable, input order breaks ties
    records.sort_by_key(|r| (r.severity.rank(), !r.unread));
    records
}

/// Calendar days from `now`'s UTC date to `expiry`; negative once past
pub fn days_until_expiry(expiry: NaiveDate, now: DateTime<Utc>) -> i64 {
    (expiry - now.date_naive()).num_days()
}

/// Stock-level condition of a lot, if any
pub fn stock_condition(quantity: Decimal, threshold: Decimal) -> Option<(NotificationKind, Severity)> {
    if threshold <= Decimal::ZERO {
        return None;
    }
    if quantity <= Decimal::ZERO {
        Some((NotificationKind::StockEmpty, Severity::Critical))
    } else if quantity <= threshold {
        Some((NotificationKind::StockLow, Severity::Critical))
    } else {
        None
    }
}

/// Expiry condition for a lot with `days_left` calendar days until expiry
pub fn expiry_condition(days_left: i64) -> Option<(NotificationKind, Severity)> {
    match days_left {
        d if d <= 0 => Some((NotificationKind::Expired, Severity::Critical)),
        d if d <= EXPIRY_CRITICAL_DAYS => Some((NotificationKind::ExpiringSoon, Severity::Critical)),
        d if d <= EXPIRY_WARNING_DAYS => Some((NotificationKind::ExpiringSoon, Severity::Warning)),
        _ => None,
    }
}

/// Number of records not yet acknowledged
pub fn unread_count(records: &[NotificationRecord]) -> usize {
    records.iter().filter(|r| r.unread).count()
}

fn build_record(
    lot: &StockLotSnapshot,
    kind: NotificationKind,
    severity: Severity,
    read_set: &HashSet<String>,
    message: String,
) -> NotificationRecord {
    let id = kind.notification_id(&lot.id);
    let unread = !read_set.contains(&id);

    NotificationRecord {
        id,
        kind,
        severity,
        title: title(kind).to_string(),
        message,
        unread,
        product_id: lot.product_id,
        product_name: lot.product.name.clone(),
        stock_lot_id: lot.id.clone(),
    }
}

fn title(kind: NotificationKind) -> &'static str {
    match kind {
        NotificationKind::StockEmpty => "Out of stock",
        NotificationKind::StockLow => "Low stock",
        NotificationKind::ExpiringSoon => "Expiring soon",
        NotificationKind::Expired => "Expired",
    }
}

fn stock_message(lot: &StockLotSnapshot, kind: NotificationKind) -> String {
    let unit = lot.product.unit;
    match kind {
        NotificationKind::StockEmpty => format!("{} is out of stock", lot.product.name),
        _ => format!(
            "{} is running low: {} {} left (minimum {} {})",
            lot.product.name,
            lot.quantity.normalize(),
            unit,
            lot.min_threshold.normalize(),
            unit
        ),
    }
}

fn expiry_message(name: &str, days_left: i64) -> String {
    match days_left {
        0 => format!("{} expires today", name),
        1 => format!("{} expires tomorrow", name),
        -1 => format!("{} expired yesterday", name),
        d if d < 0 => format!("{} expired {} days ago", name, -d),
        d => format!("{} expires in {} days", name, d),
    }
}

// ============================================================================
// Read Set
// ============================================================================

/// Durable storage for acknowledged notification identifiers
pub trait ReadStore {
    type Error;

    fn load(&self) -> Result<HashSet<String>, Self::Error>;

    fn save(&self, read_set: &HashSet<String>) -> Result<(), Self::Error>;

    /// Replace the stored set with `f(current)`.
    ///
    /// Stores shared between threads override this to hold their lock across
    /// the read and the write.
    fn update<F>(&self, f: F) -> Result<HashSet<String>, Self::Error>
    where
        F: FnOnce(&HashSet<String>) -> HashSet<String>,
    {
        let next = f(&self.load()?);
        self.save(&next)?;
        Ok(next)
    }
}

/// Copy of `read_set` with `ids` added
pub fn with_read<'a>(
    read_set: &HashSet<String>,
    ids: impl IntoIterator<Item = &'a str>,
) -> HashSet<String> {
    let mut next = read_set.clone();
    next.extend(ids.into_iter().map(str::to_string));
    next
}

/// Acknowledge one notification
pub fn mark_read<S: ReadStore>(store: &S, id: &str) -> Result<HashSet<String>, S::Error> {
    store.update(|current| with_read(current, [id]))
}

/// Acknowledge every record in the list
pub fn mark_all_read<S: ReadStore>(
    store: &S,
    records: &[NotificationRecord],
) -> Result<HashSet<String>, S::Error> {
    store.update(|current| with_read(current, records.iter().map(|r| r.id.as_str())))
}

/// Process-local read set, swapped atomically on every change
#[derive(Debug, Default)]
pub struct InMemoryReadStore {
    ids: RwLock<Arc<HashSet<String>>>,
}

impl InMemoryReadStore {
    pub fn new(ids: HashSet<String>) -> Self {
        Self {
            ids: RwLock::new(Arc::new(ids)),
        }
    }

    /// Current set, shared without copying
    pub fn snapshot(&self) -> Arc<HashSet<String>> {
        match self.ids.read() {
            Ok(guard) => Arc::clone(&guard),
            Err(poisoned) => Arc::clone(&poisoned.into_inner()),
        }
    }
}

impl ReadStore for InMemoryReadStore {
    type Error = Infallible;

    fn load(&self) -> Result<HashSet<String>, Self::Error> {
        Ok(self.snapshot().as_ref().clone())
    }

    fn save(&self, read_set: &HashSet<String>) -> Result<(), Self::Error> {
        let mut guard = self.ids.write().unwrap_or_else(|p| p.into_inner());
        *guard = Arc::new(read_set.clone());
        Ok(())
    }

    fn update<F>(&self, f: F) -> Result<HashSet<String>, Self::Error>
    where
        F: FnOnce(&HashSet<String>) -> HashSet<String>,
    {
        let mut guard = self.ids.write().unwrap_or_else(|p| p.into_inner());
        let next = f(&**guard);
        *guard = Arc::new(next.clone());
        Ok(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ProductRef;
    use crate::types::Unit;
    use chrono::{Duration, NaiveDate, TimeZone};
    use uuid::Uuid;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 15, 10, 30, 0).unwrap()
    }

    fn lot(quantity: i64, threshold: i64, expiry: Option<NaiveDate>) -> StockLotSnapshot {
        StockLotSnapshot {
            id: Uuid::new_v4().to_string(),
            product_id: Uuid::new_v4(),
            quantity: Decimal::from(quantity),
            min_threshold: Decimal::from(threshold),
            expiry_date: expiry,
            product: ProductRef {
                name: "Crème fraîche".to_string(),
                unit: Unit::Liter,
            },
        }
    }

    fn in_days(days: i64) -> Option<NaiveDate> {
        Some((now() + Duration::days(days)).date_naive())
    }

    #[test]
    fn test_empty_stock_is_critical() {
        let lots = vec![lot(0, 5, None)];
        let records = classify(&lots, &HashSet::new(), now());

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].kind, NotificationKind::StockEmpty);
        assert_eq!(records[0].severity, Severity::Critical);
        assert_eq!(records[0].id, format!("stock_empty-{}", lots[0].id));
        assert!(records[0].unread);
    }

    #[test]
    fn test_low_stock_is_critical() {
        let lots = vec![lot(3, 5, None)];
        let records = classify(&lots, &HashSet::new(), now());

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].kind, NotificationKind::StockLow);
        assert_eq!(records[0].severity, Severity::Critical);
        assert_eq!(
            records[0].message,
            "Crème fraîche is running low: 3 L left (minimum 5 L)"
        );
    }

    #[test]
    fn test_stock_at_threshold_is_low() {
        let records = classify(&[lot(5, 5, None)], &HashSet::new(), now());
        assert_eq!(records[0].kind, NotificationKind::StockLow);
    }

    #[test]
    fn test_untracked_product_never_alerts_on_stock() {
        assert!(classify(&[lot(0, 0, None)], &HashSet::new(), now()).is_empty());
        assert!(classify(&[lot(6, 5, None)], &HashSet::new(), now()).is_empty());
    }

    #[test]
    fn test_expiry_bands() {
        let soon = classify(&[lot(10, 0, in_days(2))], &HashSet::new(), now());
        assert_eq!(soon[0].kind, NotificationKind::ExpiringSoon);
        assert_eq!(soon[0].severity, Severity::Critical);

        let later = classify(&[lot(10, 0, in_days(5))], &HashSet::new(), now());
        assert_eq!(later[0].kind, NotificationKind::ExpiringSoon);
        assert_eq!(later[0].severity, Severity::Warning);

        let past = classify(&[lot(10, 0, in_days(-1))], &HashSet::new(), now());
        assert_eq!(past[0].kind, NotificationKind::Expired);
        assert_eq!(past[0].severity, Severity::Critical);
        assert_eq!(past[0].message, "Crème fraîche expired yesterday");
    }

    #[test]
    fn test_days_until_expiry_ignores_time_of_day() {
        let late = Utc.with_ymd_and_hms(2024, 3, 15, 23, 59, 0).unwrap();
        let tomorrow = NaiveDate::from_ymd_opt(2024, 3, 16).unwrap();
        assert_eq!(days_until_expiry(tomorrow, late), 1);
        assert_eq!(days_until_expiry(tomorrow, now()), 1);
    }

    #[test]
    fn test_expiry_cutoffs() {
        assert_eq!(
            expiry_condition(0),
            Some((NotificationKind::Expired, Severity::Critical))
        );
        assert_eq!(
            expiry_condition(3),
            Some((NotificationKind::ExpiringSoon, Severity::Critical))
        );
        assert_eq!(
            expiry_condition(4),
            Some((NotificationKind::ExpiringSoon, Severity::Warning))
        );
        assert_eq!(
            expiry_condition(7),
            Some((NotificationKind::ExpiringSoon, Severity::Warning))
        );
        assert_eq!(expiry_condition(8), None);
    }

    #[test]
    fn test_one_lot_can_raise_stock_and_expiry() {
        let lots = vec![lot(0, 5, in_days(1))];
        let records = classify(&lots, &HashSet::new(), now());

        let kinds: Vec<_> = records.iter().map(|r| r.kind).collect();
        assert_eq!(kinds, vec![NotificationKind::StockEmpty, NotificationKind::ExpiringSoon]);
    }

    #[test]
    fn test_read_records_are_kept_but_flagged() {
        let lots = vec![lot(10, 0, in_days(-1))];
        let read: HashSet<String> = [format!("expired-{}", lots[0].id)].into_iter().collect();

        let records = classify(&lots, &read, now());
        assert_eq!(records.len(), 1);
        assert!(!records[0].unread);
        assert_eq!(unread_count(&records), 0);
    }

    #[test]
    fn test_store_ids_are_opaque() {
        let mut expired = lot(10, 0, in_days(-1));
        expired.id = "abc".to_string();
        let read: HashSet<String> = ["expired-abc".to_string()].into_iter().collect();

        let records = classify(&[expired], &read, now());

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].id, "expired-abc");
        assert_eq!(records[0].stock_lot_id, "abc");
        assert!(!records[0].unread);
    }

    #[test]
    fn test_sort_order() {
        let warning_unread = lot(10, 0, in_days(6));
        let critical_read = lot(1, 5, None);
        let critical_unread = lot(0, 5, None);
        let warning_read = lot(10, 0, in_days(7));
        let lots = vec![
            warning_unread.clone(),
            critical_read.clone(),
            critical_unread.clone(),
            warning_read.clone(),
        ];
        let read: HashSet<String> = [
            format!("stock_low-{}", critical_read.id),
            format!("expiring_soon-{}", warning_read.id),
        ]
        .into_iter()
        .collect();

        let order: Vec<String> = classify(&lots, &read, now())
            .into_iter()
            .map(|r| r.stock_lot_id)
            .collect();

        assert_eq!(
            order,
            vec![critical_unread.id, critical_read.id, warning_unread.id, warning_read.id]
        );
    }

    #[test]
    fn test_classify_is_idempotent() {
        let lots = vec![lot(0, 5, in_days(3)), lot(2, 5, None), lot(9, 5, in_days(-4))];
        let read = HashSet::new();
        assert_eq!(classify(&lots, &read, now()), classify(&lots, &read, now()));
    }

    #[test]
    fn test_mark_read_replaces_set() {
        let store = InMemoryReadStore::default();
        let before = store.snapshot();

        mark_read(&store, "expired-abc").unwrap();

        assert!(before.is_empty());
        assert!(store.snapshot().contains("expired-abc"));
    }

    #[test]
    fn test_mark_all_read() {
        let lots = vec![lot(0, 5, None), lot(10, 0, in_days(2))];
        let store = InMemoryReadStore::default();
        let records = classify(&lots, &store.load().unwrap(), now());
        assert_eq!(unread_count(&records), 2);

        mark_all_read(&store, &records).unwrap();

        let again = classify(&lots, &store.load().unwrap(), now());
        assert_eq!(unread_count(&again), 0);
    }

    #[test]
    fn test_concurrent_marks_are_not_lost() {
        let store = Arc::new(InMemoryReadStore::default());
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let store = Arc::clone(&store);
                std::thread::spawn(move || {
                    mark_read(store.as_ref(), &format!("stock_low-{}", i)).unwrap();
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(store.snapshot().len(), 8);
    }
}
