//! Stock lot service for deliveries, adjustments and stock summaries

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use shared::{
    AdjustStockInput, ProductRef, RecordStockLotInput, StockLevel, StockLevelLine, StockLot,
    StockLotSnapshot, StockSummary, Unit,
};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::services::ProductService;

/// Stock service for managing stock lots
#[derive(Clone)]
pub struct StockService {
    db: PgPool,
}

/// Stock lot with its product and derived value
#[derive(Debug, Clone, Serialize)]
pub struct StockLotView {
    #[serde(flatten)]
    pub lot: StockLot,
    pub product_name: String,
    pub unit: Unit,
    pub min_threshold: Decimal,
    pub total_value: Decimal,
}

/// Row for stock lot queries
#[derive(Debug, FromRow)]
struct StockLotRow {
    id: Uuid,
    product_id: Uuid,
    quantity: Decimal,
    unit_price: Decimal,
    expiry_date: Option<NaiveDate>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<StockLotRow> for StockLot {
    fn from(row: StockLotRow) -> Self {
        StockLot {
            id: row.id,
            product_id: row.product_id,
            quantity: row.quantity,
            unit_price: row.unit_price,
            expiry_date: row.expiry_date,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Row for stock lots joined with their product
#[derive(Debug, FromRow)]
struct StockLotProductRow {
    id: Uuid,
    product_id: Uuid,
    quantity: Decimal,
    unit_price: Decimal,
    expiry_date: Option<NaiveDate>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    product_name: String,
    unit: String,
    min_stock_threshold: Decimal,
}

impl StockLotProductRow {
    fn unit(&self) -> Unit {
        Unit::from_code(&self.unit).unwrap_or(Unit::Piece)
    }

    fn into_view(self) -> StockLotView {
        let unit = self.unit();
        let lot = StockLot {
            id: self.id,
            product_id: self.product_id,
            quantity: self.quantity,
            unit_price: self.unit_price,
            expiry_date: self.expiry_date,
            created_at: self.created_at,
            updated_at: self.updated_at,
        };
        StockLotView {
            total_value: lot.total_value(),
            lot,
            product_name: self.product_name,
            unit,
            min_threshold: self.min_stock_threshold,
        }
    }

    fn into_snapshot(self) -> StockLotSnapshot {
        let unit = self.unit();
        StockLotSnapshot {
            id: self.id.to_string(),
            product_id: self.product_id,
            quantity: self.quantity,
            min_threshold: self.min_stock_threshold,
            expiry_date: self.expiry_date,
            product: ProductRef {
                name: self.product_name,
                unit,
            },
        }
    }
}

const ACTIVE_LOTS_QUERY: &str = r#"
    SELECT sl.id, sl.product_id, sl.quantity, sl.unit_price, sl.expiry_date, sl.created_at, sl.updated_at,
           p.name AS product_name, p.unit, p.min_stock_threshold
    FROM stock_lots sl
    JOIN products p ON p.id = sl.product_id
    WHERE sl.establishment_id = $1 AND sl.archived_at IS NULL
    ORDER BY p.name, sl.expiry_date NULLS LAST, sl.created_at
"#;

impl StockService {
    /// Create a new StockService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// List active lots with their derived value
    pub async fn list_lots(&self, establishment_id: Uuid) -> AppResult<Vec<StockLotView>> {
        let rows = sqlx::query_as::<_, StockLotProductRow>(ACTIVE_LOTS_QUERY)
            .bind(establishment_id)
            .fetch_all(&self.db)
            .await?;

        Ok(rows.into_iter().map(StockLotProductRow::into_view).collect())
    }

    /// Active lots in the shape the notification classifier consumes
    pub async fn snapshots(&self, establishment_id: Uuid) -> AppResult<Vec<StockLotSnapshot>> {
        let rows = sqlx::query_as::<_, StockLotProductRow>(ACTIVE_LOTS_QUERY)
            .bind(establishment_id)
            .fetch_all(&self.db)
            .await?;

        Ok(rows.into_iter().map(StockLotProductRow::into_snapshot).collect())
    }

    /// Every lot ever recorded, used to resolve latest purchase prices.
    /// Ordered so the newest purchase comes first.
    pub async fn price_history(&self, establishment_id: Uuid) -> AppResult<Vec<StockLot>> {
        let rows = sqlx::query_as::<_, StockLotRow>(
            r#"
            SELECT id, product_id, quantity, unit_price, expiry_date, created_at, updated_at
            FROM stock_lots
            WHERE establishment_id = $1
            ORDER BY created_at DESC, id DESC
            "#,
        )
        .bind(establishment_id)
        .fetch_all(&self.db)
        .await?;

        Ok(rows.into_iter().map(StockLot::from).collect())
    }

    /// Record a delivery or purchase as a new lot
    pub async fn record_lot(
        &self,
        establishment_id: Uuid,
        input: RecordStockLotInput,
    ) -> AppResult<StockLot> {
        input.validate()?;

        ProductService::new(self.db.clone())
            .ensure_owned(establishment_id, input.product_id)
            .await?;

        let row = sqlx::query_as::<_, StockLotRow>(
            r#"
            INSERT INTO stock_lots (establishment_id, product_id, quantity, unit_price, expiry_date)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, product_id, quantity, unit_price, expiry_date, created_at, updated_at
            "#,
        )
        .bind(establishment_id)
        .bind(input.product_id)
        .bind(input.quantity)
        .bind(input.unit_price)
        .bind(input.expiry_date)
        .fetch_one(&self.db)
        .await?;

        tracing::info!(stock_lot_id = %row.id, product_id = %row.product_id, "Stock lot recorded");

        Ok(row.into())
    }

    /// Set a lot's quantity and keep the adjustment in its history
    pub async fn adjust_lot(
        &self,
        establishment_id: Uuid,
        user_id: Uuid,
        lot_id: Uuid,
        input: AdjustStockInput,
    ) -> AppResult<StockLot> {
        input.validate()?;

        let mut tx = self.db.begin().await?;

        let previous = sqlx::query_scalar::<_, Decimal>(
            "SELECT quantity FROM stock_lots WHERE id = $1 AND establishment_id = $2 AND archived_at IS NULL FOR UPDATE",
        )
        .bind(lot_id)
        .bind(establishment_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound("Stock lot".to_string()))?;

        let row = sqlx::query_as::<_, StockLotRow>(
            r#"
            UPDATE stock_lots
            SET quantity = $1, updated_at = NOW()
            WHERE id = $2
            RETURNING id, product_id, quantity, unit_price, expiry_date, created_at, updated_at
            "#,
        )
        .bind(input.quantity)
        .bind(lot_id)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            INSERT INTO stock_adjustments (stock_lot_id, previous_quantity, new_quantity, reason, created_by)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(lot_id)
        .bind(previous)
        .bind(input.quantity)
        .bind(&input.reason)
        .bind(user_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        tracing::info!(
            stock_lot_id = %lot_id,
            previous = %previous,
            quantity = %input.quantity,
            "Stock lot adjusted"
        );

        Ok(row.into())
    }

    /// Total stock value and dashboard level bands
    pub async fn summary(&self, establishment_id: Uuid) -> AppResult<StockSummary> {
        let lots = self.list_lots(establishment_id).await?;
        Ok(summarize(lots))
    }
}

/// Fold lot views into the dashboard summary
pub fn summarize(lots: Vec<StockLotView>) -> StockSummary {
    let total_value = lots.iter().map(|l| l.total_value).sum();
    let lot_count = lots.len();
    let lines = lots
        .into_iter()
        .map(|view| StockLevelLine {
            stock_lot_id: view.lot.id,
            product_id: view.lot.product_id,
            level: StockLevel::classify(view.lot.quantity, view.min_threshold),
            quantity: view.lot.quantity,
            min_threshold: view.min_threshold,
            total_value: view.total_value,
            product_name: view.product_name,
        })
        .collect();

    StockSummary {
        total_value,
        lot_count,
        lines,
    }
}
