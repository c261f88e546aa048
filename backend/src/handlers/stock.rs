//! HTTP handlers for stock lot endpoints

use axum::{
    extract::{Path, State},
    Json,
};
use shared::{AdjustStockInput, RecordStockLotInput, StockLot, StockSummary};
use uuid::Uuid;

use crate::error::AppResult;
use crate::middleware::{require_permission, CurrentUser};
use crate::services::stock::{StockLotView, StockService};
use crate::AppState;

/// List active stock lots
pub async fn list_stock_lots(
    State(state): State<AppState>,
    current_user: CurrentUser,
) -> AppResult<Json<Vec<StockLotView>>> {
    let service = StockService::new(state.db);
    let lots = service.list_lots(current_user.0.establishment_id).await?;
    Ok(Json(lots))
}

/// Record a delivery as a new stock lot
pub async fn record_stock_lot(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<RecordStockLotInput>,
) -> AppResult<Json<StockLot>> {
    require_permission(&current_user.0, "stock", "write")?;

    let service = StockService::new(state.db);
    let lot = service
        .record_lot(current_user.0.establishment_id, input)
        .await?;
    Ok(Json(lot))
}

/// Adjust the quantity of a stock lot
pub async fn adjust_stock_lot(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(lot_id): Path<Uuid>,
    Json(input): Json<AdjustStockInput>,
) -> AppResult<Json<StockLot>> {
    require_permission(&current_user.0, "stock", "write")?;

    let service = StockService::new(state.db);
    let lot = service
        .adjust_lot(
            current_user.0.establishment_id,
            current_user.0.user_id,
            lot_id,
            input,
        )
        .await?;
    Ok(Json(lot))
}

/// Stock value and level summary for the dashboard
pub async fn get_stock_summary(
    State(state): State<AppState>,
    current_user: CurrentUser,
) -> AppResult<Json<StockSummary>> {
    let service = StockService::new(state.db);
    let summary = service.summary(current_user.0.establishment_id).await?;
    Ok(Json(summary))
}
