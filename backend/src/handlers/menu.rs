//! HTTP handlers for menu endpoints

use axum::{
    extract::{Path, State},
    Json,
};
use shared::{CreateMenuItemInput, MenuItemWithCosts};
use uuid::Uuid;

use crate::error::AppResult;
use crate::middleware::{require_permission, CurrentUser};
use crate::services::menu::{MenuItemDetail, MenuService};
use crate::AppState;

/// List active menu items with live costs
pub async fn list_menu_items(
    State(state): State<AppState>,
    current_user: CurrentUser,
) -> AppResult<Json<Vec<MenuItemWithCosts>>> {
    let service = MenuService::new(state.db);
    let items = service.list_items(current_user.0.establishment_id).await?;
    Ok(Json(items))
}

/// Get one menu item with its cost breakdown
pub async fn get_menu_item(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(item_id): Path<Uuid>,
) -> AppResult<Json<MenuItemDetail>> {
    let service = MenuService::new(state.db);
    let item = service
        .get_item(current_user.0.establishment_id, item_id)
        .await?;
    Ok(Json(item))
}

/// Create a menu item with its recipe
pub async fn create_menu_item(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<CreateMenuItemInput>,
) -> AppResult<Json<MenuItemDetail>> {
    require_permission(&current_user.0, "menu", "write")?;

    let service = MenuService::new(state.db);
    let item = service
        .create_item(current_user.0.establishment_id, input)
        .await?;
    Ok(Json(item))
}
