//! HTTP handlers for product catalogue endpoints

use axum::{extract::State, Json};
use shared::{CreateProductInput, Product};

use crate::error::AppResult;
use crate::middleware::{require_permission, CurrentUser};
use crate::services::ProductService;
use crate::AppState;

/// List products
pub async fn list_products(
    State(state): State<AppState>,
    current_user: CurrentUser,
) -> AppResult<Json<Vec<Product>>> {
    let service = ProductService::new(state.db);
    let products = service.list_products(current_user.0.establishment_id).await?;
    Ok(Json(products))
}

/// Create a product
pub async fn create_product(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<CreateProductInput>,
) -> AppResult<Json<Product>> {
    require_permission(&current_user.0, "stock", "write")?;

    let service = ProductService::new(state.db);
    let product = service
        .create_product(current_user.0.establishment_id, input)
        .await?;
    Ok(Json(product))
}
