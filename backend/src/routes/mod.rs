//! Route definitions for the Restaurant Stock Management Platform

use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use crate::{handlers, middleware::auth_middleware, AppState};

/// Create API routes
pub fn api_routes(state: AppState) -> Router<AppState> {
    Router::new()
        // Protected routes - product catalogue
        .nest("/products", product_routes())
        // Protected routes - stock lots
        .nest("/stock", stock_routes())
        // Protected routes - menu and costing
        .nest("/menu", menu_routes())
        // Protected routes - derived stock alerts
        .nest("/notifications", notification_routes())
        .route_layer(middleware::from_fn_with_state(state, auth_middleware))
        // Health check (public)
        .route("/health", get(handlers::health_check))
}

/// Product catalogue routes (protected)
fn product_routes() -> Router<AppState> {
    Router::new().route(
        "/",
        get(handlers::list_products).post(handlers::create_product),
    )
}

/// Stock lot routes (protected)
fn stock_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(handlers::list_stock_lots).post(handlers::record_stock_lot),
        )
        .route("/summary", get(handlers::get_stock_summary))
        .route("/:lot_id/adjust", post(handlers::adjust_stock_lot))
}

/// Menu routes (protected)
fn menu_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(handlers::list_menu_items).post(handlers::create_menu_item),
        )
        .route("/:item_id", get(handlers::get_menu_item))
}

/// Notification routes (protected)
fn notification_routes() -> Router<AppState> {
    Router::new().route("/feed", post(handlers::get_notification_feed))
}
