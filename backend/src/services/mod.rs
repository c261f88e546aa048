//! Business logic services for the Restaurant Stock Management Platform

pub mod menu;
pub mod notification;
pub mod product;
pub mod stock;

pub use menu::MenuService;
pub use notification::NotificationService;
pub use product::ProductService;
pub use stock::StockService;
