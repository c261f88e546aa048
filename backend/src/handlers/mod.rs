//! HTTP handlers for the Restaurant Stock Management Platform

mod health;
mod menu;
mod notification;
mod product;
mod stock;

pub use health::*;
pub use menu::*;
pub use notification::*;
pub use product::*;
pub use stock::*;
