//! Domain models for the Restaurant Stock Management Platform

mod menu;
mod notification;
mod product;
mod stock;

pub use menu::*;
pub use notification::*;
pub use product::*;
pub use stock::*;
