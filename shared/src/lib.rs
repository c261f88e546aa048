//! Shared types and models for the Restaurant Stock Management Platform
//!
//! This crate contains the domain models and the pure routines shared between
//! the backend, the browser (via WASM), and other components of the system:
//! menu costing, stock notification classification, and boundary narrowing of
//! loosely typed rows.

pub mod costing;
pub mod ingest;
pub mod models;
pub mod notifications;
pub mod types;
pub mod validation;

pub use costing::*;
pub use ingest::*;
pub use models::*;
pub use notifications::*;
pub use types::*;
pub use validation::*;
