//! Catalog domain types.
//!
//! This module provides:
//! - Product content and status types shared by reads and imports
//! - SKU formatting with a collision-resistant fallback
//! - Catalog errors

mod error;
pub mod sku;
mod types;

pub use error::CatalogError;
pub use sku::{fallback_sku, format_sku};
pub use types::{DietaryFlags, ProductContent, ProductDraft, ProductStatus};
