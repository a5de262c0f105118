//! Order domain logic.
//!
//! This module provides:
//! - The order status state machine
//! - Effective price resolution with franchise overrides
//! - Order totals, delivery fees, and loyalty points
//! - Nearest-franchise selection by great-circle distance
//! - Human-readable order numbers
//! - Per-role order visibility

pub mod access;
pub mod error;
pub mod geo;
pub mod number;
pub mod pricing;
pub mod status;

#[cfg(test)]
mod pricing_props;
#[cfg(test)]
mod status_props;

pub use access::{OrderActor, OrderScope};
pub use error::OrderError;
pub use geo::{FranchiseLocation, GeoPoint, haversine_km, select_nearest_franchise};
pub use number::generate_order_number;
pub use pricing::{
    DeliveryPolicy, OrderTotals, PriceOverride, ProductPricing, Promotion, compute_totals,
    effective_price,
};
pub use status::{OrderStatus, StockSource, is_valid_transition, transition_map};
