//! Order pipeline errors.

use thiserror::Error;
use uuid::Uuid;

use super::status::OrderStatus;

/// Errors raised while placing or updating orders.
#[derive(Debug, Error)]
pub enum OrderError {
    /// Requested franchise does not exist or is inactive.
    #[error("franchise not found: {0}")]
    FranchiseNotFound(Uuid),

    /// No active franchise delivers to the customer's location.
    #[error("no franchise serves this location")]
    NoFranchiseServesLocation,

    /// The user's cart has no items.
    #[error("cart is empty")]
    EmptyCart,

    /// A stock row cannot cover the requested quantity.
    #[error("insufficient stock for {item_name}")]
    InsufficientStock {
        /// Product display name.
        item_name: String,
    },

    /// The status change is not in the adjacency table.
    #[error("cannot change order status from {from} to {to}")]
    InvalidTransition {
        /// Current status.
        from: OrderStatus,
        /// Requested status.
        to: OrderStatus,
    },

    /// Order does not exist or is not visible to the caller.
    #[error("order not found: {0}")]
    NotFound(Uuid),

    /// Caller may not act on this order.
    #[error("not allowed to modify this order")]
    Forbidden,

    /// Request is missing a required field or has a bad value.
    #[error("{0}")]
    Validation(String),

    /// Could not allocate a unique order number.
    #[error("could not allocate a unique order number")]
    OrderNumberExhausted,

    /// Underlying database failure.
    #[error("database error: {0}")]
    Database(String),
}

impl OrderError {
    /// Stable machine-readable code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::FranchiseNotFound(_) => "franchise_not_found",
            Self::NoFranchiseServesLocation => "no_franchise_serves_location",
            Self::EmptyCart => "empty_cart",
            Self::InsufficientStock { .. } => "insufficient_stock",
            Self::InvalidTransition { .. } => "invalid_transition",
            Self::NotFound(_) => "order_not_found",
            Self::Forbidden => "forbidden",
            Self::Validation(_) => "validation_error",
            Self::OrderNumberExhausted | Self::Database(_) => "internal_error",
        }
    }
}
