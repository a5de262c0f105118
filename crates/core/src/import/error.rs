//! Import errors.

use thiserror::Error;

use crate::storage::StorageError;

/// Job-level failures that abort an import.
#[derive(Debug, Error)]
pub enum ImportError {
    /// A bulk read or write failed.
    #[error("repository error: {0}")]
    Repository(String),

    /// Object store failure outside per-image handling.
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Reasons a single row is rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RowFailure {
    /// `id` is not a UUID.
    #[error("invalid_product_id: {0}")]
    InvalidProductId(String),

    /// `category_id` is not a UUID.
    #[error("invalid_category_id: {0}")]
    InvalidCategoryId(String),

    /// `category_id` does not name a live category.
    #[error("category_not_found: {0}")]
    CategoryNotFound(String),

    /// `subcategory_id` is malformed or not under the row's category.
    #[error("subcategory_not_found: {0}")]
    SubcategoryNotFound(String),

    /// A field needed to create a product is absent.
    #[error("missing_field: {0}")]
    MissingField(&'static str),

    /// A price or quantity is below zero.
    #[error("negative_value: {0}")]
    NegativeValue(&'static str),

    /// `status` is not `active` or `inactive`.
    #[error("invalid_status: {0}")]
    InvalidStatus(String),

    /// The row is not an object of correctly typed fields.
    #[error("invalid_row: {0}")]
    MalformedRow(String),

    /// Another row in the same batch already targets this product or SKU.
    #[error("duplicate_in_batch: {0}")]
    DuplicateInBatch(String),
}
