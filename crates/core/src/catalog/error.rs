//! Catalog errors.

use thiserror::Error;
use uuid::Uuid;

use crate::storage::StorageError;

/// Errors from catalog reads and writes.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// Product does not exist or was deleted.
    #[error("product not found: {0}")]
    ProductNotFound(Uuid),

    /// Category does not exist or was deleted.
    #[error("category not found: {0}")]
    CategoryNotFound(Uuid),

    /// Object store failure while removing images.
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// Underlying database failure.
    #[error("database error: {0}")]
    Database(String),
}
