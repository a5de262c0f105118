//! Persistence seam for the import engine.

use std::collections::{HashMap, HashSet};
use std::future::Future;

use uuid::Uuid;

use super::error::ImportError;
use super::types::{
    CategoryIndex, ExistingProduct, FranchiseLink, ImageRemoval, NewImage, ProductUpdate,
};
use crate::catalog::ProductDraft;

/// Repository trait for import persistence.
///
/// This trait is implemented by the db crate to provide actual database operations.
pub trait ImportRepository: Send + Sync {
    /// Loads live categories and subcategories.
    fn load_categories(&self) -> impl Future<Output = Result<CategoryIndex, ImportError>> + Send;

    /// Loads every non-deleted product with its images.
    fn load_products(&self) -> impl Future<Output = Result<Vec<ExistingProduct>, ImportError>> + Send;

    /// Loads ids of all active franchises.
    fn load_franchise_ids(&self) -> impl Future<Output = Result<HashSet<Uuid>, ImportError>> + Send;

    /// Allocates a fresh unique SKU; never fails and never returns an empty string.
    fn next_sku(&self) -> impl Future<Output = String> + Send;

    /// Inserts new products.
    fn insert_products(
        &self,
        products: &[ProductDraft],
    ) -> impl Future<Output = Result<(), ImportError>> + Send;

    /// Overwrites existing products; stock counters only where flagged.
    fn update_products(
        &self,
        updates: &[ProductUpdate],
    ) -> impl Future<Output = Result<(), ImportError>> + Send;

    /// Creates missing franchise override rows; existing ones are left intact.
    ///
    /// Returns the number of rows created.
    fn link_franchises(
        &self,
        links: &[FranchiseLink],
    ) -> impl Future<Output = Result<u64, ImportError>> + Send;

    /// Deletes image rows and returns the URLs no order item references.
    fn delete_images(
        &self,
        removals: &[ImageRemoval],
    ) -> impl Future<Output = Result<Vec<String>, ImportError>> + Send;

    /// Inserts image rows as non-primary.
    fn insert_images(&self, images: &[NewImage])
    -> impl Future<Output = Result<(), ImportError>> + Send;

    /// Flags `(product_id, url)` as each product's only primary image.
    fn set_primary_images(
        &self,
        primaries: &[(Uuid, String)],
    ) -> impl Future<Output = Result<(), ImportError>> + Send;

    /// Counts order items per product.
    fn count_order_references(
        &self,
        product_ids: &[Uuid],
    ) -> impl Future<Output = Result<HashMap<Uuid, u64>, ImportError>> + Send;

    /// Removes image rows and soft-deletes products.
    ///
    /// Returns image URLs no order item references.
    fn delete_products(
        &self,
        product_ids: &[Uuid],
    ) -> impl Future<Output = Result<Vec<String>, ImportError>> + Send;
}
