//! Import row and repository value types.

use std::collections::{HashMap, HashSet};

use rust_decimal::Decimal;
use serde::Deserialize;
use uuid::Uuid;

use super::error::RowFailure;
use crate::catalog::ProductDraft;

/// One product row as submitted by an admin.
///
/// Every content field is optional: on update a missing field keeps the
/// stored value, on create it takes the catalog default.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ImportRow {
    /// Existing product id to update.
    pub id: Option<String>,
    /// SKU; matched against existing products when `id` is absent.
    pub sku: Option<String>,
    /// Display name.
    pub item_name: Option<String>,
    /// Long description.
    pub description: Option<String>,
    /// Category UUID.
    pub category_id: Option<String>,
    /// Subcategory UUID.
    pub subcategory_id: Option<String>,
    /// Purchase cost.
    pub cost_price: Option<Decimal>,
    /// Regular shelf price.
    pub retail_price: Option<Decimal>,
    /// Promotional price.
    pub promotion_price: Option<Decimal>,
    /// `YYYY-MM-DD`; unparseable values leave the field unset.
    pub promotion_start: Option<String>,
    /// `YYYY-MM-DD`; unparseable values leave the field unset.
    pub promotion_end: Option<String>,
    /// Units on hand.
    pub stock_qty: Option<i32>,
    /// Restock threshold.
    pub reorder_level: Option<i32>,
    /// Aisle/shelf code.
    pub shelf_location: Option<String>,
    /// Vegan label.
    pub is_vegan: Option<bool>,
    /// Vegetarian label.
    pub is_vegetarian: Option<bool>,
    /// Gluten-free label.
    pub is_gluten_free: Option<bool>,
    /// Organic label.
    pub is_organic: Option<bool>,
    /// `active` or `inactive`.
    pub status: Option<String>,
    /// Shown on the storefront.
    pub online_visible: Option<bool>,
    /// Array of URLs or a newline/comma separated string.
    #[serde(default)]
    pub image_urls: serde_json::Value,
    /// When false, an update leaves the stored images untouched.
    #[serde(default)]
    pub images_provided: bool,
    /// Franchises that should stock this product.
    #[serde(default)]
    pub franchise_ids: Vec<String>,
    /// Marks the row for removal; it is skipped here and left to delete-missing.
    #[serde(default)]
    pub delete: bool,
}

impl ImportRow {
    /// Decodes one submitted row.
    ///
    /// An `image_urls` key, even an empty one, marks the images as provided.
    ///
    /// # Errors
    ///
    /// Returns [`RowFailure::MalformedRow`] when a field has the wrong type.
    pub fn from_value(value: serde_json::Value) -> Result<Self, RowFailure> {
        let has_images = value.get("image_urls").is_some();
        let mut row: Self =
            serde_json::from_value(value).map_err(|e| RowFailure::MalformedRow(e.to_string()))?;
        row.images_provided |= has_images;
        Ok(row)
    }

    /// Name used for this row in error reports.
    #[must_use]
    pub fn label(&self, index: usize) -> String {
        pick_label([self.item_name.as_deref(), self.sku.as_deref()], index)
    }

    /// Like [`ImportRow::label`], for a row that may not decode.
    #[must_use]
    pub fn raw_label(value: &serde_json::Value, index: usize) -> String {
        let field = |key| value.get(key).and_then(serde_json::Value::as_str);
        pick_label([field("item_name"), field("sku")], index)
    }
}

fn pick_label(candidates: [Option<&str>; 2], index: usize) -> String {
    candidates
        .into_iter()
        .flatten()
        .map(str::trim)
        .find(|s| !s.is_empty())
        .map_or_else(|| format!("row {index}"), str::to_string)
}

/// An update to an existing product.
///
/// Stock counters are only written when the row supplied them, so an import
/// never rolls back stock sold since the snapshot was taken.
#[derive(Debug, Clone)]
pub struct ProductUpdate {
    /// New values.
    pub draft: ProductDraft,
    /// Write `stock_qty`.
    pub set_stock_qty: bool,
    /// Write `reorder_level`.
    pub set_reorder_level: bool,
}

/// Stored image of an existing product.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExistingImage {
    /// Public URL.
    pub url: String,
    /// Thumbnail flag.
    pub is_primary: bool,
}

/// A catalog product with its images, as loaded before an import.
#[derive(Debug, Clone)]
pub struct ExistingProduct {
    /// Current values.
    pub draft: ProductDraft,
    /// Current images.
    pub images: Vec<ExistingImage>,
}

impl ExistingProduct {
    /// URL of the primary image, or the first image when none is flagged.
    #[must_use]
    pub fn primary_url(&self) -> Option<&str> {
        self.images
            .iter()
            .find(|image| image.is_primary)
            .or_else(|| self.images.first())
            .map(|image| image.url.as_str())
    }
}

/// Known categories and the category each subcategory belongs to.
#[derive(Debug, Clone, Default)]
pub struct CategoryIndex {
    /// Live category ids.
    pub categories: HashSet<Uuid>,
    /// Subcategory id to parent category id.
    pub subcategories: HashMap<Uuid, Uuid>,
}

/// Franchise/product pair to stock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FranchiseLink {
    /// Franchise.
    pub franchise_id: Uuid,
    /// Product.
    pub product_id: Uuid,
}

/// Image row to insert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewImage {
    /// Owning product.
    pub product_id: Uuid,
    /// Public URL.
    pub url: String,
}

/// Image row to remove.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageRemoval {
    /// Owning product.
    pub product_id: Uuid,
    /// Public URL.
    pub url: String,
}
