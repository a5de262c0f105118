//! Product value types.

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::order::{ProductPricing, Promotion};

/// Catalog visibility status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProductStatus {
    /// Sellable.
    #[default]
    Active,
    /// Hidden from the storefront.
    Inactive,
}

impl ProductStatus {
    /// Returns the wire representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Inactive => "inactive",
        }
    }
}

impl fmt::Display for ProductStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProductStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "active" => Ok(Self::Active),
            "inactive" => Ok(Self::Inactive),
            other => Err(format!("unknown product status: {other}")),
        }
    }
}

/// Dietary labels printed on the shelf tag.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DietaryFlags {
    /// No animal products.
    pub is_vegan: bool,
    /// No meat or fish.
    pub is_vegetarian: bool,
    /// No gluten-containing ingredients.
    pub is_gluten_free: bool,
    /// Certified organic.
    pub is_organic: bool,
}

/// Every product field an import can change.
///
/// Two values compare equal exactly when an import row would be a no-op.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductContent {
    /// Unique stock-keeping unit.
    pub sku: String,
    /// Display name.
    pub item_name: String,
    /// Long description.
    pub description: Option<String>,
    /// Owning category.
    pub category_id: Uuid,
    /// Optional subcategory.
    pub subcategory_id: Option<Uuid>,
    /// Purchase cost.
    pub cost_price: Decimal,
    /// Regular shelf price.
    pub retail_price: Decimal,
    /// Promotional price.
    pub promotion_price: Option<Decimal>,
    /// First promotion day.
    pub promotion_start: Option<NaiveDate>,
    /// Last promotion day.
    pub promotion_end: Option<NaiveDate>,
    /// Units on hand in the master catalog.
    pub stock_qty: i32,
    /// Restock threshold.
    pub reorder_level: i32,
    /// Aisle/shelf code.
    pub shelf_location: Option<String>,
    /// Dietary labels.
    pub dietary: DietaryFlags,
    /// Catalog status.
    pub status: ProductStatus,
    /// Shown on the storefront.
    pub online_visible: bool,
}

impl ProductContent {
    /// Master pricing view of this content.
    #[must_use]
    pub fn pricing(&self) -> ProductPricing {
        ProductPricing {
            retail: self.retail_price,
            promotion: self.promotion_price.map(|price| Promotion {
                price,
                start: self.promotion_start,
                end: self.promotion_end,
            }),
        }
    }
}

/// A product value prepared in memory before it is written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductDraft {
    /// Existing id for updates, fresh id for creates.
    pub id: Uuid,
    /// Field values.
    pub content: ProductContent,
}
