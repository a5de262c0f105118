//! Storefront catalog routes.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    response::IntoResponse,
    routing::get,
};
use grocer_db::CatalogRepository;
use grocer_db::repositories::ProductFilter;
use grocer_shared::PageRequest;
use serde::Deserialize;
use uuid::Uuid;

use crate::{AppState, error::ApiError};

/// Creates the catalog routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/products", get(list_products))
        .route("/products/{product_id}", get(get_product))
        .route("/categories", get(list_categories))
}

/// Query parameters for listing products.
#[derive(Debug, Default, Deserialize)]
pub struct ListProductsQuery {
    /// Restrict to one category.
    pub category_id: Option<Uuid>,
    /// Case-insensitive substring of the item name.
    pub search: Option<String>,
    /// Include inactive and hidden products.
    #[serde(default)]
    pub show_all: bool,
    /// Merge this franchise's prices and stock.
    pub franchise_id: Option<Uuid>,
    /// Page number (1-indexed).
    pub page: Option<u32>,
    /// Page size (default 20, max 100).
    pub per_page: Option<u32>,
}

impl ListProductsQuery {
    fn page_request(&self) -> PageRequest {
        let defaults = PageRequest::default();
        PageRequest {
            page: self.page.unwrap_or(defaults.page),
            per_page: self.per_page.unwrap_or(defaults.per_page),
        }
    }

    fn filter(self) -> ProductFilter {
        ProductFilter {
            category_id: self.category_id,
            search: self.search.filter(|s| !s.trim().is_empty()),
            show_all: self.show_all,
            franchise_id: self.franchise_id,
        }
    }
}

/// Query parameters for a single product.
#[derive(Debug, Deserialize)]
pub struct GetProductQuery {
    /// Merge this franchise's price and stock.
    pub franchise_id: Option<Uuid>,
    /// Return the product even when hidden.
    #[serde(default)]
    pub show_all: bool,
}

/// GET /products - Paginated storefront listing.
async fn list_products(
    State(state): State<AppState>,
    Query(query): Query<ListProductsQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let page = query.page_request();
    let catalog = CatalogRepository::new((*state.db).clone());
    let products = catalog.list_products(&query.filter(), page).await?;
    Ok(Json(products))
}

/// GET `/products/{product_id}` - One storefront product with images.
async fn get_product(
    State(state): State<AppState>,
    Path(product_id): Path<Uuid>,
    Query(query): Query<GetProductQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let catalog = CatalogRepository::new((*state.db).clone());
    catalog
        .get_storefront_product(product_id, query.franchise_id, query.show_all)
        .await?
        .map(Json)
        .ok_or_else(|| {
            ApiError::not_found("product_not_found", format!("Product not found: {product_id}"))
        })
}

/// GET /categories - Categories with their subcategories.
async fn list_categories(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let catalog = CatalogRepository::new((*state.db).clone());
    Ok(Json(catalog.list_categories().await?))
}
