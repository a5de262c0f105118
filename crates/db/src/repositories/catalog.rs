//! Catalog repository: products, franchise overrides, images, categories.

use std::collections::{HashMap, HashSet};

use chrono::{NaiveDate, Utc};
use grocer_core::catalog::{
    CatalogError, DietaryFlags, ProductContent, ProductDraft, ProductStatus, fallback_sku,
    format_sku,
};
use grocer_core::order::{PriceOverride, effective_price};
use grocer_core::storage::ImageStore;
use grocer_shared::{PageRequest, PageResponse};
use rust_decimal::Decimal;
use sea_orm::sea_query::{Expr, Func};
use sea_orm::{
    ColumnTrait, ConnectionTrait, DatabaseConnection, DbBackend, DbErr, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set, Statement, TransactionTrait,
};
use serde::Serialize;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::entities::{
    categories, franchise_products, order_items, product_images, products, subcategories,
};

/// Storefront listing filters.
#[derive(Debug, Clone, Default)]
pub struct ProductFilter {
    /// Restrict to one category.
    pub category_id: Option<Uuid>,
    /// Case-insensitive substring of `item_name`.
    pub search: Option<String>,
    /// Include products hidden from the storefront.
    pub show_all: bool,
    /// Merge this franchise's overrides into the results.
    pub franchise_id: Option<Uuid>,
}

/// Product image as shown to shoppers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImageView {
    /// Public URL.
    pub url: String,
    /// Thumbnail flag.
    pub is_primary: bool,
}

/// A product with franchise overrides applied.
#[derive(Debug, Clone, Serialize)]
pub struct StorefrontProduct {
    pub id: Uuid,
    pub sku: String,
    pub item_name: String,
    pub description: Option<String>,
    pub category_id: Uuid,
    pub subcategory_id: Option<Uuid>,
    pub retail_price: Decimal,
    pub promotion_price: Option<Decimal>,
    pub promotion_start: Option<NaiveDate>,
    pub promotion_end: Option<NaiveDate>,
    /// Price a customer pays today.
    pub price: Decimal,
    pub stock_qty: i32,
    pub reorder_level: i32,
    pub shelf_location: Option<String>,
    #[serde(flatten)]
    pub dietary: DietaryFlags,
    pub online_visible: bool,
    /// False when the franchise has switched the product off.
    pub is_available: bool,
    /// Franchise whose values were merged, if any.
    pub franchise_id: Option<Uuid>,
    pub images: Vec<ImageView>,
}

/// Category with its live subcategories.
#[derive(Debug, Clone, Serialize)]
pub struct CategoryWithSubcategories {
    #[serde(flatten)]
    pub category: categories::Model,
    pub subcategories: Vec<subcategories::Model>,
}

/// Reads a product row into the domain value.
pub(crate) fn product_content(model: &products::Model) -> ProductContent {
    ProductContent {
        sku: model.sku.clone(),
        item_name: model.item_name.clone(),
        description: model.description.clone(),
        category_id: model.category_id,
        subcategory_id: model.subcategory_id,
        cost_price: model.cost_price,
        retail_price: model.retail_price,
        promotion_price: model.promotion_price,
        promotion_start: model.promotion_start,
        promotion_end: model.promotion_end,
        stock_qty: model.stock_qty,
        reorder_level: model.reorder_level,
        shelf_location: model.shelf_location.clone(),
        dietary: DietaryFlags {
            is_vegan: model.is_vegan,
            is_vegetarian: model.is_vegetarian,
            is_gluten_free: model.is_gluten_free,
            is_organic: model.is_organic,
        },
        status: model.status.parse().unwrap_or(ProductStatus::Inactive),
        online_visible: model.online_visible,
    }
}

/// Builds a fully-set active model for insert or overwrite.
pub(crate) fn product_active_model(draft: &ProductDraft) -> products::ActiveModel {
    let now = Utc::now().into();
    let c = &draft.content;
    products::ActiveModel {
        id: Set(draft.id),
        sku: Set(c.sku.clone()),
        item_name: Set(c.item_name.clone()),
        description: Set(c.description.clone()),
        category_id: Set(c.category_id),
        subcategory_id: Set(c.subcategory_id),
        cost_price: Set(c.cost_price),
        retail_price: Set(c.retail_price),
        promotion_price: Set(c.promotion_price),
        promotion_start: Set(c.promotion_start),
        promotion_end: Set(c.promotion_end),
        stock_qty: Set(c.stock_qty),
        reorder_level: Set(c.reorder_level),
        shelf_location: Set(c.shelf_location.clone()),
        is_vegan: Set(c.dietary.is_vegan),
        is_vegetarian: Set(c.dietary.is_vegetarian),
        is_gluten_free: Set(c.dietary.is_gluten_free),
        is_organic: Set(c.dietary.is_organic),
        status: Set(c.status.as_str().to_string()),
        online_visible: Set(c.online_visible),
        created_at: Set(now),
        updated_at: Set(now),
        deleted_at: Set(None),
    }
}

/// Draws the next SKU from `product_sku_seq`, falling back to a clock-based one.
pub(crate) async fn next_sku_on<C: ConnectionTrait>(conn: &C) -> String {
    let stmt = Statement::from_string(
        DbBackend::Postgres,
        "SELECT nextval('product_sku_seq') AS seq",
    );
    let sequence = match conn.query_one(stmt).await {
        Ok(Some(row)) => row.try_get::<i64>("", "seq").map_err(|e| e.to_string()),
        Ok(None) => Err("sequence returned no row".to_string()),
        Err(e) => Err(e.to_string()),
    };
    match sequence {
        Ok(value) => format_sku(value),
        Err(error) => {
            warn!(%error, "sku sequence unavailable, using fallback");
            fallback_sku(Utc::now())
        }
    }
}

/// Returns the subset of `urls` that no order item and no live image row still uses.
pub(crate) async fn unreferenced_urls<C: ConnectionTrait>(
    conn: &C,
    urls: &[String],
) -> Result<Vec<String>, DbErr> {
    if urls.is_empty() {
        return Ok(Vec::new());
    }

    let ordered: HashSet<String> = order_items::Entity::find()
        .select_only()
        .column(order_items::Column::ImageUrl)
        .filter(order_items::Column::ImageUrl.is_in(urls.iter().cloned()))
        .into_tuple::<Option<String>>()
        .all(conn)
        .await?
        .into_iter()
        .flatten()
        .collect();

    let live: HashSet<String> = product_images::Entity::find()
        .select_only()
        .column(product_images::Column::ImageUrl)
        .filter(product_images::Column::ImageUrl.is_in(urls.iter().cloned()))
        .filter(product_images::Column::DeletedAt.is_null())
        .into_tuple::<String>()
        .all(conn)
        .await?
        .into_iter()
        .collect();

    let mut seen = HashSet::new();
    Ok(urls
        .iter()
        .filter(|url| !ordered.contains(*url) && !live.contains(*url))
        .filter(|url| seen.insert((*url).clone()))
        .cloned()
        .collect())
}

/// Live images for `product_ids`, primary first, then oldest first.
pub(crate) async fn load_images<C: ConnectionTrait>(
    conn: &C,
    product_ids: &[Uuid],
) -> Result<HashMap<Uuid, Vec<product_images::Model>>, DbErr> {
    if product_ids.is_empty() {
        return Ok(HashMap::new());
    }
    let rows = product_images::Entity::find()
        .filter(product_images::Column::ProductId.is_in(product_ids.iter().copied()))
        .filter(product_images::Column::DeletedAt.is_null())
        .order_by_desc(product_images::Column::IsPrimary)
        .order_by_asc(product_images::Column::CreatedAt)
        .order_by_asc(product_images::Column::Id)
        .all(conn)
        .await?;

    let mut grouped: HashMap<Uuid, Vec<product_images::Model>> = HashMap::new();
    for row in rows {
        grouped.entry(row.product_id).or_default().push(row);
    }
    Ok(grouped)
}

/// Applies a franchise override row on top of master values.
pub(crate) fn merge_override(
    product: &products::Model,
    franchise_id: Option<Uuid>,
    row: Option<&franchise_products::Model>,
    images: Vec<product_images::Model>,
    today: NaiveDate,
) -> StorefrontProduct {
    let content = product_content(product);
    let price_override = row.map(|r| PriceOverride {
        retail: r.retail_price_override,
        promotion: r.promotion_price_override,
    });
    let price = effective_price(&content.pricing(), price_override.as_ref(), today);

    StorefrontProduct {
        id: product.id,
        sku: content.sku,
        item_name: content.item_name,
        description: content.description,
        category_id: content.category_id,
        subcategory_id: content.subcategory_id,
        retail_price: row
            .and_then(|r| r.retail_price_override)
            .unwrap_or(content.retail_price),
        promotion_price: row
            .and_then(|r| r.promotion_price_override)
            .or(content.promotion_price),
        promotion_start: content.promotion_start,
        promotion_end: content.promotion_end,
        price,
        stock_qty: row.map_or(content.stock_qty, |r| r.stock_qty),
        reorder_level: row.map_or(content.reorder_level, |r| r.reorder_level),
        shelf_location: match row {
            Some(r) => r.shelf_location.clone(),
            None => content.shelf_location,
        },
        dietary: content.dietary,
        online_visible: content.online_visible,
        is_available: row.is_none_or(|r| r.is_available),
        franchise_id,
        images: images
            .into_iter()
            .map(|image| ImageView {
                url: image.image_url,
                is_primary: image.is_primary,
            })
            .collect(),
    }
}

fn escape_like(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len() + 2);
    escaped.push('%');
    for ch in raw.trim().to_lowercase().chars() {
        if matches!(ch, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped.push('%');
    escaped
}

/// Catalog repository.
#[derive(Debug, Clone)]
pub struct CatalogRepository {
    db: DatabaseConnection,
}

impl CatalogRepository {
    /// Creates a new catalog repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Finds a live product by id.
    pub async fn find_product_by_id(&self, id: Uuid) -> Result<Option<products::Model>, DbErr> {
        products::Entity::find_by_id(id)
            .filter(products::Column::DeletedAt.is_null())
            .one(&self.db)
            .await
    }

    /// Finds a live product by SKU.
    pub async fn find_by_sku(&self, sku: &str) -> Result<Option<products::Model>, DbErr> {
        products::Entity::find()
            .filter(products::Column::Sku.eq(sku))
            .filter(products::Column::DeletedAt.is_null())
            .one(&self.db)
            .await
    }

    /// Finds a franchise's override row for a product.
    pub async fn find_franchise_override(
        &self,
        franchise_id: Uuid,
        product_id: Uuid,
    ) -> Result<Option<franchise_products::Model>, DbErr> {
        franchise_products::Entity::find()
            .filter(franchise_products::Column::FranchiseId.eq(franchise_id))
            .filter(franchise_products::Column::ProductId.eq(product_id))
            .one(&self.db)
            .await
    }

    /// Allocates a unique SKU. Never fails.
    pub async fn next_sku(&self) -> String {
        next_sku_on(&self.db).await
    }

    /// Counts order items that froze `image_url`.
    pub async fn image_is_order_referenced(&self, image_url: &str) -> Result<u64, DbErr> {
        order_items::Entity::find()
            .filter(order_items::Column::ImageUrl.eq(image_url))
            .count(&self.db)
            .await
    }

    /// Soft-deletes a product and its images.
    ///
    /// Image objects are removed from the store only when no order item
    /// references them. Store failures are logged, never returned.
    pub async fn delete_product_cascade<S: ImageStore>(
        &self,
        product_id: Uuid,
        store: Option<&S>,
    ) -> Result<(), CatalogError> {
        let txn = self.db.begin().await.map_err(db_error)?;
        let now = Utc::now();

        let product = products::Entity::find_by_id(product_id)
            .filter(products::Column::DeletedAt.is_null())
            .one(&txn)
            .await
            .map_err(db_error)?
            .ok_or(CatalogError::ProductNotFound(product_id))?;

        let urls: Vec<String> = product_images::Entity::find()
            .select_only()
            .column(product_images::Column::ImageUrl)
            .filter(product_images::Column::ProductId.eq(product.id))
            .filter(product_images::Column::DeletedAt.is_null())
            .into_tuple::<String>()
            .all(&txn)
            .await
            .map_err(db_error)?;

        product_images::Entity::update_many()
            .col_expr(product_images::Column::DeletedAt, Expr::value(now))
            .col_expr(product_images::Column::IsPrimary, Expr::value(false))
            .filter(product_images::Column::ProductId.eq(product.id))
            .filter(product_images::Column::DeletedAt.is_null())
            .exec(&txn)
            .await
            .map_err(db_error)?;

        products::Entity::update_many()
            .col_expr(products::Column::DeletedAt, Expr::value(now))
            .col_expr(products::Column::UpdatedAt, Expr::value(now))
            .filter(products::Column::Id.eq(product.id))
            .exec(&txn)
            .await
            .map_err(db_error)?;

        let removable = unreferenced_urls(&txn, &urls).await.map_err(db_error)?;
        txn.commit().await.map_err(db_error)?;

        debug!(%product_id, images = urls.len(), removable = removable.len(), "product deleted");
        if let Some(store) = store {
            for url in removable.iter().filter(|url| store.is_hosted(url)) {
                if let Err(e) = store.delete_url(url).await {
                    warn!(%product_id, url, error = %e, "failed to delete image object");
                }
            }
        }
        Ok(())
    }

    /// Lists storefront products, newest first.
    pub async fn list_products(
        &self,
        filter: &ProductFilter,
        page: PageRequest,
    ) -> Result<PageResponse<StorefrontProduct>, DbErr> {
        let page = page.normalized();
        let mut query = products::Entity::find()
            .filter(products::Column::DeletedAt.is_null())
            .filter(products::Column::Status.eq(ProductStatus::Active.as_str()));
        if !filter.show_all {
            query = query.filter(products::Column::OnlineVisible.eq(true));
        }
        if let Some(category_id) = filter.category_id {
            query = query.filter(products::Column::CategoryId.eq(category_id));
        }
        if let Some(search) = filter.search.as_deref().filter(|s| !s.trim().is_empty()) {
            query = query.filter(
                Expr::expr(Func::lower(Expr::col((
                    products::Entity,
                    products::Column::ItemName,
                ))))
                .like(escape_like(search)),
            );
        }

        let total = query.clone().count(&self.db).await?;
        let rows = query
            .order_by_desc(products::Column::CreatedAt)
            .order_by_asc(products::Column::Id)
            .offset(page.offset())
            .limit(page.limit())
            .all(&self.db)
            .await?;

        let data = self.storefront_view(rows, filter.franchise_id).await?;
        Ok(PageResponse::new(data, page.page, page.per_page, total))
    }

    /// Loads one storefront product with the same visibility rules as the list.
    pub async fn get_storefront_product(
        &self,
        id: Uuid,
        franchise_id: Option<Uuid>,
        show_all: bool,
    ) -> Result<Option<StorefrontProduct>, DbErr> {
        let mut query = products::Entity::find_by_id(id)
            .filter(products::Column::DeletedAt.is_null())
            .filter(products::Column::Status.eq(ProductStatus::Active.as_str()));
        if !show_all {
            query = query.filter(products::Column::OnlineVisible.eq(true));
        }
        let Some(product) = query.one(&self.db).await? else {
            return Ok(None);
        };
        Ok(self
            .storefront_view(vec![product], franchise_id)
            .await?
            .into_iter()
            .next())
    }

    async fn storefront_view(
        &self,
        rows: Vec<products::Model>,
        franchise_id: Option<Uuid>,
    ) -> Result<Vec<StorefrontProduct>, DbErr> {
        let ids: Vec<Uuid> = rows.iter().map(|p| p.id).collect();
        let mut images = load_images(&self.db, &ids).await?;

        let overrides: HashMap<Uuid, franchise_products::Model> = match franchise_id {
            Some(franchise) if !ids.is_empty() => franchise_products::Entity::find()
                .filter(franchise_products::Column::FranchiseId.eq(franchise))
                .filter(franchise_products::Column::ProductId.is_in(ids.iter().copied()))
                .all(&self.db)
                .await?
                .into_iter()
                .map(|row| (row.product_id, row))
                .collect(),
            _ => HashMap::new(),
        };

        let today = Utc::now().date_naive();
        Ok(rows
            .iter()
            .map(|product| {
                merge_override(
                    product,
                    franchise_id,
                    overrides.get(&product.id),
                    images.remove(&product.id).unwrap_or_default(),
                    today,
                )
            })
            .collect())
    }

    /// Lists live categories with their subcategories.
    pub async fn list_categories(&self) -> Result<Vec<CategoryWithSubcategories>, DbErr> {
        let categories = categories::Entity::find()
            .filter(categories::Column::DeletedAt.is_null())
            .order_by_asc(categories::Column::Name)
            .all(&self.db)
            .await?;
        if categories.is_empty() {
            return Ok(Vec::new());
        }

        let mut children: HashMap<Uuid, Vec<subcategories::Model>> = HashMap::new();
        for sub in subcategories::Entity::find()
            .filter(subcategories::Column::CategoryId.is_in(categories.iter().map(|c| c.id)))
            .filter(subcategories::Column::DeletedAt.is_null())
            .order_by_asc(subcategories::Column::Name)
            .all(&self.db)
            .await?
        {
            children.entry(sub.category_id).or_default().push(sub);
        }

        Ok(categories
            .into_iter()
            .map(|category| CategoryWithSubcategories {
                subcategories: children.remove(&category.id).unwrap_or_default(),
                category,
            })
            .collect())
    }
}

fn db_error(e: DbErr) -> CatalogError {
    CatalogError::Database(e.to_string())
}
