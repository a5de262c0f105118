//! `SeaORM` implementation of the import engine's repository.

use std::collections::{HashMap, HashSet};

use chrono::Utc;
use grocer_core::catalog::ProductDraft;
use grocer_core::import::{
    CategoryIndex, ExistingImage, ExistingProduct, FranchiseLink, ImageRemoval, ImportError,
    ImportRepository, NewImage, ProductUpdate,
};
use sea_orm::sea_query::{Expr, OnConflict};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DbErr, EntityTrait,
    NotSet, QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};
use tracing::debug;
use uuid::Uuid;

use super::catalog::{next_sku_on, product_active_model, product_content, unreferenced_urls};
use crate::entities::{
    categories, franchise_products, franchises, order_items, product_images, products,
    subcategories,
};

/// Upper bound on ids bound into one `IN (...)` list.
const ID_CHUNK: usize = 1000;

/// Import repository backed by the catalog tables.
#[derive(Debug, Clone)]
pub struct SeaImportRepository {
    db: DatabaseConnection,
}

impl SeaImportRepository {
    /// Creates a new import repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

fn repo_error(e: DbErr) -> ImportError {
    ImportError::Repository(e.to_string())
}

/// Soft-deletes a product's live images, or only the one at `url`.
async fn soft_delete_images<C: ConnectionTrait>(
    conn: &C,
    product_id: Uuid,
    url: Option<&str>,
) -> Result<(), DbErr> {
    let mut update = product_images::Entity::update_many()
        .col_expr(product_images::Column::DeletedAt, Expr::value(Utc::now()))
        .col_expr(product_images::Column::IsPrimary, Expr::value(false))
        .filter(product_images::Column::ProductId.eq(product_id))
        .filter(product_images::Column::DeletedAt.is_null());
    if let Some(url) = url {
        update = update.filter(product_images::Column::ImageUrl.eq(url));
    }
    update.exec(conn).await?;
    Ok(())
}

impl ImportRepository for SeaImportRepository {
    async fn load_categories(&self) -> Result<CategoryIndex, ImportError> {
        let categories = categories::Entity::find()
            .select_only()
            .column(categories::Column::Id)
            .filter(categories::Column::DeletedAt.is_null())
            .into_tuple::<Uuid>()
            .all(&self.db)
            .await
            .map_err(repo_error)?;

        let subcategories = subcategories::Entity::find()
            .select_only()
            .column(subcategories::Column::Id)
            .column(subcategories::Column::CategoryId)
            .filter(subcategories::Column::DeletedAt.is_null())
            .into_tuple::<(Uuid, Uuid)>()
            .all(&self.db)
            .await
            .map_err(repo_error)?;

        Ok(CategoryIndex {
            categories: categories.into_iter().collect(),
            subcategories: subcategories.into_iter().collect(),
        })
    }

    async fn load_products(&self) -> Result<Vec<ExistingProduct>, ImportError> {
        let products = products::Entity::find()
            .filter(products::Column::DeletedAt.is_null())
            .order_by_asc(products::Column::CreatedAt)
            .all(&self.db)
            .await
            .map_err(repo_error)?;

        let mut images: HashMap<Uuid, Vec<ExistingImage>> = HashMap::new();
        for image in product_images::Entity::find()
            .filter(product_images::Column::DeletedAt.is_null())
            .order_by_desc(product_images::Column::IsPrimary)
            .order_by_asc(product_images::Column::CreatedAt)
            .order_by_asc(product_images::Column::Id)
            .all(&self.db)
            .await
            .map_err(repo_error)?
        {
            images.entry(image.product_id).or_default().push(ExistingImage {
                url: image.image_url,
                is_primary: image.is_primary,
            });
        }

        Ok(products
            .iter()
            .map(|product| ExistingProduct {
                draft: ProductDraft {
                    id: product.id,
                    content: product_content(product),
                },
                images: images.remove(&product.id).unwrap_or_default(),
            })
            .collect())
    }

    async fn load_franchise_ids(&self) -> Result<HashSet<Uuid>, ImportError> {
        let ids = franchises::Entity::find()
            .select_only()
            .column(franchises::Column::Id)
            .filter(franchises::Column::IsActive.eq(true))
            .filter(franchises::Column::DeletedAt.is_null())
            .into_tuple::<Uuid>()
            .all(&self.db)
            .await
            .map_err(repo_error)?;
        Ok(ids.into_iter().collect())
    }

    async fn next_sku(&self) -> String {
        next_sku_on(&self.db).await
    }

    async fn insert_products(&self, drafts: &[ProductDraft]) -> Result<(), ImportError> {
        if drafts.is_empty() {
            return Ok(());
        }
        products::Entity::insert_many(drafts.iter().map(product_active_model))
            .exec_without_returning(&self.db)
            .await
            .map_err(repo_error)?;
        debug!(count = drafts.len(), "products inserted");
        Ok(())
    }

    async fn update_products(&self, updates: &[ProductUpdate]) -> Result<(), ImportError> {
        if updates.is_empty() {
            return Ok(());
        }
        let txn = self.db.begin().await.map_err(repo_error)?;
        for update in updates {
            let mut model = product_active_model(&update.draft);
            model.created_at = NotSet;
            model.deleted_at = NotSet;
            if !update.set_stock_qty {
                model.stock_qty = NotSet;
            }
            if !update.set_reorder_level {
                model.reorder_level = NotSet;
            }
            model.update(&txn).await.map_err(repo_error)?;
        }
        txn.commit().await.map_err(repo_error)?;
        debug!(count = updates.len(), "products updated");
        Ok(())
    }

    async fn link_franchises(&self, links: &[FranchiseLink]) -> Result<u64, ImportError> {
        if links.is_empty() {
            return Ok(0);
        }

        let product_ids: HashSet<Uuid> = links.iter().map(|link| link.product_id).collect();
        let defaults: HashMap<Uuid, products::Model> = products::Entity::find()
            .filter(products::Column::Id.is_in(product_ids))
            .all(&self.db)
            .await
            .map_err(repo_error)?
            .into_iter()
            .map(|product| (product.id, product))
            .collect();

        let now = Utc::now();
        let rows: Vec<franchise_products::ActiveModel> = links
            .iter()
            .filter_map(|link| {
                let product = defaults.get(&link.product_id)?;
                Some(franchise_products::ActiveModel {
                    id: Set(Uuid::new_v4()),
                    franchise_id: Set(link.franchise_id),
                    product_id: Set(link.product_id),
                    retail_price_override: Set(None),
                    promotion_price_override: Set(None),
                    stock_qty: Set(product.stock_qty),
                    reorder_level: Set(product.reorder_level),
                    shelf_location: Set(product.shelf_location.clone()),
                    is_available: Set(true),
                    created_at: Set(now.into()),
                    updated_at: Set(now.into()),
                })
            })
            .collect();
        if rows.is_empty() {
            return Ok(0);
        }

        franchise_products::Entity::insert_many(rows)
            .on_conflict(
                OnConflict::columns([
                    franchise_products::Column::FranchiseId,
                    franchise_products::Column::ProductId,
                ])
                .do_nothing()
                .to_owned(),
            )
            .exec_without_returning(&self.db)
            .await
            .map_err(repo_error)
    }

    async fn delete_images(&self, removals: &[ImageRemoval]) -> Result<Vec<String>, ImportError> {
        if removals.is_empty() {
            return Ok(Vec::new());
        }
        let txn = self.db.begin().await.map_err(repo_error)?;
        for removal in removals {
            soft_delete_images(&txn, removal.product_id, Some(&removal.url))
                .await
                .map_err(repo_error)?;
        }
        let urls: Vec<String> = removals.iter().map(|r| r.url.clone()).collect();
        let orphaned = unreferenced_urls(&txn, &urls).await.map_err(repo_error)?;
        txn.commit().await.map_err(repo_error)?;
        Ok(orphaned)
    }

    async fn insert_images(&self, images: &[NewImage]) -> Result<(), ImportError> {
        if images.is_empty() {
            return Ok(());
        }
        let now = Utc::now();
        product_images::Entity::insert_many(images.iter().map(|image| {
            product_images::ActiveModel {
                id: Set(Uuid::new_v4()),
                product_id: Set(image.product_id),
                image_url: Set(image.url.clone()),
                is_primary: Set(false),
                created_at: Set(now.into()),
                deleted_at: Set(None),
            }
        }))
        .exec_without_returning(&self.db)
        .await
        .map_err(repo_error)?;
        Ok(())
    }

    async fn set_primary_images(&self, primaries: &[(Uuid, String)]) -> Result<(), ImportError> {
        if primaries.is_empty() {
            return Ok(());
        }
        let txn = self.db.begin().await.map_err(repo_error)?;
        for (product_id, url) in primaries {
            product_images::Entity::update_many()
                .col_expr(product_images::Column::IsPrimary, Expr::value(false))
                .filter(product_images::Column::ProductId.eq(*product_id))
                .filter(product_images::Column::IsPrimary.eq(true))
                .exec(&txn)
                .await
                .map_err(repo_error)?;

            let target = product_images::Entity::find()
                .select_only()
                .column(product_images::Column::Id)
                .filter(product_images::Column::ProductId.eq(*product_id))
                .filter(product_images::Column::ImageUrl.eq(url.as_str()))
                .filter(product_images::Column::DeletedAt.is_null())
                .order_by_asc(product_images::Column::CreatedAt)
                .into_tuple::<Uuid>()
                .one(&txn)
                .await
                .map_err(repo_error)?;
            if let Some(image_id) = target {
                product_images::Entity::update_many()
                    .col_expr(product_images::Column::IsPrimary, Expr::value(true))
                    .filter(product_images::Column::Id.eq(image_id))
                    .exec(&txn)
                    .await
                    .map_err(repo_error)?;
            }
        }
        txn.commit().await.map_err(repo_error)?;
        Ok(())
    }

    async fn count_order_references(
        &self,
        product_ids: &[Uuid],
    ) -> Result<HashMap<Uuid, u64>, ImportError> {
        let mut counts = HashMap::new();
        for chunk in product_ids.chunks(ID_CHUNK) {
            let rows = order_items::Entity::find()
                .select_only()
                .column(order_items::Column::ProductId)
                .column_as(Expr::col(order_items::Column::Id).count(), "refs")
                .filter(order_items::Column::ProductId.is_in(chunk.iter().copied()))
                .group_by(order_items::Column::ProductId)
                .into_tuple::<(Uuid, i64)>()
                .all(&self.db)
                .await
                .map_err(repo_error)?;
            counts.extend(
                rows.into_iter()
                    .map(|(id, refs)| (id, u64::try_from(refs).unwrap_or_default())),
            );
        }
        Ok(counts)
    }

    async fn delete_products(&self, product_ids: &[Uuid]) -> Result<Vec<String>, ImportError> {
        if product_ids.is_empty() {
            return Ok(Vec::new());
        }
        let txn = self.db.begin().await.map_err(repo_error)?;
        let now = Utc::now();

        let urls: Vec<String> = product_images::Entity::find()
            .select_only()
            .column(product_images::Column::ImageUrl)
            .filter(product_images::Column::ProductId.is_in(product_ids.iter().copied()))
            .filter(product_images::Column::DeletedAt.is_null())
            .into_tuple::<String>()
            .all(&txn)
            .await
            .map_err(repo_error)?;

        for product_id in product_ids {
            soft_delete_images(&txn, *product_id, None)
                .await
                .map_err(repo_error)?;
        }

        products::Entity::update_many()
            .col_expr(products::Column::DeletedAt, Expr::value(now))
            .col_expr(products::Column::UpdatedAt, Expr::value(now))
            .filter(products::Column::Id.is_in(product_ids.iter().copied()))
            .filter(products::Column::DeletedAt.is_null())
            .exec(&txn)
            .await
            .map_err(repo_error)?;

        let orphaned = unreferenced_urls(&txn, &urls).await.map_err(repo_error)?;
        txn.commit().await.map_err(repo_error)?;
        debug!(count = product_ids.len(), orphaned = orphaned.len(), "products deleted");
        Ok(orphaned)
    }
}
