//! Import engine.
//!
//! Rows are prepared with bounded parallelism into in-memory drafts; nothing
//! is written until every row is prepared. Writes then run in a fixed order:
//! new products, franchise links, updates, images, delete-missing.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::NaiveDate;
use futures::stream::{self, StreamExt};
use grocer_shared::ImportConfig;
use rust_decimal::Decimal;
use serde_json::Value;
use tokio::sync::Semaphore;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::diff::{ImageDiff, fields_changed};
use super::error::{ImportError, RowFailure};
use super::parse::{parse_date, parse_image_urls};
use super::progress;
use super::repository::ImportRepository;
use super::types::{
    CategoryIndex, ExistingProduct, FranchiseLink, ImageRemoval, ImportRow, NewImage,
    ProductUpdate,
};
use crate::catalog::{DietaryFlags, ProductContent, ProductDraft, ProductStatus};
use crate::jobs::{BatchJob, JobRegistry, JobStatus, RowError};
use crate::storage::{ImageStore, StorageError};

/// Runs product imports against a repository and an image store.
pub struct ImportEngine<R, S> {
    repo: Arc<R>,
    store: Arc<S>,
    config: ImportConfig,
}

/// Catalog state loaded once per job.
struct Catalog {
    categories: CategoryIndex,
    products: HashMap<Uuid, ExistingProduct>,
    sku_index: HashMap<String, Uuid>,
    franchises: HashSet<Uuid>,
}

/// A submitted image and the stored URL it resolves to.
struct DesiredImage {
    source: String,
    url: String,
}

/// Image changes for one row, diffed on resolved URLs.
struct ImagePlan {
    desired: Vec<DesiredImage>,
    diff: ImageDiff,
    changed: bool,
}

struct PreparedRow {
    row: usize,
    label: String,
    draft: ProductDraft,
    is_new: bool,
    fields_changed: bool,
    sets_stock_qty: bool,
    sets_reorder_level: bool,
    images: Option<ImagePlan>,
    franchise_ids: Vec<Uuid>,
}

impl PreparedRow {
    fn images_changed(&self) -> bool {
        self.images.as_ref().is_some_and(|plan| plan.changed)
    }
}

enum RowOutcome {
    Prepared(Box<PreparedRow>),
    Skipped(usize),
    Failed {
        row: usize,
        label: String,
        failure: RowFailure,
        matched: Option<Uuid>,
    },
}

impl RowOutcome {
    const fn row(&self) -> usize {
        match self {
            Self::Prepared(prepared) => prepared.row,
            Self::Skipped(row) | Self::Failed { row, .. } => *row,
        }
    }
}

/// Prepared rows plus the ids delete-missing must leave alone.
struct Settled {
    rows: Vec<PreparedRow>,
    protected: HashSet<Uuid>,
}

impl<R, S> ImportEngine<R, S>
where
    R: ImportRepository + 'static,
    S: ImageStore + 'static,
{
    /// Create a new import engine.
    #[must_use]
    pub fn new(repo: Arc<R>, store: Arc<S>, config: ImportConfig) -> Self {
        Self {
            repo,
            store,
            config,
        }
    }

    /// Registers a job and processes it on a background task.
    ///
    /// Returns immediately with the queued job.
    pub fn submit(
        self: &Arc<Self>,
        registry: &JobRegistry,
        rows: Vec<Value>,
        delete_missing: bool,
    ) -> Arc<BatchJob> {
        let job = registry.create(rows.len());
        let engine = Arc::clone(self);
        let task_job = Arc::clone(&job);
        tokio::spawn(async move {
            engine.run(task_job, rows, delete_missing).await;
        });
        job
    }

    /// Processes a job to completion, marking it completed or failed.
    pub async fn run(&self, job: Arc<BatchJob>, rows: Vec<Value>, delete_missing: bool) {
        job.set_processing();
        info!(job_id = %job.id(), total = job.total(), delete_missing, "batch import started");

        match self.execute(&job, rows, delete_missing).await {
            Ok(()) => {
                job.complete(JobStatus::Completed);
                let summary = job.snapshot();
                info!(
                    job_id = %summary.id,
                    created = summary.created,
                    updated = summary.updated,
                    deleted = summary.deleted,
                    failed = summary.failed,
                    "batch import completed"
                );
            }
            Err(e) => {
                error!(job_id = %job.id(), error = %e, "batch import failed");
                job.complete(JobStatus::Failed);
            }
        }
    }

    async fn execute(
        &self,
        job: &BatchJob,
        rows: Vec<Value>,
        delete_missing: bool,
    ) -> Result<(), ImportError> {
        let catalog = self.load_catalog().await?;
        let total = rows.len();

        let mut outcomes = Vec::with_capacity(total);
        {
            let mut prepared = stream::iter(rows.into_iter().enumerate())
                .map(|(index, row)| self.prepare_row(index, row, &catalog))
                .buffer_unordered(self.config.prepare_concurrency.max(1));
            while let Some(outcome) = prepared.next().await {
                outcomes.push(outcome);
                job.set_progress(progress::preparing(outcomes.len(), total));
            }
        }
        outcomes.sort_by_key(RowOutcome::row);
        let settled = settle(job, outcomes, &catalog);

        self.insert_new(job, &settled.rows).await?;
        job.set_progress(progress::INSERTED);

        self.link_franchises(&settled.rows, &catalog.franchises).await?;

        self.update_existing(job, &settled.rows).await?;
        job.set_progress(progress::UPDATED);

        self.sync_images(job, &settled.rows).await?;
        job.set_progress(progress::IMAGES_DONE);

        if delete_missing {
            self.delete_missing(job, &catalog, &settled.protected).await?;
        }
        Ok(())
    }

    async fn load_catalog(&self) -> Result<Catalog, ImportError> {
        let categories = self.repo.load_categories().await?;
        let franchises = self.repo.load_franchise_ids().await?;
        let existing = self.repo.load_products().await?;

        let sku_index = existing
            .iter()
            .map(|p| (p.draft.content.sku.clone(), p.draft.id))
            .collect();
        let products = existing.into_iter().map(|p| (p.draft.id, p)).collect();

        Ok(Catalog {
            categories,
            products,
            sku_index,
            franchises,
        })
    }

    async fn prepare_row(&self, index: usize, raw: Value, catalog: &Catalog) -> RowOutcome {
        let fallback = ImportRow::raw_label(&raw, index);
        let row = match ImportRow::from_value(raw) {
            Ok(row) => row,
            Err(failure) => {
                return RowOutcome::Failed {
                    row: index,
                    label: fallback,
                    failure,
                    matched: None,
                };
            }
        };
        let label = row.label(index);
        if row.delete {
            debug!(row = index, product = %label, "row marked for deletion, skipped");
            return RowOutcome::Skipped(index);
        }

        let existing = match resolve_target(&row, catalog) {
            Ok(existing) => existing,
            Err(failure) => {
                return RowOutcome::Failed {
                    row: index,
                    label,
                    failure,
                    matched: None,
                };
            }
        };
        let matched = existing.map(|product| product.draft.id);

        let sku = match non_blank(row.sku.as_deref()) {
            Some(sku) => sku.to_string(),
            None => match existing {
                Some(product) => product.draft.content.sku.clone(),
                None => self.repo.next_sku().await,
            },
        };

        let current = existing.map(|product| &product.draft.content);
        let content = match build_content(&row, current, sku, &catalog.categories, index) {
            Ok(content) => content,
            Err(failure) => {
                return RowOutcome::Failed {
                    row: index,
                    label,
                    failure,
                    matched,
                };
            }
        };

        let id = matched.unwrap_or_else(Uuid::new_v4);
        let prepared = PreparedRow {
            row: index,
            is_new: existing.is_none(),
            fields_changed: current.is_none_or(|before| fields_changed(before, &content)),
            sets_stock_qty: row.stock_qty.is_some(),
            sets_reorder_level: row.reorder_level.is_some(),
            images: plan_images(&row, existing, id, self.store.as_ref()),
            franchise_ids: parse_franchise_ids(&row.franchise_ids, index),
            draft: ProductDraft { id, content },
            label,
        };
        RowOutcome::Prepared(Box::new(prepared))
    }

    fn batch_size(&self) -> usize {
        self.config.insert_batch_size.max(1)
    }

    async fn insert_new(&self, job: &BatchJob, rows: &[PreparedRow]) -> Result<(), ImportError> {
        let drafts: Vec<ProductDraft> = rows
            .iter()
            .filter(|row| row.is_new)
            .map(|row| row.draft.clone())
            .collect();

        for chunk in drafts.chunks(self.batch_size()) {
            self.repo.insert_products(chunk).await?;
            job.add_created(chunk.len());
        }
        Ok(())
    }

    async fn link_franchises(
        &self,
        rows: &[PreparedRow],
        known: &HashSet<Uuid>,
    ) -> Result<(), ImportError> {
        let mut links = Vec::new();
        for row in rows {
            for franchise_id in &row.franchise_ids {
                if known.contains(franchise_id) {
                    links.push(FranchiseLink {
                        franchise_id: *franchise_id,
                        product_id: row.draft.id,
                    });
                } else {
                    warn!(row = row.row, %franchise_id, "unknown franchise, link skipped");
                }
            }
        }

        let mut created = 0;
        for chunk in links.chunks(self.batch_size()) {
            created += self.repo.link_franchises(chunk).await?;
        }
        if created > 0 {
            debug!(created, "franchise products linked");
        }
        Ok(())
    }

    async fn update_existing(&self, job: &BatchJob, rows: &[PreparedRow]) -> Result<(), ImportError> {
        let changed: Vec<ProductUpdate> = rows
            .iter()
            .filter(|row| !row.is_new && row.fields_changed)
            .map(|row| ProductUpdate {
                draft: row.draft.clone(),
                set_stock_qty: row.sets_stock_qty,
                set_reorder_level: row.sets_reorder_level,
            })
            .collect();

        for chunk in changed.chunks(self.batch_size()) {
            self.repo.update_products(chunk).await?;
        }

        let updated = rows
            .iter()
            .filter(|row| !row.is_new && (row.fields_changed || row.images_changed()))
            .count();
        job.add_updated(updated);
        Ok(())
    }

    async fn sync_images(&self, job: &BatchJob, rows: &[PreparedRow]) -> Result<(), ImportError> {
        let plans: Vec<(&PreparedRow, &ImagePlan)> = rows
            .iter()
            .filter_map(|row| {
                row.images
                    .as_ref()
                    .filter(|plan| plan.changed)
                    .map(|plan| (row, plan))
            })
            .collect();
        if plans.is_empty() {
            return Ok(());
        }

        let removals: Vec<ImageRemoval> = plans
            .iter()
            .flat_map(|(row, plan)| {
                plan.diff.to_delete.iter().map(|url| ImageRemoval {
                    product_id: row.draft.id,
                    url: url.clone(),
                })
            })
            .collect();
        if !removals.is_empty() {
            let orphaned = self.repo.delete_images(&removals).await?;
            self.remove_objects(orphaned).await;
        }

        let mut hosted = Vec::new();
        let mut remote = Vec::new();
        for (row, plan) in &plans {
            for image in plan
                .desired
                .iter()
                .filter(|image| plan.diff.to_add.contains(&image.url))
            {
                if self.store.is_hosted(&image.source) {
                    hosted.push(NewImage {
                        product_id: row.draft.id,
                        url: image.url.clone(),
                    });
                } else {
                    remote.push((row.row, row.label.clone(), row.draft.id, image.source.clone()));
                }
            }
        }
        for chunk in hosted.chunks(self.batch_size()) {
            self.repo.insert_images(chunk).await?;
        }

        let uploaded = self.upload_remote(job, remote).await;
        let uploaded_rows: Vec<NewImage> = uploaded
            .iter()
            .map(|((product_id, _), url)| NewImage {
                product_id: *product_id,
                url: url.clone(),
            })
            .collect();
        for chunk in uploaded_rows.chunks(self.batch_size()) {
            self.repo.insert_images(chunk).await?;
        }

        let primaries: Vec<(Uuid, String)> = plans
            .iter()
            .filter_map(|(row, plan)| {
                plan.desired
                    .iter()
                    .find_map(|image| {
                        if plan.diff.keep.contains(&image.url) || self.store.is_hosted(&image.source) {
                            Some(image.url.clone())
                        } else {
                            uploaded
                                .iter()
                                .find(|((id, source), _)| *id == row.draft.id && *source == image.source)
                                .map(|(_, stored)| stored.clone())
                        }
                    })
                    .map(|url| (row.draft.id, url))
            })
            .collect();
        if !primaries.is_empty() {
            self.repo.set_primary_images(&primaries).await?;
        }
        Ok(())
    }

    /// Copies remote images into the store, at most `upload_concurrency` at a time.
    ///
    /// Results keep submission order. Failures are recorded on the job without
    /// failing their row.
    async fn upload_remote(
        &self,
        job: &BatchJob,
        remote: Vec<(usize, String, Uuid, String)>,
    ) -> Vec<((Uuid, String), String)> {
        let semaphore = Arc::new(Semaphore::new(self.config.upload_concurrency.max(1)));
        let mut handles = Vec::with_capacity(remote.len());

        for (row, label, product_id, source) in remote {
            let permit = Arc::clone(&semaphore).acquire_owned().await.ok();
            let store = Arc::clone(&self.store);
            handles.push(tokio::spawn(async move {
                let _permit = permit;
                let result = store.import_remote(&source, product_id).await;
                (row, label, product_id, source, result)
            }));
        }

        let mut uploaded = Vec::new();
        for handle in handles {
            match handle.await {
                Ok((_, _, product_id, source, Ok(url))) => uploaded.push(((product_id, source), url)),
                Ok((row, label, _, source, Err(e))) => {
                    warn!(job_id = %job.id(), row, source, error = %e, "image upload failed");
                    job.add_warning(RowError {
                        row,
                        product: label,
                        fields: format!("image_upload_failed: {source}: {e}"),
                    });
                }
                Err(e) => warn!(job_id = %job.id(), error = %e, "image upload task panicked"),
            }
        }
        uploaded
    }

    /// Deletes hosted objects, at most `delete_concurrency` at a time.
    async fn remove_objects(&self, urls: Vec<String>) {
        let hosted: Vec<String> = urls
            .into_iter()
            .filter(|url| self.store.is_hosted(url))
            .collect();

        let results: Vec<(String, Result<(), StorageError>)> = stream::iter(hosted)
            .map(|url| async move {
                let result = self.store.delete_url(&url).await;
                (url, result)
            })
            .buffer_unordered(self.config.delete_concurrency.max(1))
            .collect()
            .await;

        for (url, result) in results {
            if let Err(e) = result {
                warn!(url, error = %e, "failed to delete image object");
            }
        }
    }

    async fn delete_missing(
        &self,
        job: &BatchJob,
        catalog: &Catalog,
        protected: &HashSet<Uuid>,
    ) -> Result<(), ImportError> {
        let mut missing: Vec<Uuid> = catalog
            .products
            .keys()
            .filter(|id| !protected.contains(id))
            .copied()
            .collect();
        if missing.is_empty() {
            return Ok(());
        }
        missing.sort_unstable();

        let references = self.repo.count_order_references(&missing).await?;
        let (referenced, deletable): (Vec<Uuid>, Vec<Uuid>) = missing
            .into_iter()
            .partition(|id| references.get(id).copied().unwrap_or(0) > 0);
        for product_id in &referenced {
            warn!(job_id = %job.id(), %product_id, "product has orders, not deleted");
        }

        let total = deletable.len();
        let mut done = 0;
        for chunk in deletable.chunks(self.batch_size()) {
            let orphaned = self.repo.delete_products(chunk).await?;
            job.add_deleted(chunk.len());
            self.remove_objects(orphaned).await;
            done += chunk.len();
            job.set_progress(progress::deleting(done, total));
        }
        Ok(())
    }
}

/// Records failures and rejects rows that collide with an earlier row.
fn settle(job: &BatchJob, outcomes: Vec<RowOutcome>, catalog: &Catalog) -> Settled {
    let mut rows = Vec::with_capacity(outcomes.len());
    let mut protected = HashSet::new();
    let mut claimed_ids = HashSet::new();
    let mut claimed_skus = HashSet::new();

    for outcome in outcomes {
        match outcome {
            RowOutcome::Skipped(_) => {}
            RowOutcome::Failed {
                row,
                label,
                failure,
                matched,
            } => {
                protected.extend(matched);
                record_failure(job, row, label, &failure);
            }
            RowOutcome::Prepared(prepared) => {
                let id = prepared.draft.id;
                let sku = &prepared.draft.content.sku;
                let sku_taken = catalog.sku_index.get(sku).is_some_and(|owner| *owner != id);

                let conflict = if !claimed_ids.insert(id) {
                    Some(id.to_string())
                } else if sku_taken || !claimed_skus.insert(sku.clone()) {
                    Some(sku.clone())
                } else {
                    None
                };

                if !prepared.is_new {
                    protected.insert(id);
                }
                match conflict {
                    Some(key) => record_failure(
                        job,
                        prepared.row,
                        prepared.label.clone(),
                        &RowFailure::DuplicateInBatch(key),
                    ),
                    None => {
                        protected.insert(id);
                        rows.push(*prepared);
                    }
                }
            }
        }
    }

    Settled { rows, protected }
}

fn record_failure(job: &BatchJob, row: usize, label: String, failure: &RowFailure) {
    warn!(job_id = %job.id(), row, product = %label, error = %failure, "import row rejected");
    job.add_failure(RowError {
        row,
        product: label,
        fields: failure.to_string(),
    });
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|s| !s.is_empty())
}

/// Finds the product a row updates: by id first, then by SKU.
fn resolve_target<'a>(
    row: &ImportRow,
    catalog: &'a Catalog,
) -> Result<Option<&'a ExistingProduct>, RowFailure> {
    if let Some(raw) = non_blank(row.id.as_deref()) {
        let id = Uuid::parse_str(raw).map_err(|_| RowFailure::InvalidProductId(raw.to_string()))?;
        if let Some(product) = catalog.products.get(&id) {
            return Ok(Some(product));
        }
    }

    Ok(non_blank(row.sku.as_deref())
        .and_then(|sku| catalog.sku_index.get(sku))
        .and_then(|id| catalog.products.get(id)))
}

fn build_content(
    row: &ImportRow,
    current: Option<&ProductContent>,
    sku: String,
    categories: &CategoryIndex,
    index: usize,
) -> Result<ProductContent, RowFailure> {
    let category_id = match non_blank(row.category_id.as_deref()) {
        Some(raw) => {
            let id =
                Uuid::parse_str(raw).map_err(|_| RowFailure::InvalidCategoryId(raw.to_string()))?;
            if !categories.categories.contains(&id) {
                return Err(RowFailure::CategoryNotFound(raw.to_string()));
            }
            id
        }
        None => current
            .map(|c| c.category_id)
            .ok_or(RowFailure::MissingField("category_id"))?,
    };

    let subcategory_id = match non_blank(row.subcategory_id.as_deref()) {
        Some(raw) => Some(
            Uuid::parse_str(raw)
                .ok()
                .filter(|id| categories.subcategories.get(id) == Some(&category_id))
                .ok_or_else(|| RowFailure::SubcategoryNotFound(raw.to_string()))?,
        ),
        None => current
            .filter(|c| c.category_id == category_id)
            .and_then(|c| c.subcategory_id),
    };

    let item_name = non_blank(row.item_name.as_deref())
        .map(str::to_string)
        .or_else(|| current.map(|c| c.item_name.clone()))
        .ok_or(RowFailure::MissingField("item_name"))?;

    let retail_price = row
        .retail_price
        .or(current.map(|c| c.retail_price))
        .ok_or(RowFailure::MissingField("retail_price"))?;
    let cost_price = row
        .cost_price
        .or(current.map(|c| c.cost_price))
        .unwrap_or(Decimal::ZERO);
    let promotion_price = row
        .promotion_price
        .or(current.and_then(|c| c.promotion_price));
    let stock_qty = row.stock_qty.or(current.map(|c| c.stock_qty)).unwrap_or(0);
    let reorder_level = row
        .reorder_level
        .or(current.map(|c| c.reorder_level))
        .unwrap_or(0);

    for (field, negative) in [
        ("retail_price", retail_price.is_sign_negative() && !retail_price.is_zero()),
        ("cost_price", cost_price.is_sign_negative() && !cost_price.is_zero()),
        (
            "promotion_price",
            promotion_price.is_some_and(|p| p.is_sign_negative() && !p.is_zero()),
        ),
        ("stock_qty", stock_qty < 0),
        ("reorder_level", reorder_level < 0),
    ] {
        if negative {
            return Err(RowFailure::NegativeValue(field));
        }
    }

    let status = match non_blank(row.status.as_deref()) {
        Some(raw) => raw
            .parse::<ProductStatus>()
            .map_err(|_| RowFailure::InvalidStatus(raw.to_string()))?,
        None => current.map_or(ProductStatus::Active, |c| c.status),
    };

    let flag = |value: Option<bool>, stored: fn(&DietaryFlags) -> bool| {
        value
            .or_else(|| current.map(|c| stored(&c.dietary)))
            .unwrap_or(false)
    };
    let dietary = DietaryFlags {
        is_vegan: flag(row.is_vegan, |d| d.is_vegan),
        is_vegetarian: flag(row.is_vegetarian, |d| d.is_vegetarian),
        is_gluten_free: flag(row.is_gluten_free, |d| d.is_gluten_free),
        is_organic: flag(row.is_organic, |d| d.is_organic),
    };

    Ok(ProductContent {
        sku,
        item_name,
        description: non_blank(row.description.as_deref())
            .map(str::to_string)
            .or_else(|| current.and_then(|c| c.description.clone())),
        category_id,
        subcategory_id,
        cost_price,
        retail_price,
        promotion_price,
        promotion_start: date_field(
            row.promotion_start.as_deref(),
            current.and_then(|c| c.promotion_start),
            "promotion_start",
            index,
        ),
        promotion_end: date_field(
            row.promotion_end.as_deref(),
            current.and_then(|c| c.promotion_end),
            "promotion_end",
            index,
        ),
        stock_qty,
        reorder_level,
        shelf_location: non_blank(row.shelf_location.as_deref())
            .map(str::to_string)
            .or_else(|| current.and_then(|c| c.shelf_location.clone())),
        dietary,
        status,
        online_visible: row
            .online_visible
            .or(current.map(|c| c.online_visible))
            .unwrap_or(true),
    })
}

/// Absent keeps the stored date; blank or malformed leaves it unset.
fn date_field(
    raw: Option<&str>,
    stored: Option<NaiveDate>,
    field: &'static str,
    row: usize,
) -> Option<NaiveDate> {
    let Some(raw) = raw else {
        return stored;
    };
    if raw.trim().is_empty() {
        return None;
    }
    let parsed = parse_date(raw);
    if parsed.is_none() {
        warn!(row, field, value = raw, "unparseable date left unset");
    }
    parsed
}

/// Resolves each submitted URL to the stored URL it ends up at, so an
/// unchanged remote image matches the copy uploaded by an earlier import.
fn plan_images<S: ImageStore>(
    row: &ImportRow,
    existing: Option<&ExistingProduct>,
    product_id: Uuid,
    store: &S,
) -> Option<ImagePlan> {
    if existing.is_some() && !row.images_provided {
        return None;
    }
    let desired: Vec<DesiredImage> = parse_image_urls(&row.image_urls)
        .into_iter()
        .map(|source| {
            let url = if store.is_hosted(&source) {
                source.clone()
            } else {
                store.hosted_url_for(&source, product_id)
            };
            DesiredImage { source, url }
        })
        .collect();
    let urls: Vec<String> = desired.iter().map(|image| image.url.clone()).collect();

    match existing {
        Some(product) => {
            let stored: Vec<String> = product.images.iter().map(|i| i.url.clone()).collect();
            let diff = ImageDiff::compute(&stored, &urls);
            let changed =
                diff.has_changes() || urls.first().map(String::as_str) != product.primary_url();
            Some(ImagePlan {
                desired,
                diff,
                changed,
            })
        }
        None if desired.is_empty() => None,
        None => Some(ImagePlan {
            diff: ImageDiff::compute(&[], &urls),
            desired,
            changed: true,
        }),
    }
}

fn parse_franchise_ids(raw: &[String], row: usize) -> Vec<Uuid> {
    raw.iter()
        .filter_map(|value| match Uuid::parse_str(value.trim()) {
            Ok(id) => Some(id),
            Err(_) => {
                warn!(row, value = %value, "invalid franchise id ignored");
                None
            }
        })
        .collect()
}
