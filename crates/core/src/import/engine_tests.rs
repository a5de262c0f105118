use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::NaiveDate;
use grocer_shared::ImportConfig;
use rust_decimal_macros::dec;
use serde_json::json;
use uuid::Uuid;

use super::*;
use crate::catalog::{DietaryFlags, ProductContent, ProductDraft, ProductStatus};
use crate::jobs::{JobRegistry, JobSnapshot, JobStatus};
use crate::storage::{ImageStore, StorageError};

const HOSTED: &str = "https://storage.googleapis.com/test-bucket/";

#[derive(Default)]
struct RepoState {
    categories: CategoryIndex,
    products: HashMap<Uuid, ExistingProduct>,
    franchises: HashSet<Uuid>,
    links: HashSet<FranchiseLink>,
    order_refs: HashMap<Uuid, u64>,
    referenced_urls: HashSet<String>,
    update_calls: usize,
    updates: Vec<(Uuid, bool, bool)>,
}

#[derive(Default)]
struct MockRepo {
    state: Mutex<RepoState>,
    sku_counter: AtomicU32,
    fail_updates: AtomicBool,
}

impl MockRepo {
    fn with_category(category: Uuid) -> Self {
        let repo = Self::default();
        repo.state.lock().unwrap().categories.categories.insert(category);
        repo
    }

    fn seed(&self, draft: ProductDraft, images: &[&str]) {
        let images = images
            .iter()
            .enumerate()
            .map(|(i, url)| ExistingImage {
                url: (*url).to_string(),
                is_primary: i == 0,
            })
            .collect();
        self.state
            .lock()
            .unwrap()
            .products
            .insert(draft.id, ExistingProduct { draft, images });
    }

    fn product(&self, id: Uuid) -> Option<ExistingProduct> {
        self.state.lock().unwrap().products.get(&id).cloned()
    }

    fn by_sku(&self, sku: &str) -> Option<ExistingProduct> {
        self.state
            .lock()
            .unwrap()
            .products
            .values()
            .find(|p| p.draft.content.sku == sku)
            .cloned()
    }

    fn image_urls(&self, id: Uuid) -> Vec<String> {
        self.product(id)
            .map(|p| p.images.into_iter().map(|i| i.url).collect())
            .unwrap_or_default()
    }

    fn unreferenced(state: &RepoState, urls: Vec<String>) -> Vec<String> {
        urls.into_iter()
            .filter(|url| !state.referenced_urls.contains(url))
            .collect()
    }
}

impl ImportRepository for MockRepo {
    async fn load_categories(&self) -> Result<CategoryIndex, ImportError> {
        Ok(self.state.lock().unwrap().categories.clone())
    }

    async fn load_products(&self) -> Result<Vec<ExistingProduct>, ImportError> {
        Ok(self.state.lock().unwrap().products.values().cloned().collect())
    }

    async fn load_franchise_ids(&self) -> Result<HashSet<Uuid>, ImportError> {
        Ok(self.state.lock().unwrap().franchises.clone())
    }

    async fn next_sku(&self) -> String {
        let n = self.sku_counter.fetch_add(1, Ordering::SeqCst) + 1;
        format!("SKU-{n:06}")
    }

    async fn insert_products(&self, products: &[ProductDraft]) -> Result<(), ImportError> {
        let mut state = self.state.lock().unwrap();
        for draft in products {
            state.products.insert(
                draft.id,
                ExistingProduct {
                    draft: draft.clone(),
                    images: Vec::new(),
                },
            );
        }
        Ok(())
    }

    async fn update_products(&self, updates: &[ProductUpdate]) -> Result<(), ImportError> {
        if self.fail_updates.load(Ordering::SeqCst) {
            return Err(ImportError::Repository("connection reset".into()));
        }
        let mut state = self.state.lock().unwrap();
        state.update_calls += 1;
        for update in updates {
            state
                .updates
                .push((update.draft.id, update.set_stock_qty, update.set_reorder_level));
            if let Some(existing) = state.products.get_mut(&update.draft.id) {
                let mut draft = update.draft.clone();
                if !update.set_stock_qty {
                    draft.content.stock_qty = existing.draft.content.stock_qty;
                }
                if !update.set_reorder_level {
                    draft.content.reorder_level = existing.draft.content.reorder_level;
                }
                existing.draft = draft;
            }
        }
        Ok(())
    }

    async fn link_franchises(&self, links: &[FranchiseLink]) -> Result<u64, ImportError> {
        let mut state = self.state.lock().unwrap();
        let before = state.links.len();
        state.links.extend(links.iter().copied());
        Ok(u64::try_from(state.links.len() - before).unwrap())
    }

    async fn delete_images(&self, removals: &[ImageRemoval]) -> Result<Vec<String>, ImportError> {
        let mut state = self.state.lock().unwrap();
        let mut removed = Vec::new();
        for removal in removals {
            if let Some(product) = state.products.get_mut(&removal.product_id) {
                product.images.retain(|image| image.url != removal.url);
                removed.push(removal.url.clone());
            }
        }
        Ok(Self::unreferenced(&state, removed))
    }

    async fn insert_images(&self, images: &[NewImage]) -> Result<(), ImportError> {
        let mut state = self.state.lock().unwrap();
        for image in images {
            if let Some(product) = state.products.get_mut(&image.product_id) {
                product.images.push(ExistingImage {
                    url: image.url.clone(),
                    is_primary: false,
                });
            }
        }
        Ok(())
    }

    async fn set_primary_images(&self, primaries: &[(Uuid, String)]) -> Result<(), ImportError> {
        let mut state = self.state.lock().unwrap();
        for (product_id, url) in primaries {
            if let Some(product) = state.products.get_mut(product_id) {
                for image in &mut product.images {
                    image.is_primary = image.url == *url;
                }
            }
        }
        Ok(())
    }

    async fn count_order_references(
        &self,
        product_ids: &[Uuid],
    ) -> Result<HashMap<Uuid, u64>, ImportError> {
        let state = self.state.lock().unwrap();
        Ok(product_ids
            .iter()
            .filter_map(|id| state.order_refs.get(id).map(|n| (*id, *n)))
            .collect())
    }

    async fn delete_products(&self, product_ids: &[Uuid]) -> Result<Vec<String>, ImportError> {
        let mut state = self.state.lock().unwrap();
        let mut urls = Vec::new();
        for id in product_ids {
            if let Some(product) = state.products.remove(id) {
                urls.extend(product.images.into_iter().map(|i| i.url));
            }
        }
        Ok(Self::unreferenced(&state, urls))
    }
}

#[derive(Default)]
struct MockStore {
    uploaded: Mutex<Vec<String>>,
    deleted: Mutex<Vec<String>>,
}

impl ImageStore for MockStore {
    fn is_hosted(&self, url: &str) -> bool {
        url.starts_with(HOSTED)
    }

    fn hosted_url_for(&self, source_url: &str, product_id: Uuid) -> String {
        let name = source_url.rsplit('/').next().unwrap_or("image.jpg");
        format!("{HOSTED}products/{product_id}/{name}")
    }

    async fn import_remote(&self, source_url: &str, product_id: Uuid) -> Result<String, StorageError> {
        if source_url.contains("broken") {
            return Err(StorageError::Download(format!("{source_url}: 404")));
        }
        self.uploaded.lock().unwrap().push(source_url.to_string());
        Ok(self.hosted_url_for(source_url, product_id))
    }

    async fn delete_url(&self, url: &str) -> Result<(), StorageError> {
        self.deleted.lock().unwrap().push(url.to_string());
        Ok(())
    }
}

fn content(sku: &str, name: &str, category: Uuid) -> ProductContent {
    ProductContent {
        sku: sku.to_string(),
        item_name: name.to_string(),
        description: None,
        category_id: category,
        subcategory_id: None,
        cost_price: dec!(1.00),
        retail_price: dec!(2.50),
        promotion_price: None,
        promotion_start: None,
        promotion_end: None,
        stock_qty: 10,
        reorder_level: 2,
        shelf_location: None,
        dietary: DietaryFlags::default(),
        status: ProductStatus::Active,
        online_visible: true,
    }
}

fn draft(sku: &str, name: &str, category: Uuid) -> ProductDraft {
    ProductDraft {
        id: Uuid::new_v4(),
        content: content(sku, name, category),
    }
}

fn engine(repo: &Arc<MockRepo>, store: &Arc<MockStore>) -> Arc<ImportEngine<MockRepo, MockStore>> {
    Arc::new(ImportEngine::new(
        Arc::clone(repo),
        Arc::clone(store),
        ImportConfig::default(),
    ))
}

async fn run(
    engine: &ImportEngine<MockRepo, MockStore>,
    rows: Vec<serde_json::Value>,
    delete_missing: bool,
) -> JobSnapshot {
    let registry = JobRegistry::new(Duration::from_secs(60));
    let job = registry.create(rows.len());
    engine.run(Arc::clone(&job), rows, delete_missing).await;
    job.snapshot()
}

#[tokio::test]
async fn test_new_row_and_sku_match_update() {
    let category = Uuid::new_v4();
    let repo = Arc::new(MockRepo::with_category(category));
    let existing = draft("SKU-EXIST", "Milk", category);
    repo.seed(existing.clone(), &[]);
    let store = Arc::new(MockStore::default());

    let rows = vec![
        json!({
            "item_name": "Bread",
            "category_id": category.to_string(),
            "retail_price": "1.99",
            "sku": ""
        }),
        json!({ "sku": "SKU-EXIST", "retail_price": "3.10" }),
    ];
    let snapshot = run(&engine(&repo, &store), rows, false).await;

    assert_eq!(snapshot.status, JobStatus::Completed);
    assert_eq!(snapshot.created, 1);
    assert_eq!(snapshot.updated, 1);
    assert_eq!(snapshot.failed, 0);
    assert_eq!(snapshot.progress, 100);
    assert!(snapshot.finished_at.is_some());

    let bread = repo.by_sku("SKU-000001").expect("generated sku");
    assert_eq!(bread.draft.content.item_name, "Bread");
    let milk = repo.product(existing.id).unwrap();
    assert_eq!(milk.draft.content.retail_price, dec!(3.10));
    assert_eq!(milk.draft.content.item_name, "Milk");
}

#[tokio::test]
async fn test_unchanged_rows_are_not_counted_twice() {
    let category = Uuid::new_v4();
    let repo = Arc::new(MockRepo::with_category(category));
    let store = Arc::new(MockStore::default());
    let engine = engine(&repo, &store);
    let image = format!("{HOSTED}products/apple.jpg");

    let rows = || {
        vec![json!({
            "sku": "SKU-APPLE",
            "item_name": "Apple",
            "category_id": category.to_string(),
            "retail_price": "0.40",
            "image_urls": [image.clone()],
            "images_provided": true
        })]
    };

    let first = run(&engine, rows(), false).await;
    assert_eq!(first.created, 1);
    assert_eq!(first.updated, 0);

    let second = run(&engine, rows(), false).await;
    assert_eq!(second.created, 0);
    assert_eq!(second.updated, 0);
    assert_eq!(repo.state.lock().unwrap().update_calls, 0);

    let apple = repo.by_sku("SKU-APPLE").unwrap();
    assert_eq!(apple.primary_url(), Some(image.as_str()));
}

#[tokio::test]
async fn test_image_diff_keeps_order_referenced_objects() {
    let category = Uuid::new_v4();
    let repo = Arc::new(MockRepo::with_category(category));
    let product = draft("SKU-PEAR", "Pear", category);
    let old = format!("{HOSTED}products/old.jpg");
    let ordered = format!("{HOSTED}products/ordered.jpg");
    let kept = format!("{HOSTED}products/kept.jpg");
    let added = format!("{HOSTED}products/added.jpg");
    repo.seed(product.clone(), &[&old, &ordered, &kept]);
    repo.state.lock().unwrap().referenced_urls.insert(ordered.clone());
    let store = Arc::new(MockStore::default());

    let rows = vec![json!({
        "id": product.id.to_string(),
        "image_urls": format!("{kept},\n{added}"),
        "images_provided": true
    })];
    let snapshot = run(&engine(&repo, &store), rows, false).await;

    assert_eq!(snapshot.updated, 1);
    assert_eq!(repo.image_urls(product.id), vec![kept.clone(), added]);
    assert_eq!(repo.product(product.id).unwrap().primary_url(), Some(kept.as_str()));

    let deleted = store.deleted.lock().unwrap().clone();
    assert_eq!(deleted, vec![old]);
    assert!(!deleted.contains(&ordered));
}

#[tokio::test]
async fn test_empty_image_set_removes_all_images() {
    let category = Uuid::new_v4();
    let repo = Arc::new(MockRepo::with_category(category));
    let product = draft("SKU-KIWI", "Kiwi", category);
    let image = format!("{HOSTED}products/kiwi.jpg");
    repo.seed(product.clone(), &[&image]);
    let store = Arc::new(MockStore::default());

    let rows = vec![json!({
        "id": product.id.to_string(),
        "image_urls": [],
        "images_provided": true
    })];
    let snapshot = run(&engine(&repo, &store), rows, false).await;

    assert_eq!(snapshot.updated, 1);
    assert!(repo.image_urls(product.id).is_empty());
    assert_eq!(*store.deleted.lock().unwrap(), vec![image]);
}

#[tokio::test]
async fn test_images_not_provided_are_preserved() {
    let category = Uuid::new_v4();
    let repo = Arc::new(MockRepo::with_category(category));
    let product = draft("SKU-PLUM", "Plum", category);
    let image = format!("{HOSTED}products/plum.jpg");
    repo.seed(product.clone(), &[&image]);
    let store = Arc::new(MockStore::default());

    let rows = vec![json!({
        "id": product.id.to_string(),
        "item_name": "Red Plum"
    })];
    let snapshot = run(&engine(&repo, &store), rows, false).await;

    assert_eq!(snapshot.updated, 1);
    assert_eq!(repo.image_urls(product.id), vec![image]);
    assert!(store.deleted.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_external_images_uploaded_in_order_and_failures_recorded() {
    let category = Uuid::new_v4();
    let repo = Arc::new(MockRepo::with_category(category));
    let store = Arc::new(MockStore::default());

    let rows = vec![json!({
        "sku": "SKU-FIG",
        "item_name": "Fig",
        "category_id": category.to_string(),
        "retail_price": "0.90",
        "image_urls": [
            "https://cdn.example.com/fig-front.jpg",
            "https://cdn.example.com/broken.jpg",
            "https://cdn.example.com/fig-back.jpg"
        ]
    })];
    let snapshot = run(&engine(&repo, &store), rows, false).await;

    assert_eq!(snapshot.status, JobStatus::Completed);
    assert_eq!(snapshot.created, 1);
    assert_eq!(snapshot.failed, 0);
    assert_eq!(snapshot.errors.len(), 1);
    assert!(snapshot.errors[0].fields.starts_with("image_upload_failed"));

    let fig = repo.by_sku("SKU-FIG").unwrap();
    let urls: Vec<String> = fig.images.iter().map(|i| i.url.clone()).collect();
    assert_eq!(urls.len(), 2);
    assert!(urls[0].ends_with("fig-front.jpg"));
    assert!(urls[1].ends_with("fig-back.jpg"));
    assert!(fig.primary_url().unwrap().ends_with("fig-front.jpg"));
}

#[tokio::test]
async fn test_reimporting_remote_images_changes_nothing() {
    let category = Uuid::new_v4();
    let repo = Arc::new(MockRepo::with_category(category));
    let store = Arc::new(MockStore::default());
    let engine = engine(&repo, &store);

    let rows = || {
        vec![json!({
            "sku": "SKU-FIG",
            "item_name": "Fig",
            "category_id": category.to_string(),
            "retail_price": "0.90",
            "image_urls": ["https://cdn.example.com/fig-front.jpg"]
        })]
    };

    let first = run(&engine, rows(), false).await;
    assert_eq!(first.created, 1);
    let stored = repo.image_urls(repo.by_sku("SKU-FIG").unwrap().draft.id);

    let second = run(&engine, rows(), false).await;
    assert_eq!(second.created, 0);
    assert_eq!(second.updated, 0);
    assert_eq!(store.uploaded.lock().unwrap().len(), 1);
    assert!(store.deleted.lock().unwrap().is_empty());
    assert_eq!(repo.image_urls(repo.by_sku("SKU-FIG").unwrap().draft.id), stored);
}

#[tokio::test]
async fn test_omitted_stock_fields_keep_current_values() {
    let category = Uuid::new_v4();
    let repo = Arc::new(MockRepo::with_category(category));
    let priced = draft("SKU-SALT", "Salt", category);
    let counted = draft("SKU-RICE", "Rice", category);
    repo.seed(priced.clone(), &[]);
    repo.seed(counted.clone(), &[]);
    let store = Arc::new(MockStore::default());

    let rows = vec![
        json!({ "id": priced.id.to_string(), "retail_price": "1.75" }),
        json!({ "id": counted.id.to_string(), "stock_qty": 40 }),
    ];
    let snapshot = run(&engine(&repo, &store), rows, false).await;

    assert_eq!(snapshot.updated, 2);
    let mut updates = repo.state.lock().unwrap().updates.clone();
    updates.sort_by_key(|(id, ..)| *id != priced.id);
    assert_eq!(updates, vec![(priced.id, false, false), (counted.id, true, false)]);

    let salt = repo.product(priced.id).unwrap().draft.content;
    assert_eq!(salt.retail_price, dec!(1.75));
    assert_eq!(salt.stock_qty, 10);
    assert_eq!(repo.product(counted.id).unwrap().draft.content.stock_qty, 40);
}

#[tokio::test]
async fn test_row_failures_do_not_abort_job() {
    let category = Uuid::new_v4();
    let repo = Arc::new(MockRepo::with_category(category));
    let store = Arc::new(MockStore::default());

    let rows = vec![
        json!({ "item_name": "A", "category_id": "not-a-uuid", "retail_price": "1" }),
        json!({ "item_name": "B", "category_id": Uuid::new_v4().to_string(), "retail_price": "1" }),
        json!({ "item_name": "C", "category_id": category.to_string() }),
        json!({ "item_name": "D", "category_id": category.to_string(), "retail_price": "-1" }),
        json!({ "item_name": "E", "category_id": category.to_string(), "retail_price": "1" }),
    ];
    let snapshot = run(&engine(&repo, &store), rows, false).await;

    assert_eq!(snapshot.status, JobStatus::Completed);
    assert_eq!(snapshot.created, 1);
    assert_eq!(snapshot.failed, 4);
    let fields: Vec<&str> = snapshot.errors.iter().map(|e| e.fields.as_str()).collect();
    assert!(fields[0].starts_with("invalid_category_id"));
    assert!(fields[1].starts_with("category_not_found"));
    assert_eq!(fields[2], "missing_field: retail_price");
    assert_eq!(fields[3], "negative_value: retail_price");
    assert_eq!(snapshot.errors[0].row, 0);
    assert_eq!(snapshot.errors[0].product, "A");
}

#[tokio::test]
async fn test_mistyped_row_fails_alone() {
    let category = Uuid::new_v4();
    let repo = Arc::new(MockRepo::with_category(category));
    let store = Arc::new(MockStore::default());

    let rows = vec![
        json!({ "item_name": "Lentils", "category_id": category.to_string(), "retail_price": "2" }),
        json!({ "item_name": "Beans", "category_id": category.to_string(), "retail_price": "2", "stock_qty": "ten" }),
        json!(42),
    ];
    let snapshot = run(&engine(&repo, &store), rows, false).await;

    assert_eq!(snapshot.status, JobStatus::Completed);
    assert_eq!(snapshot.created, 1);
    assert_eq!(snapshot.failed, 2);
    assert_eq!(snapshot.progress, 100);
    assert_eq!(snapshot.errors[0].row, 1);
    assert_eq!(snapshot.errors[0].product, "Beans");
    assert!(snapshot.errors[0].fields.starts_with("invalid_row"));
    assert_eq!(snapshot.errors[1].product, "row 2");
}

#[tokio::test]
async fn test_duplicate_sku_in_batch_fails_second_row() {
    let category = Uuid::new_v4();
    let repo = Arc::new(MockRepo::with_category(category));
    let store = Arc::new(MockStore::default());

    let rows = vec![
        json!({ "sku": "SKU-DUP", "item_name": "One", "category_id": category.to_string(), "retail_price": "1" }),
        json!({ "sku": "SKU-DUP", "item_name": "Two", "category_id": category.to_string(), "retail_price": "1" }),
    ];
    let snapshot = run(&engine(&repo, &store), rows, false).await;

    assert_eq!(snapshot.created, 1);
    assert_eq!(snapshot.failed, 1);
    assert_eq!(snapshot.errors[0].row, 1);
    assert_eq!(snapshot.errors[0].fields, "duplicate_in_batch: SKU-DUP");
    assert_eq!(repo.by_sku("SKU-DUP").unwrap().draft.content.item_name, "One");
}

#[tokio::test]
async fn test_bad_date_is_left_unset() {
    let category = Uuid::new_v4();
    let repo = Arc::new(MockRepo::with_category(category));
    let store = Arc::new(MockStore::default());

    let rows = vec![json!({
        "sku": "SKU-TEA",
        "item_name": "Tea",
        "category_id": category.to_string(),
        "retail_price": "3",
        "promotion_price": "2.5",
        "promotion_start": "2026-13-45",
        "promotion_end": "2026-06-30"
    })];
    let snapshot = run(&engine(&repo, &store), rows, false).await;

    assert_eq!(snapshot.failed, 0);
    let tea = repo.by_sku("SKU-TEA").unwrap().draft.content;
    assert_eq!(tea.promotion_start, None);
    assert_eq!(tea.promotion_end, NaiveDate::from_ymd_opt(2026, 6, 30));
}

#[tokio::test]
async fn test_franchise_links_skip_unknown_franchises() {
    let category = Uuid::new_v4();
    let franchise = Uuid::new_v4();
    let repo = Arc::new(MockRepo::with_category(category));
    repo.state.lock().unwrap().franchises.insert(franchise);
    let store = Arc::new(MockStore::default());

    let rows = vec![json!({
        "sku": "SKU-OAT",
        "item_name": "Oats",
        "category_id": category.to_string(),
        "retail_price": "4",
        "franchise_ids": [franchise.to_string(), Uuid::new_v4().to_string(), "garbage"]
    })];
    run(&engine(&repo, &store), rows, false).await;

    let oats = repo.by_sku("SKU-OAT").unwrap();
    let links = repo.state.lock().unwrap().links.clone();
    assert_eq!(links.len(), 1);
    assert!(links.contains(&FranchiseLink {
        franchise_id: franchise,
        product_id: oats.draft.id,
    }));
}

#[tokio::test]
async fn test_delete_missing_spares_imported_ordered_and_failed_matches() {
    let category = Uuid::new_v4();
    let repo = Arc::new(MockRepo::with_category(category));
    let imported = draft("SKU-1", "Imported", category);
    let ordered = draft("SKU-2", "Ordered", category);
    let failed = draft("SKU-3", "Failed", category);
    let missing = draft("SKU-4", "Missing", category);
    let missing_image = format!("{HOSTED}products/missing.jpg");
    repo.seed(imported.clone(), &[]);
    repo.seed(ordered.clone(), &[]);
    repo.seed(failed.clone(), &[]);
    repo.seed(missing.clone(), &[&missing_image]);
    repo.state.lock().unwrap().order_refs.insert(ordered.id, 3);
    let store = Arc::new(MockStore::default());

    let rows = vec![
        json!({ "id": imported.id.to_string() }),
        json!({ "id": failed.id.to_string(), "status": "archived" }),
    ];
    let snapshot = run(&engine(&repo, &store), rows, true).await;

    assert_eq!(snapshot.status, JobStatus::Completed);
    assert_eq!(snapshot.deleted, 1);
    assert_eq!(snapshot.failed, 1);
    assert!(repo.product(imported.id).is_some());
    assert!(repo.product(ordered.id).is_some());
    assert!(repo.product(failed.id).is_some());
    assert!(repo.product(missing.id).is_none());
    assert_eq!(*store.deleted.lock().unwrap(), vec![missing_image]);
}

#[tokio::test]
async fn test_delete_flag_rows_are_skipped() {
    let category = Uuid::new_v4();
    let repo = Arc::new(MockRepo::with_category(category));
    let product = draft("SKU-GONE", "Gone", category);
    repo.seed(product.clone(), &[]);
    let store = Arc::new(MockStore::default());

    let rows = vec![json!({ "id": product.id.to_string(), "delete": true })];
    let snapshot = run(&engine(&repo, &store), rows, true).await;

    assert_eq!(snapshot.updated, 0);
    assert_eq!(snapshot.deleted, 1);
    assert!(repo.product(product.id).is_none());
}

#[tokio::test]
async fn test_repository_failure_fails_job() {
    let category = Uuid::new_v4();
    let repo = Arc::new(MockRepo::with_category(category));
    let product = draft("SKU-X", "X", category);
    repo.seed(product.clone(), &[]);
    repo.fail_updates.store(true, Ordering::SeqCst);
    let store = Arc::new(MockStore::default());

    let rows = vec![json!({ "id": product.id.to_string(), "retail_price": "9" })];
    let snapshot = run(&engine(&repo, &store), rows, false).await;

    assert_eq!(snapshot.status, JobStatus::Failed);
    assert!(snapshot.progress < 100);
    assert!(snapshot.finished_at.is_some());
}

#[tokio::test]
async fn test_submit_returns_before_processing_finishes() {
    let category = Uuid::new_v4();
    let repo = Arc::new(MockRepo::with_category(category));
    let store = Arc::new(MockStore::default());
    let registry = JobRegistry::new(Duration::from_secs(60));
    let engine = engine(&repo, &store);

    let rows = vec![json!({
        "item_name": "Rice",
        "category_id": category.to_string(),
        "retail_price": "2"
    })];
    let job = engine.submit(&registry, rows, false);
    assert_eq!(job.total(), 1);
    assert!(registry.get(job.id()).is_some());

    let mut last = 0;
    for _ in 0..200 {
        let progress = job.progress();
        assert!(progress >= last);
        last = progress;
        if job.status().is_terminal() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    assert_eq!(job.status(), JobStatus::Completed);
    assert_eq!(job.progress(), 100);
}
