//! Admin catalog maintenance: bulk import jobs and product deletion.

use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, get, post},
};
use grocer_db::CatalogRepository;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::info;
use uuid::Uuid;

use crate::{AppState, error::ApiError, middleware::AdminUser};

/// Largest accepted batch payload.
const MAX_BATCH_BODY_BYTES: usize = 32 * 1024 * 1024;

/// Creates the admin routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route(
            "/admin/products/batch",
            post(submit_batch).layer(DefaultBodyLimit::max(MAX_BATCH_BODY_BYTES)),
        )
        .route("/admin/products/batch/{job_id}", get(get_batch))
        .route("/admin/products/{product_id}", delete(delete_product))
}

/// Bulk import request.
#[derive(Debug, Deserialize)]
pub struct BatchRequest {
    /// Product rows, decoded one by one by the import job.
    #[serde(default)]
    pub products: Vec<Value>,
    /// Delete catalog products absent from this import.
    #[serde(default)]
    pub delete_missing: bool,
}

/// POST /admin/products/batch - Queue a bulk import.
async fn submit_batch(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Json(payload): Json<BatchRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let Some(importer) = state.importer.as_ref() else {
        return Err(ApiError::new(
            StatusCode::SERVICE_UNAVAILABLE,
            "storage_not_configured",
            "Image storage is not configured",
        ));
    };

    if payload.products.is_empty() {
        return Err(ApiError::bad_request(
            "empty_batch",
            "At least one product is required",
        ));
    }

    let job = importer.submit(&state.jobs, payload.products, payload.delete_missing);

    info!(
        job_id = %job.id(),
        total = job.total(),
        delete_missing = payload.delete_missing,
        admin = %admin.user_id(),
        "Batch import queued"
    );

    Ok((
        StatusCode::ACCEPTED,
        Json(json!({
            "job_id": job.id(),
            "status": "processing",
            "total": job.total()
        })),
    ))
}

/// GET `/admin/products/batch/{job_id}` - Progress of an import job.
async fn get_batch(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(job_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .jobs
        .get(job_id)
        .map(|job| Json(job.snapshot()))
        .ok_or_else(|| ApiError::not_found("job_not_found", format!("Job not found: {job_id}")))
}

/// DELETE `/admin/products/{product_id}` - Remove a product and its images.
async fn delete_product(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Path(product_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let catalog = CatalogRepository::new((*state.db).clone());
    catalog
        .delete_product_cascade(product_id, state.storage.as_deref())
        .await?;

    info!(product_id = %product_id, admin = %admin.user_id(), "Product deleted");
    Ok(StatusCode::NO_CONTENT)
}
