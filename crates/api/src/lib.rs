//! HTTP API layer with Axum routes and middleware.
//!
//! This crate provides:
//! - REST API routes under `/api/v1`
//! - Bearer-token authentication and role extractors
//! - A single JSON error shape for every failure

pub mod error;
pub mod middleware;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use grocer_core::import::ImportEngine;
use grocer_core::jobs::JobRegistry;
use grocer_core::order::DeliveryPolicy;
use grocer_core::storage::StorageService;
use grocer_db::SeaImportRepository;
use grocer_shared::{EmailService, FrontendConfig, JwtService};
use sea_orm::DatabaseConnection;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub use error::ApiError;

/// Import engine wired to the database and the configured object store.
pub type ProductImporter = ImportEngine<SeaImportRepository, StorageService>;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub db: Arc<DatabaseConnection>,
    /// JWT service for token operations.
    pub jwt_service: Arc<JwtService>,
    /// Email service for resets and order notifications.
    pub email_service: Arc<EmailService>,
    /// Product image store (optional).
    pub storage: Option<Arc<StorageService>>,
    /// Batch import engine; present only when storage is configured.
    pub importer: Option<Arc<ProductImporter>>,
    /// Registry of running and recent batch jobs.
    pub jobs: Arc<JobRegistry>,
    /// Delivery fee policy for orders without a franchise.
    pub delivery: DeliveryPolicy,
    /// Frontend base URLs used in emailed links.
    pub frontend: Arc<FrontendConfig>,
}

/// Creates the main application router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .nest("/api/v1", routes::api_routes_with_state(state.clone()))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}
