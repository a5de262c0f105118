//! Grocer API Server
//!
//! Main entry point for the Grocer backend service.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use grocer_api::{AppState, ProductImporter, create_router};
use grocer_core::jobs::JobRegistry;
use grocer_core::order::DeliveryPolicy;
use grocer_core::storage::{StorageConfig, StorageService};
use grocer_db::{SeaImportRepository, connect_with};
use grocer_shared::{AppConfig, EmailService, JwtConfig, JwtService};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    let config = AppConfig::load().context("failed to load configuration")?;
    init_tracing(config.log.json);

    let db = connect_with(&config.database).await?;
    info!(
        max_connections = config.database.max_connections,
        "Connected to database"
    );

    let jwt_service = JwtService::new(JwtConfig {
        secret: config.jwt.secret.clone(),
        access_token_expires_minutes: i64::try_from(config.jwt.access_token_expiry_secs / 60)?,
        refresh_token_expires_days: i64::try_from(config.jwt.refresh_token_expiry_secs / 86_400)?,
    });

    let email_service = EmailService::new(config.email.clone());
    info!(
        smtp_host = %config.email.smtp_host,
        smtp_port = %config.email.smtp_port,
        "Email service configured"
    );

    let storage = match &config.storage {
        Some(settings) => {
            let service = StorageService::from_config(StorageConfig::from_settings(settings)?)?;
            info!(
                provider = service.provider_name(),
                bucket = %settings.bucket,
                "Image storage configured"
            );
            Some(Arc::new(service))
        }
        None => {
            warn!("No image storage configured; batch import is disabled");
            None
        }
    };

    let db = Arc::new(db);
    let importer = storage.as_ref().map(|store| {
        Arc::new(ProductImporter::new(
            Arc::new(SeaImportRepository::new((*db).clone())),
            Arc::clone(store),
            config.import,
        ))
    });

    let state = AppState {
        db,
        jwt_service: Arc::new(jwt_service),
        email_service: Arc::new(email_service),
        storage,
        importer,
        jobs: Arc::new(JobRegistry::new(Duration::from_secs(
            config.import.job_ttl_secs,
        ))),
        delivery: DeliveryPolicy {
            fee: config.delivery.default_fee,
            free_threshold: config.delivery.default_free_threshold,
        },
        frontend: Arc::new(config.frontend.clone()),
    };

    let app = create_router(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = TcpListener::bind(&addr).await?;
    info!("Server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "grocer=debug,tower_http=debug".into());
    let registry = tracing_subscriber::registry().with(filter);

    if json {
        registry.with(fmt::layer().json()).init();
    } else {
        registry.with(fmt::layer()).init();
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
