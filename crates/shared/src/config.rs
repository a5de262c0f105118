//! Application configuration management.

use rust_decimal::Decimal;
use serde::Deserialize;

/// Application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Server configuration.
    pub server: ServerConfig,
    /// Database configuration.
    pub database: DatabaseConfig,
    /// JWT configuration.
    pub jwt: JwtSettings,
    /// Outbound email configuration.
    #[serde(default)]
    pub email: EmailConfig,
    /// Frontend base URLs used in emailed links.
    #[serde(default)]
    pub frontend: FrontendConfig,
    /// Object storage for product images (optional in development).
    #[serde(default)]
    pub storage: Option<StorageSettings>,
    /// Batch import tuning.
    #[serde(default)]
    pub import: ImportConfig,
    /// Delivery fee defaults for orders without a franchise.
    #[serde(default)]
    pub delivery: DeliveryConfig,
    /// Logging output.
    #[serde(default)]
    pub log: LogConfig,
}

/// Server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host to bind to.
    #[serde(default = "default_host")]
    pub host: String,
    /// Port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

/// Database configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Database connection URL.
    pub url: String,
    /// Maximum number of connections in the pool.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Minimum number of connections in the pool.
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
}

fn default_max_connections() -> u32 {
    10
}

fn default_min_connections() -> u32 {
    1
}

/// JWT configuration as read from config sources.
#[derive(Debug, Clone, Deserialize)]
pub struct JwtSettings {
    /// Secret key for signing tokens.
    pub secret: String,
    /// Access token expiration in seconds.
    #[serde(default = "default_access_token_expiry")]
    pub access_token_expiry_secs: u64,
    /// Refresh token expiration in seconds.
    #[serde(default = "default_refresh_token_expiry")]
    pub refresh_token_expiry_secs: u64,
}

fn default_access_token_expiry() -> u64 {
    900 // 15 minutes
}

fn default_refresh_token_expiry() -> u64 {
    604_800 // 7 days
}

/// SMTP configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct EmailConfig {
    /// SMTP relay host.
    #[serde(default = "default_smtp_host")]
    pub smtp_host: String,
    /// SMTP port.
    #[serde(default = "default_smtp_port")]
    pub smtp_port: u16,
    /// SMTP username.
    #[serde(default)]
    pub smtp_username: String,
    /// SMTP password.
    #[serde(default)]
    pub smtp_password: String,
    /// Sender address.
    #[serde(default = "default_from_email")]
    pub from_email: String,
    /// Sender display name.
    #[serde(default = "default_from_name")]
    pub from_name: String,
}

fn default_smtp_host() -> String {
    "localhost".to_string()
}

fn default_smtp_port() -> u16 {
    1025
}

fn default_from_email() -> String {
    "orders@grocer.local".to_string()
}

fn default_from_name() -> String {
    "Grocer".to_string()
}

impl Default for EmailConfig {
    fn default() -> Self {
        Self {
            smtp_host: default_smtp_host(),
            smtp_port: default_smtp_port(),
            smtp_username: String::new(),
            smtp_password: String::new(),
            from_email: default_from_email(),
            from_name: default_from_name(),
        }
    }
}

/// Per-audience frontend base URLs.
#[derive(Debug, Clone, Deserialize)]
pub struct FrontendConfig {
    /// Storefront used by customers.
    #[serde(default = "default_customer_url")]
    pub customer_url: String,
    /// Franchise portal used by staff and owners.
    #[serde(default = "default_franchise_url")]
    pub franchise_url: String,
    /// Platform admin console.
    #[serde(default = "default_admin_url")]
    pub admin_url: String,
}

fn default_customer_url() -> String {
    "http://localhost:3000".to_string()
}

fn default_franchise_url() -> String {
    "http://localhost:3001".to_string()
}

fn default_admin_url() -> String {
    "http://localhost:3002".to_string()
}

impl Default for FrontendConfig {
    fn default() -> Self {
        Self {
            customer_url: default_customer_url(),
            franchise_url: default_franchise_url(),
            admin_url: default_admin_url(),
        }
    }
}

impl FrontendConfig {
    /// Base URL of the frontend a user with `role` signs into.
    #[must_use]
    pub fn base_url_for(&self, role: crate::Role) -> &str {
        match role {
            crate::Role::Customer => &self.customer_url,
            crate::Role::FranchiseStaff | crate::Role::FranchiseOwner => &self.franchise_url,
            crate::Role::Admin => &self.admin_url,
        }
    }
}

/// Object storage settings.
#[derive(Debug, Clone, Deserialize)]
pub struct StorageSettings {
    /// Backend: `gcs`, `s3`, or `local`.
    #[serde(default = "default_storage_provider")]
    pub provider: String,
    /// Bucket holding product images.
    pub bucket: String,
    /// Public URL prefix; object URLs are `{public_base_url}/{bucket}/{path}`.
    #[serde(default = "default_public_base_url")]
    pub public_base_url: String,
    /// GCS service-account JSON (base64) or S3 secret key.
    #[serde(default)]
    pub credential: Option<String>,
    /// S3 access key id.
    #[serde(default)]
    pub access_key_id: Option<String>,
    /// S3 endpoint.
    #[serde(default)]
    pub endpoint: Option<String>,
    /// S3 region.
    #[serde(default)]
    pub region: Option<String>,
    /// Root directory for the local provider.
    #[serde(default)]
    pub root: Option<String>,
}

fn default_storage_provider() -> String {
    "gcs".to_string()
}

fn default_public_base_url() -> String {
    "https://storage.googleapis.com".to_string()
}

/// Batch import concurrency and retention.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct ImportConfig {
    /// Rows prepared in parallel.
    #[serde(default = "default_prepare_concurrency")]
    pub prepare_concurrency: usize,
    /// Concurrent image downloads/uploads per job.
    #[serde(default = "default_upload_concurrency")]
    pub upload_concurrency: usize,
    /// Concurrent object deletions during delete-missing.
    #[serde(default = "default_delete_concurrency")]
    pub delete_concurrency: usize,
    /// Maximum rows per bulk insert statement.
    #[serde(default = "default_insert_batch_size")]
    pub insert_batch_size: usize,
    /// How long finished jobs stay queryable.
    #[serde(default = "default_job_ttl_secs")]
    pub job_ttl_secs: u64,
}

fn default_prepare_concurrency() -> usize {
    5
}

fn default_upload_concurrency() -> usize {
    3
}

fn default_delete_concurrency() -> usize {
    5
}

fn default_insert_batch_size() -> usize {
    100
}

fn default_job_ttl_secs() -> u64 {
    86_400
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            prepare_concurrency: default_prepare_concurrency(),
            upload_concurrency: default_upload_concurrency(),
            delete_concurrency: default_delete_concurrency(),
            insert_batch_size: default_insert_batch_size(),
            job_ttl_secs: default_job_ttl_secs(),
        }
    }
}

/// Delivery fee policy used when an order has no franchise.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct DeliveryConfig {
    /// Flat delivery fee.
    #[serde(default = "default_delivery_fee")]
    pub default_fee: Decimal,
    /// Subtotal at or above which delivery is free.
    #[serde(default = "default_free_threshold")]
    pub default_free_threshold: Decimal,
}

fn default_delivery_fee() -> Decimal {
    Decimal::new(375, 2)
}

fn default_free_threshold() -> Decimal {
    Decimal::new(20, 0)
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        Self {
            default_fee: default_delivery_fee(),
            default_free_threshold: default_free_threshold(),
        }
    }
}

/// Log output settings.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct LogConfig {
    /// Emit JSON lines instead of human-readable output.
    #[serde(default)]
    pub json: bool,
}

impl AppConfig {
    /// Loads configuration from environment and config files.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration cannot be loaded.
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".to_string());

        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{run_mode}")).required(false))
            .add_source(config::Environment::with_prefix("GROCER").separator("__"))
            .build()?;

        config.try_deserialize()
    }
}
