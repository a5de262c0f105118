//! Storage configuration types.

use std::path::PathBuf;

use grocer_shared::StorageSettings;
use serde::{Deserialize, Serialize};

use super::error::StorageError;

/// Storage provider configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StorageProvider {
    /// Google Cloud Storage.
    Gcs {
        /// Bucket name.
        bucket: String,
        /// Base64 service-account JSON; ambient credentials when absent.
        credential: Option<String>,
    },
    /// S3-compatible storage: Cloudflare R2, MinIO, AWS S3.
    S3 {
        /// S3 endpoint URL.
        endpoint: String,
        /// S3 bucket name.
        bucket: String,
        /// Access key ID.
        access_key_id: String,
        /// Secret access key.
        secret_access_key: String,
        /// Region.
        region: String,
    },
    /// Local filesystem (development only).
    LocalFs {
        /// Root directory path.
        root: PathBuf,
        /// Bucket segment used in public URLs.
        bucket: String,
    },
}

impl StorageProvider {
    /// Create a GCS provider.
    #[must_use]
    pub fn gcs(bucket: impl Into<String>, credential: Option<String>) -> Self {
        Self::Gcs {
            bucket: bucket.into(),
            credential,
        }
    }

    /// Create local filesystem provider (development only).
    #[must_use]
    pub fn local_fs(root: impl Into<PathBuf>, bucket: impl Into<String>) -> Self {
        Self::LocalFs {
            root: root.into(),
            bucket: bucket.into(),
        }
    }

    /// Get the provider name.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Gcs { .. } => "gcs",
            Self::S3 { .. } => "s3",
            Self::LocalFs { .. } => "local",
        }
    }

    /// Get the bucket name.
    #[must_use]
    pub fn bucket(&self) -> &str {
        match self {
            Self::Gcs { bucket, .. } | Self::S3 { bucket, .. } | Self::LocalFs { bucket, .. } => {
                bucket
            }
        }
    }
}

/// Storage service configuration.
#[derive(Debug, Clone)]
pub struct StorageConfig {
    /// Storage provider configuration.
    pub provider: StorageProvider,
    /// Public URL prefix placed before `{bucket}/{path}`.
    pub public_base_url: String,
    /// Maximum image size in bytes.
    pub max_file_size: u64,
    /// Allowed MIME types for upload.
    pub allowed_mime_types: Vec<String>,
}

impl StorageConfig {
    /// Default max file size: 10MB.
    pub const DEFAULT_MAX_FILE_SIZE: u64 = 10 * 1024 * 1024;
    /// Default public prefix for GCS objects.
    pub const DEFAULT_PUBLIC_BASE_URL: &'static str = "https://storage.googleapis.com";

    /// Create a new storage config with default settings.
    #[must_use]
    pub fn new(provider: StorageProvider) -> Self {
        Self {
            provider,
            public_base_url: Self::DEFAULT_PUBLIC_BASE_URL.to_string(),
            max_file_size: Self::DEFAULT_MAX_FILE_SIZE,
            allowed_mime_types: Self::default_mime_types(),
        }
    }

    /// Builds a config from the application settings.
    ///
    /// # Errors
    ///
    /// Returns an error for an unknown provider or missing S3 credentials.
    pub fn from_settings(settings: &StorageSettings) -> Result<Self, StorageError> {
        let provider = match settings.provider.as_str() {
            "gcs" => StorageProvider::gcs(&settings.bucket, settings.credential.clone()),
            "s3" => StorageProvider::S3 {
                endpoint: settings
                    .endpoint
                    .clone()
                    .ok_or_else(|| StorageError::configuration("s3 endpoint is required"))?,
                bucket: settings.bucket.clone(),
                access_key_id: settings
                    .access_key_id
                    .clone()
                    .ok_or_else(|| StorageError::configuration("s3 access_key_id is required"))?,
                secret_access_key: settings
                    .credential
                    .clone()
                    .ok_or_else(|| StorageError::configuration("s3 credential is required"))?,
                region: settings.region.clone().unwrap_or_else(|| "auto".to_string()),
            },
            "local" => StorageProvider::local_fs(
                settings.root.clone().unwrap_or_else(|| "./storage".to_string()),
                &settings.bucket,
            ),
            other => {
                return Err(StorageError::configuration(format!(
                    "unknown storage provider: {other}"
                )));
            }
        };

        Ok(Self::new(provider).with_public_base_url(&settings.public_base_url))
    }

    /// Set the public URL prefix.
    #[must_use]
    pub fn with_public_base_url(mut self, url: &str) -> Self {
        self.public_base_url = url.trim_end_matches('/').to_string();
        self
    }

    /// Default allowed MIME types for product images.
    #[must_use]
    pub fn default_mime_types() -> Vec<String> {
        ["image/png", "image/jpeg", "image/gif", "image/webp"]
            .into_iter()
            .map(String::from)
            .collect()
    }

    /// Check if a MIME type is allowed.
    #[must_use]
    pub fn is_mime_type_allowed(&self, mime_type: &str) -> bool {
        let essence = mime_type.split(';').next().unwrap_or_default().trim();
        self.allowed_mime_types.iter().any(|t| t == essence)
    }
}
