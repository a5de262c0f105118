//! Storage service implementation using Apache OpenDAL.

use bytes::{Bytes, BytesMut};
use opendal::{ErrorKind, Operator, services};
use sha2::{Digest, Sha256};
use tracing::debug;
use uuid::Uuid;

use super::config::{StorageConfig, StorageProvider};
use super::error::StorageError;

/// Storage service for product images.
pub struct StorageService {
    operator: Operator,
    config: StorageConfig,
    http: reqwest::Client,
}

impl std::fmt::Debug for StorageService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorageService")
            .field("provider", &self.config.provider.name())
            .field("bucket", &self.config.provider.bucket())
            .finish_non_exhaustive()
    }
}

impl StorageService {
    /// Create a new storage service from configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage provider cannot be initialized.
    pub fn from_config(config: StorageConfig) -> Result<Self, StorageError> {
        let operator = Self::create_operator(&config.provider)?;
        Ok(Self {
            operator,
            config,
            http: reqwest::Client::new(),
        })
    }

    /// Create OpenDAL operator from provider config.
    fn create_operator(provider: &StorageProvider) -> Result<Operator, StorageError> {
        let operator = match provider {
            StorageProvider::Gcs { bucket, credential } => {
                let mut builder = services::Gcs::default().bucket(bucket);
                if let Some(credential) = credential {
                    builder = builder.credential(credential);
                }
                Operator::new(builder).map(|b| b.finish())
            }
            StorageProvider::S3 {
                endpoint,
                bucket,
                access_key_id,
                secret_access_key,
                region,
            } => {
                let builder = services::S3::default()
                    .endpoint(endpoint)
                    .bucket(bucket)
                    .access_key_id(access_key_id)
                    .secret_access_key(secret_access_key)
                    .region(region);
                Operator::new(builder).map(|b| b.finish())
            }
            StorageProvider::LocalFs { root, .. } => {
                let root = root
                    .to_str()
                    .ok_or_else(|| StorageError::configuration("invalid path"))?;
                Operator::new(services::Fs::default().root(root)).map(|b| b.finish())
            }
        };

        operator.map_err(|e| StorageError::configuration(e.to_string()))
    }

    /// Validate an upload against size and MIME constraints.
    ///
    /// # Errors
    ///
    /// Returns an error if file size or MIME type is invalid.
    pub fn validate_upload(&self, content_type: &str, size: u64) -> Result<(), StorageError> {
        if size > self.config.max_file_size {
            return Err(StorageError::FileTooLarge {
                size,
                max: self.config.max_file_size,
            });
        }

        if !self.config.is_mime_type_allowed(content_type) {
            return Err(StorageError::InvalidMimeType {
                mime_type: content_type.to_string(),
            });
        }

        Ok(())
    }

    /// Public URL for an object path.
    #[must_use]
    pub fn public_url(&self, object_path: &str) -> String {
        format!(
            "{}/{}/{}",
            self.config.public_base_url,
            self.config.provider.bucket(),
            object_path.trim_start_matches('/')
        )
    }

    /// Returns true if `url` points into this service's bucket.
    #[must_use]
    pub fn is_hosted_url(&self, url: &str) -> bool {
        url.starts_with(&format!(
            "{}/{}/",
            self.config.public_base_url,
            self.config.provider.bucket()
        ))
    }

    /// Stores an image as `products/{product_id}/{filename}` and returns its public URL.
    ///
    /// # Errors
    ///
    /// Returns an error if the name is not a single path segment, the content
    /// fails [`Self::validate_upload`], or the write fails.
    pub async fn upload(
        &self,
        product_id: Uuid,
        filename: &str,
        content_type: &str,
        data: Bytes,
    ) -> Result<String, StorageError> {
        if !is_safe_filename(filename) {
            return Err(StorageError::InvalidFilename(filename.to_string()));
        }
        self.validate_upload(content_type, u64::try_from(data.len()).unwrap_or(u64::MAX))?;

        let path = format!("products/{product_id}/{filename}");
        self.write(&path, data, content_type).await?;
        Ok(self.public_url(&path))
    }

    /// URL a remote image is stored under for `product_id`.
    ///
    /// Derived from the source URL alone, so re-importing the same source
    /// resolves to the object already uploaded.
    #[must_use]
    pub fn remote_image_url(&self, source_url: &str, product_id: Uuid) -> String {
        self.public_url(&format!(
            "products/{product_id}/{}",
            remote_image_filename(source_url)
        ))
    }

    /// Fetches a remote image and stores it under [`Self::remote_image_url`].
    ///
    /// # Errors
    ///
    /// Returns an error if the download, validation, or write fails.
    pub async fn download_and_upload(
        &self,
        source_url: &str,
        product_id: Uuid,
    ) -> Result<String, StorageError> {
        let mut response = self
            .http
            .get(source_url)
            .send()
            .await?
            .error_for_status()?;

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .unwrap_or("image/jpeg")
            .to_string();

        let max = self.config.max_file_size;
        if let Some(size) = response.content_length()
            && size > max
        {
            return Err(StorageError::FileTooLarge { size, max });
        }
        let mut data = BytesMut::new();
        while let Some(chunk) = response.chunk().await? {
            let size = u64::try_from(data.len() + chunk.len()).unwrap_or(u64::MAX);
            if size > max {
                return Err(StorageError::FileTooLarge { size, max });
            }
            data.extend_from_slice(&chunk);
        }

        let filename = remote_image_filename(source_url);
        let url = self
            .upload(product_id, &filename, &content_type, data.freeze())
            .await?;
        debug!(source_url, url, "imported remote image");
        Ok(url)
    }

    async fn write(&self, path: &str, data: Bytes, content_type: &str) -> Result<(), StorageError> {
        self.operator
            .write_with(path, data)
            .content_type(content_type)
            .await
            .map(|_| ())
            .map_err(StorageError::from)
    }

    /// Deletes an object; a missing object counts as deleted.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend reports any other failure.
    pub async fn delete(&self, object_path: &str) -> Result<(), StorageError> {
        match self.operator.delete(object_path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(object_path, "object already absent");
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Check if an object exists in storage.
    pub async fn exists(&self, object_path: &str) -> bool {
        self.operator.exists(object_path).await.unwrap_or(false)
    }

    /// Extracts the object path from a public URL of this bucket.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::InvalidUrl` for URLs outside the bucket.
    pub fn object_path(&self, url: &str) -> Result<String, StorageError> {
        extract_object_path(url, self.config.provider.bucket())
    }

    /// Get the storage provider name.
    #[must_use]
    pub fn provider_name(&self) -> &'static str {
        self.config.provider.name()
    }
}

/// Strips `scheme://host/bucket/` from `url`, returning the object path.
///
/// # Errors
///
/// Returns `StorageError::InvalidUrl` if the URL has no scheme, the first path
/// segment is not `bucket`, or nothing follows the bucket.
pub fn extract_object_path(url: &str, bucket: &str) -> Result<String, StorageError> {
    let without_query = url.split(['?', '#']).next().unwrap_or_default();
    let (_, rest) = without_query
        .split_once("://")
        .ok_or_else(|| StorageError::invalid_url(url))?;
    let (_host, path) = rest
        .split_once('/')
        .ok_or_else(|| StorageError::invalid_url(url))?;
    let object_path = path
        .strip_prefix(bucket)
        .and_then(|p| p.strip_prefix('/'))
        .filter(|p| !p.is_empty())
        .ok_or_else(|| StorageError::invalid_url(url))?;
    Ok(object_path.to_string())
}

/// `{sha256(source_url)[..16]}.{ext}`, with the extension taken from the URL.
fn remote_image_filename(source_url: &str) -> String {
    let digest = Sha256::digest(source_url.as_bytes());
    let stem: String = digest.iter().take(8).map(|b| format!("{b:02x}")).collect();
    format!("{stem}.{}", image_extension("", source_url))
}

fn is_safe_filename(name: &str) -> bool {
    !name.is_empty()
        && name.len() <= 255
        && !name.starts_with('.')
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_'))
}

/// Picks a file extension from the MIME type, falling back to the URL suffix.
fn image_extension(content_type: &str, source_url: &str) -> String {
    let essence = content_type.split(';').next().unwrap_or_default().trim();
    let from_mime = match essence {
        "image/png" => Some("png"),
        "image/jpeg" | "image/jpg" => Some("jpg"),
        "image/gif" => Some("gif"),
        "image/webp" => Some("webp"),
        _ => None,
    };
    if let Some(ext) = from_mime {
        return ext.to_string();
    }

    source_url
        .split(['?', '#'])
        .next()
        .and_then(|path| path.rsplit('/').next())
        .and_then(|file| file.rsplit_once('.'))
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .filter(|ext| !ext.is_empty() && ext.len() <= 5 && ext.chars().all(|c| c.is_ascii_alphanumeric()))
        .unwrap_or_else(|| "jpg".to_string())
}
