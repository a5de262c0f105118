//! Image store abstraction used by the import engine and catalog deletes.

use std::future::Future;

use uuid::Uuid;

use super::error::StorageError;
use super::service::StorageService;

/// Object store operations needed for product images.
///
/// `StorageService` is the production implementation; tests use an in-memory one.
pub trait ImageStore: Send + Sync {
    /// Returns true if `url` already lives in this store.
    fn is_hosted(&self, url: &str) -> bool;

    /// Public URL `import_remote` stores `source_url` under for `product_id`.
    ///
    /// Must be a pure function of its arguments.
    fn hosted_url_for(&self, source_url: &str, product_id: Uuid) -> String;

    /// Copies a remote image into the store and returns its public URL.
    fn import_remote(
        &self,
        source_url: &str,
        product_id: Uuid,
    ) -> impl Future<Output = Result<String, StorageError>> + Send;

    /// Deletes the object behind a hosted URL; missing objects are not an error.
    fn delete_url(&self, url: &str) -> impl Future<Output = Result<(), StorageError>> + Send;
}

impl ImageStore for StorageService {
    fn is_hosted(&self, url: &str) -> bool {
        self.is_hosted_url(url)
    }

    fn hosted_url_for(&self, source_url: &str, product_id: Uuid) -> String {
        self.remote_image_url(source_url, product_id)
    }

    async fn import_remote(&self, source_url: &str, product_id: Uuid) -> Result<String, StorageError> {
        self.download_and_upload(source_url, product_id).await
    }

    async fn delete_url(&self, url: &str) -> Result<(), StorageError> {
        let path = self.object_path(url)?;
        self.delete(&path).await
    }
}
