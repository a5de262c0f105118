//! Product image storage using Apache OpenDAL.
//!
//! This module provides vendor-agnostic object storage with support for:
//! - Google Cloud Storage (production)
//! - S3-compatible: Cloudflare R2, MinIO, AWS S3
//! - Local filesystem (development only)
//!
//! Public image URLs have the form `{public_base_url}/{bucket}/{object_path}`.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                      Apache OpenDAL                              │
//! │                   (Unified Storage API)                          │
//! ├─────────────────────────────────────────────────────────────────┤
//! │ op.write("products/..", data)   │ op.delete("products/..")      │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

mod config;
mod error;
mod service;
mod store;

pub use config::{StorageConfig, StorageProvider};
pub use error::StorageError;
pub use service::{StorageService, extract_object_path};
pub use store::ImageStore;
