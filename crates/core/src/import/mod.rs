//! Bulk product import.
//!
//! An import is a background job that:
//! 1. Prepares every row concurrently into an in-memory product value
//! 2. Writes new and changed products in batches
//! 3. Reconciles image sets with the object store
//! 4. Optionally deletes catalog products absent from the import
//!
//! Row problems are recorded on the job and never abort it.

mod diff;
mod engine;
mod error;
mod parse;
mod progress;
mod repository;
mod types;

#[cfg(test)]
mod diff_props;
#[cfg(test)]
mod engine_tests;

pub use diff::{ImageDiff, fields_changed};
pub use engine::ImportEngine;
pub use error::{ImportError, RowFailure};
pub use parse::{clean_url, parse_date, parse_image_urls};
pub use repository::ImportRepository;
pub use types::{
    CategoryIndex, ExistingImage, ExistingProduct, FranchiseLink, ImageRemoval, ImportRow,
    NewImage, ProductUpdate,
};
