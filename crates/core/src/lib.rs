//! Core business logic for Grocer.
//!
//! This crate contains domain rules with ZERO web or database dependencies.
//! Persistence is reached through repository traits implemented by `grocer-db`.
//!
//! # Modules
//!
//! - `auth` - Password hashing and reset tokens
//! - `catalog` - Product values, SKU formats
//! - `import` - Background bulk product import
//! - `jobs` - In-memory batch job registry
//! - `order` - Status machine, pricing, franchise selection
//! - `storage` - Product image object store

pub mod auth;
pub mod catalog;
pub mod import;
pub mod jobs;
pub mod order;
pub mod storage;
