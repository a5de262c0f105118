//! Shared types, errors, and configuration for Grocer.
//!
//! This crate provides common types used across all other crates:
//! - Application-wide error taxonomy
//! - Layered configuration
//! - JWT access/refresh tokens and their claims
//! - Transactional email (password resets, order notifications)
//! - Pagination types for list endpoints

pub mod auth;
pub mod config;
pub mod email;
pub mod error;
pub mod jwt;
pub mod types;

pub use auth::{Claims, Role, TokenPair};
pub use config::{AppConfig, EmailConfig, FrontendConfig, ImportConfig, StorageSettings};
pub use email::{EmailError, EmailService, OrderEmail};
pub use error::AppError;
pub use jwt::{JwtConfig, JwtError, JwtService};
pub use types::{PageMeta, PageRequest, PageResponse};
