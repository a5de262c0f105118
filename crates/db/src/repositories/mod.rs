//! Repository abstractions for data access.
//!
//! Repositories provide a clean interface for database operations,
//! hiding the `SeaORM` implementation details from the rest of the application.

pub mod cart;
pub mod catalog;
pub mod franchise;
pub mod import;
pub mod order;
pub mod password_reset;
pub mod session;
pub mod user;

pub use cart::{CartError, CartLine, CartRepository};
pub use catalog::{
    CatalogRepository, CategoryWithSubcategories, ImageView, ProductFilter, StorefrontProduct,
};
pub use franchise::FranchiseRepository;
pub use import::SeaImportRepository;
pub use order::{OrderRepository, OrderWithItems, PlaceOrderInput, StatusChange};
pub use password_reset::PasswordResetRepository;
pub use session::{ClientInfo, SessionRepository};
pub use user::UserRepository;
