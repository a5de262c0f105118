//! `SeaORM` entity definitions.
//!
//! Entities mirror the tables created in `migration`. Relations are declared
//! where handlers join across them; bulk relation loads are done explicitly
//! by repositories, keyed by parent ids.

pub mod cart_items;
pub mod categories;
pub mod franchise_products;
pub mod franchises;
pub mod order_items;
pub mod orders;
pub mod password_resets;
pub mod product_images;
pub mod products;
pub mod sessions;
pub mod subcategories;
pub mod users;
