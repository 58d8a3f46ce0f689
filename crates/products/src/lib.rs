//! Catalog domain module: categories and products.
//!
//! This crate contains the catalog's business rules (validation, defaults,
//! the non-negative quantity rule), implemented purely as deterministic domain
//! logic (no IO, no HTTP, no storage).

pub mod category;
pub mod product;

pub use category::{Category, CreateCategory, RenameCategory, name_key};
pub use product::{
    CreateProduct, DEFAULT_DESCRIPTION, DEFAULT_LOW_STOCK_THRESHOLD, Product, ProductParts,
    UpdateProduct, apply_delta,
};
