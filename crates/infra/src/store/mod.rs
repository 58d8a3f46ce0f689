//! Persistence collaborator: category and product storage.
//!
//! Any backend must provide two guarantees:
//! - per-record atomic read-modify-write of a product's quantity
//!   ([`ProductStore::apply_delta`]), without a store-wide lock;
//! - write-time uniqueness of category names and product SKUs.
//!
//! Category deletion clears every product reference to the deleted category
//! before it reports success.

pub mod in_memory;
pub mod postgres;
pub mod query;

use async_trait::async_trait;

use stockroom_core::{CategoryId, ProductId};
use stockroom_inventory::Snapshot;
use stockroom_products::{
    Category, CreateCategory, CreateProduct, Product, RenameCategory, UpdateProduct,
};

use crate::error::StoreResult;

pub use in_memory::InMemoryInventoryStore;
pub use postgres::PostgresInventoryStore;
pub use query::{CategoryFilter, OrderField, ProductOrdering, ProductQuery};

/// Result of deleting a category.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CategoryDeleted {
    pub category_id: CategoryId,
    /// Products whose reference was cleared.
    pub detached_products: u64,
}

#[async_trait]
pub trait CategoryStore: Send + Sync {
    /// Fails with `DuplicateName` when the name is taken (case-insensitive).
    async fn create_category(&self, cmd: CreateCategory) -> StoreResult<Category>;

    async fn rename_category(&self, id: CategoryId, cmd: RenameCategory) -> StoreResult<Category>;

    /// Delete the category and null out every product reference to it.
    async fn delete_category(&self, id: CategoryId) -> StoreResult<CategoryDeleted>;

    async fn get_category(&self, id: CategoryId) -> StoreResult<Category>;

    async fn list_categories(&self) -> StoreResult<Vec<Category>>;
}

#[async_trait]
pub trait ProductStore: Send + Sync {
    /// Fails with `DuplicateSku`, or `NotFound` when `category_id` is unknown.
    async fn create_product(&self, cmd: CreateProduct) -> StoreResult<Product>;

    /// Edit everything but the quantity.
    async fn update_product(&self, id: ProductId, update: UpdateProduct) -> StoreResult<Product>;

    async fn delete_product(&self, id: ProductId) -> StoreResult<()>;

    async fn get_product(&self, id: ProductId) -> StoreResult<Product>;

    async fn list_products(&self, query: &ProductQuery) -> StoreResult<Vec<Product>>;

    /// Atomically apply `delta` to the product's quantity.
    ///
    /// Linearizable per product; adjustments to different products never wait
    /// on each other. On `InsufficientStock` the stored quantity is unchanged.
    async fn apply_delta(&self, id: ProductId, delta: i64) -> StoreResult<Product>;
}

/// Full store: both tables plus consistent snapshots for reporting.
#[async_trait]
pub trait InventoryStore: CategoryStore + ProductStore {
    /// Point-in-time view of all categories and products.
    ///
    /// Each product is copied whole (never quantity from one write and price
    /// from another), and no category deletion is observed half-applied.
    async fn snapshot(&self) -> StoreResult<Snapshot>;
}
