//! In-memory inventory store with per-record locking.
//!
//! Lock order, everywhere: `categories` → `products` → one product record.
//! A thread never holds two record locks at once, so the order cannot cycle.
//!
//! - Adjustments take `products` for reading and lock only their own record,
//!   so adjustments to different products run in parallel.
//! - Category deletion holds `categories` for writing while it clears product
//!   references; snapshots hold `categories` for reading, so they observe the
//!   deletion either entirely or not at all.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use chrono::Utc;

use stockroom_core::{CategoryId, DomainError, ProductId};
use stockroom_inventory::Snapshot;
use stockroom_products::{
    Category, CreateCategory, CreateProduct, Product, RenameCategory, UpdateProduct,
};

use super::{CategoryDeleted, CategoryStore, InventoryStore, ProductQuery, ProductStore};
use crate::error::{StoreError, StoreResult};

#[derive(Debug, Default)]
struct CategoryTable {
    by_id: HashMap<CategoryId, Category>,
    /// `name_key` → id, enforces case-insensitive name uniqueness.
    names: HashMap<String, CategoryId>,
}

impl CategoryTable {
    fn ensure_exists(&self, id: CategoryId) -> StoreResult<()> {
        if self.by_id.contains_key(&id) {
            Ok(())
        } else {
            Err(DomainError::not_found("category", id).into())
        }
    }
}

type ProductRecord = Arc<Mutex<Product>>;

#[derive(Debug, Default)]
struct ProductTable {
    by_id: HashMap<ProductId, ProductRecord>,
    /// SKU → id, enforces SKU uniqueness.
    skus: HashMap<String, ProductId>,
}

impl ProductTable {
    fn record(&self, id: ProductId) -> StoreResult<&ProductRecord> {
        self.by_id
            .get(&id)
            .ok_or_else(|| DomainError::not_found("product", id).into())
    }
}

/// In-memory store for tests/dev and single-process deployments.
#[derive(Debug, Default)]
pub struct InMemoryInventoryStore {
    categories: RwLock<CategoryTable>,
    products: RwLock<ProductTable>,
}

fn poisoned(what: &str) -> StoreError {
    StoreError::backend(format!("{what} lock poisoned"))
}

fn lock_record(record: &ProductRecord) -> StoreResult<MutexGuard<'_, Product>> {
    record.lock().map_err(|_| poisoned("product record"))
}

impl InMemoryInventoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read_categories(&self) -> StoreResult<RwLockReadGuard<'_, CategoryTable>> {
        self.categories.read().map_err(|_| poisoned("category table"))
    }

    fn write_categories(&self) -> StoreResult<RwLockWriteGuard<'_, CategoryTable>> {
        self.categories.write().map_err(|_| poisoned("category table"))
    }

    fn read_products(&self) -> StoreResult<RwLockReadGuard<'_, ProductTable>> {
        self.products.read().map_err(|_| poisoned("product table"))
    }

    fn write_products(&self) -> StoreResult<RwLockWriteGuard<'_, ProductTable>> {
        self.products.write().map_err(|_| poisoned("product table"))
    }

    fn create_category_sync(&self, cmd: &CreateCategory) -> StoreResult<Category> {
        let category = Category::create(CategoryId::new(), cmd, Utc::now())?;
        let key = category.name_key();

        let mut table = self.write_categories()?;
        if table.names.contains_key(&key) {
            return Err(DomainError::duplicate_name(category.name()).into());
        }
        table.names.insert(key, category.id_typed());
        table.by_id.insert(category.id_typed(), category.clone());
        Ok(category)
    }

    fn rename_category_sync(&self, id: CategoryId, cmd: &RenameCategory) -> StoreResult<Category> {
        let mut guard = self.write_categories()?;
        let table = &mut *guard;

        let current = table
            .by_id
            .get(&id)
            .ok_or_else(|| DomainError::not_found("category", id))?;
        let old_key = current.name_key();

        let mut renamed = current.clone();
        renamed.rename(&cmd.name)?;
        let new_key = renamed.name_key();

        if let Some(owner) = table.names.get(&new_key) {
            if *owner != id {
                return Err(DomainError::duplicate_name(renamed.name()).into());
            }
        }

        table.names.remove(&old_key);
        table.names.insert(new_key, id);
        table.by_id.insert(id, renamed.clone());
        Ok(renamed)
    }

    fn delete_category_sync(&self, id: CategoryId) -> StoreResult<CategoryDeleted> {
        // Held until every reference is cleared.
        let mut categories = self.write_categories()?;
        let removed = categories
            .by_id
            .remove(&id)
            .ok_or_else(|| DomainError::not_found("category", id))?;
        categories.names.remove(&removed.name_key());

        let products = self.read_products()?;
        let mut detached = 0;
        for record in products.by_id.values() {
            let mut product = lock_record(record)?;
            if product.category() == Some(id) {
                product.clear_category();
                detached += 1;
            }
        }

        Ok(CategoryDeleted {
            category_id: id,
            detached_products: detached,
        })
    }

    fn get_category_sync(&self, id: CategoryId) -> StoreResult<Category> {
        let table = self.read_categories()?;
        table
            .by_id
            .get(&id)
            .cloned()
            .ok_or_else(|| DomainError::not_found("category", id).into())
    }

    fn list_categories_sync(&self) -> StoreResult<Vec<Category>> {
        let table = self.read_categories()?;
        let mut out: Vec<Category> = table.by_id.values().cloned().collect();
        out.sort_by_key(|c| c.name_key());
        Ok(out)
    }

    fn create_product_sync(&self, cmd: &CreateProduct) -> StoreResult<Product> {
        let product = Product::create(ProductId::new(), cmd, Utc::now())?;

        let categories = self.read_categories()?;
        if let Some(category) = product.category() {
            categories.ensure_exists(category)?;
        }

        let mut products = self.write_products()?;
        if products.skus.contains_key(product.sku()) {
            return Err(DomainError::duplicate_sku(product.sku()).into());
        }
        products
            .skus
            .insert(product.sku().to_string(), product.id_typed());
        products
            .by_id
            .insert(product.id_typed(), Arc::new(Mutex::new(product.clone())));
        Ok(product)
    }

    fn update_product_sync(&self, id: ProductId, update: &UpdateProduct) -> StoreResult<Product> {
        // Kept until the write lands so the target category cannot vanish meanwhile.
        let categories = self.read_categories()?;
        if let Some(target) = update.target_category() {
            categories.ensure_exists(target)?;
        }

        let mut guard = self.write_products()?;
        let products = &mut *guard;
        let record = products.record(id)?.clone();
        let mut product = lock_record(&record)?;

        let mut updated = product.clone();
        updated.apply_update(update, Utc::now())?;

        if updated.sku() != product.sku() {
            if products.skus.contains_key(updated.sku()) {
                return Err(DomainError::duplicate_sku(updated.sku()).into());
            }
            products.skus.remove(product.sku());
            products.skus.insert(updated.sku().to_string(), id);
        }

        *product = updated.clone();
        Ok(updated)
    }

    fn delete_product_sync(&self, id: ProductId) -> StoreResult<()> {
        let mut products = self.write_products()?;
        let record = products
            .by_id
            .remove(&id)
            .ok_or_else(|| DomainError::not_found("product", id))?;
        let product = lock_record(&record)?;
        products.skus.remove(product.sku());
        Ok(())
    }

    fn get_product_sync(&self, id: ProductId) -> StoreResult<Product> {
        let products = self.read_products()?;
        let record = products.record(id)?;
        let product = lock_record(record)?;
        Ok(product.clone())
    }

    fn list_products_sync(&self, query: &ProductQuery) -> StoreResult<Vec<Product>> {
        let products = self.read_products()?;
        let mut all = Vec::with_capacity(products.by_id.len());
        for record in products.by_id.values() {
            all.push(lock_record(record)?.clone());
        }
        Ok(query.apply(all))
    }

    fn apply_delta_sync(&self, id: ProductId, delta: i64) -> StoreResult<Product> {
        let products = self.read_products()?;
        let record = products.record(id)?;
        let mut product = lock_record(record)?;
        product.adjust_quantity(delta, Utc::now())?;
        Ok(product.clone())
    }

    fn snapshot_sync(&self) -> StoreResult<Snapshot> {
        let categories = self.read_categories()?;
        let products = self.read_products()?;

        let mut product_rows = Vec::with_capacity(products.by_id.len());
        for record in products.by_id.values() {
            product_rows.push(lock_record(record)?.clone());
        }

        Ok(Snapshot::new(
            categories.by_id.values().cloned().collect(),
            product_rows,
        ))
    }
}

#[async_trait]
impl CategoryStore for InMemoryInventoryStore {
    async fn create_category(&self, cmd: CreateCategory) -> StoreResult<Category> {
        self.create_category_sync(&cmd)
    }

    async fn rename_category(&self, id: CategoryId, cmd: RenameCategory) -> StoreResult<Category> {
        self.rename_category_sync(id, &cmd)
    }

    async fn delete_category(&self, id: CategoryId) -> StoreResult<CategoryDeleted> {
        self.delete_category_sync(id)
    }

    async fn get_category(&self, id: CategoryId) -> StoreResult<Category> {
        self.get_category_sync(id)
    }

    async fn list_categories(&self) -> StoreResult<Vec<Category>> {
        self.list_categories_sync()
    }
}

#[async_trait]
impl ProductStore for InMemoryInventoryStore {
    async fn create_product(&self, cmd: CreateProduct) -> StoreResult<Product> {
        self.create_product_sync(&cmd)
    }

    async fn update_product(&self, id: ProductId, update: UpdateProduct) -> StoreResult<Product> {
        self.update_product_sync(id, &update)
    }

    async fn delete_product(&self, id: ProductId) -> StoreResult<()> {
        self.delete_product_sync(id)
    }

    async fn get_product(&self, id: ProductId) -> StoreResult<Product> {
        self.get_product_sync(id)
    }

    async fn list_products(&self, query: &ProductQuery) -> StoreResult<Vec<Product>> {
        self.list_products_sync(query)
    }

    async fn apply_delta(&self, id: ProductId, delta: i64) -> StoreResult<Product> {
        self.apply_delta_sync(id, delta)
    }
}

#[async_trait]
impl InventoryStore for InMemoryInventoryStore {
    async fn snapshot(&self) -> StoreResult<Snapshot> {
        self.snapshot_sync()
    }
}
