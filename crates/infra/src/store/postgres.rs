//! Postgres-backed inventory store.
//!
//! ## Guarantees
//!
//! - `apply_delta` is a single conditional `UPDATE ... RETURNING`; Postgres row
//!   locking makes it linearizable per product without touching other rows.
//! - Name and SKU uniqueness are table constraints, so they hold under
//!   concurrent writers and across processes.
//! - Category deletion relies on `ON DELETE SET NULL`, and runs in a
//!   transaction that also counts the detached products.
//! - Snapshots run in a `REPEATABLE READ READ ONLY` transaction.
//!
//! ## Error Mapping
//!
//! | PostgreSQL error | Constraint | StoreError |
//! |------------------|------------|------------|
//! | `23505` | `categories_name_key_unique` | `DuplicateName` |
//! | `23505` | `products_sku_unique` | `DuplicateSku` |
//! | `23503` | `products_category_id_fkey` | category `NotFound` |
//! | `22003` | n/a | `InvalidInput` on `delta` |
//! | anything else | | `Backend` |

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{FromRow, PgPool, Postgres, Row, Transaction};
use tracing::instrument;

use stockroom_core::{CategoryId, DomainError, Money, ProductId};
use stockroom_inventory::Snapshot;
use stockroom_products::{
    Category, CreateCategory, CreateProduct, Product, ProductParts, RenameCategory, UpdateProduct,
};

use super::{
    CategoryDeleted, CategoryFilter, CategoryStore, InventoryStore, ProductQuery, ProductStore,
};
use crate::error::{StoreError, StoreResult};

const SCHEMA: &str = include_str!("schema.sql");

const PRODUCT_COLUMNS: &str = "id, sku, name, description, price_minor, quantity, category_id, \
     low_stock_threshold, created_at, updated_at";

#[derive(Debug, Clone)]
pub struct PostgresInventoryStore {
    pool: Arc<PgPool>,
}

impl PostgresInventoryStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }

    /// Open a pool against `database_url`.
    pub async fn connect(database_url: &str, max_connections: u32) -> StoreResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await
            .map_err(|e| map_sqlx_error("connect", e))?;
        Ok(Self::new(pool))
    }

    /// Create tables and constraints if they do not exist yet.
    #[instrument(skip(self), err)]
    pub async fn ensure_schema(&self) -> StoreResult<()> {
        sqlx::raw_sql(SCHEMA)
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("ensure_schema", e))?;
        Ok(())
    }

    async fn begin(&self, operation: &str) -> StoreResult<Transaction<'static, Postgres>> {
        self.pool.begin().await.map_err(|e| map_sqlx_error(operation, e))
    }

    async fn fetch_category(&self, id: CategoryId) -> StoreResult<Option<Category>> {
        let row = sqlx::query("SELECT id, name, created_at FROM categories WHERE id = $1")
            .bind(id.as_uuid())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("get_category", e))?;
        row.map(|r| decode_category(&r)).transpose()
    }

    async fn fetch_product(&self, id: ProductId) -> StoreResult<Option<Product>> {
        let row = sqlx::query(&format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1"))
            .bind(id.as_uuid())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("get_product", e))?;
        row.map(|r| decode_product(&r)).transpose()
    }
}

#[async_trait]
impl CategoryStore for PostgresInventoryStore {
    #[instrument(skip(self, cmd), fields(name = %cmd.name), err)]
    async fn create_category(&self, cmd: CreateCategory) -> StoreResult<Category> {
        let category = Category::create(CategoryId::new(), &cmd, Utc::now())?;

        sqlx::query("INSERT INTO categories (id, name, name_key, created_at) VALUES ($1, $2, $3, $4)")
            .bind(category.id_typed().as_uuid())
            .bind(category.name())
            .bind(category.name_key())
            .bind(category.created_at())
            .execute(&*self.pool)
            .await
            .map_err(|e| map_write_error("create_category", e, Subject::Category(&category)))?;

        Ok(category)
    }

    #[instrument(skip(self, cmd), fields(category_id = %id), err)]
    async fn rename_category(&self, id: CategoryId, cmd: RenameCategory) -> StoreResult<Category> {
        let mut category = self
            .fetch_category(id)
            .await?
            .ok_or_else(|| DomainError::not_found("category", id))?;
        category.rename(&cmd.name)?;

        let updated = sqlx::query("UPDATE categories SET name = $2, name_key = $3 WHERE id = $1")
            .bind(id.as_uuid())
            .bind(category.name())
            .bind(category.name_key())
            .execute(&*self.pool)
            .await
            .map_err(|e| map_write_error("rename_category", e, Subject::Category(&category)))?;

        // Deleted between the read and the write.
        if updated.rows_affected() == 0 {
            return Err(DomainError::not_found("category", id).into());
        }
        Ok(category)
    }

    #[instrument(skip(self), fields(category_id = %id), err)]
    async fn delete_category(&self, id: CategoryId) -> StoreResult<CategoryDeleted> {
        let mut tx = self.begin("delete_category").await?;

        let detached = sqlx::query("UPDATE products SET category_id = NULL WHERE category_id = $1")
            .bind(id.as_uuid())
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("detach_products", e))?
            .rows_affected();

        let deleted = sqlx::query("DELETE FROM categories WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("delete_category", e))?
            .rows_affected();

        if deleted == 0 {
            tx.rollback().await.map_err(|e| map_sqlx_error("rollback", e))?;
            return Err(DomainError::not_found("category", id).into());
        }

        tx.commit().await.map_err(|e| map_sqlx_error("commit", e))?;
        Ok(CategoryDeleted {
            category_id: id,
            detached_products: detached,
        })
    }

    async fn get_category(&self, id: CategoryId) -> StoreResult<Category> {
        self.fetch_category(id)
            .await?
            .ok_or_else(|| DomainError::not_found("category", id).into())
    }

    async fn list_categories(&self) -> StoreResult<Vec<Category>> {
        let rows = sqlx::query("SELECT id, name, created_at FROM categories ORDER BY name_key")
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("list_categories", e))?;
        rows.iter().map(decode_category).collect()
    }
}

#[async_trait]
impl ProductStore for PostgresInventoryStore {
    #[instrument(skip(self, cmd), fields(sku = %cmd.sku), err)]
    async fn create_product(&self, cmd: CreateProduct) -> StoreResult<Product> {
        let product = Product::create(ProductId::new(), &cmd, Utc::now())?;
        let quantity = to_db_quantity(product.quantity())?;

        sqlx::query(&format!(
            "INSERT INTO products ({PRODUCT_COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)"
        ))
        .bind(product.id_typed().as_uuid())
        .bind(product.sku())
        .bind(product.name())
        .bind(product.description())
        .bind(product.price().minor() as i64)
        .bind(quantity)
        .bind(product.category().map(|c| *c.as_uuid()))
        .bind(i64::from(product.low_stock_threshold()))
        .bind(product.created_at())
        .bind(product.updated_at())
        .execute(&*self.pool)
        .await
        .map_err(|e| map_write_error("create_product", e, Subject::Product(&product)))?;

        Ok(product)
    }

    #[instrument(skip(self, update), fields(product_id = %id), err)]
    async fn update_product(&self, id: ProductId, update: UpdateProduct) -> StoreResult<Product> {
        let mut tx = self.begin("update_product").await?;

        let row = sqlx::query(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1 FOR UPDATE"
        ))
        .bind(id.as_uuid())
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("lock_product", e))?;

        let Some(row) = row else {
            tx.rollback().await.map_err(|e| map_sqlx_error("rollback", e))?;
            return Err(DomainError::not_found("product", id).into());
        };
        let mut product = decode_product(&row)?;
        product.apply_update(&update, Utc::now())?;

        sqlx::query(
            r#"
            UPDATE products
            SET sku = $2,
                name = $3,
                description = $4,
                price_minor = $5,
                category_id = $6,
                low_stock_threshold = $7,
                updated_at = $8
            WHERE id = $1
            "#,
        )
        .bind(id.as_uuid())
        .bind(product.sku())
        .bind(product.name())
        .bind(product.description())
        .bind(product.price().minor() as i64)
        .bind(product.category().map(|c| *c.as_uuid()))
        .bind(i64::from(product.low_stock_threshold()))
        .bind(product.updated_at())
        .execute(&mut *tx)
        .await
        .map_err(|e| map_write_error("update_product", e, Subject::Product(&product)))?;

        tx.commit().await.map_err(|e| map_sqlx_error("commit", e))?;
        Ok(product)
    }

    #[instrument(skip(self), fields(product_id = %id), err)]
    async fn delete_product(&self, id: ProductId) -> StoreResult<()> {
        let deleted = sqlx::query("DELETE FROM products WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete_product", e))?
            .rows_affected();
        if deleted == 0 {
            return Err(DomainError::not_found("product", id).into());
        }
        Ok(())
    }

    async fn get_product(&self, id: ProductId) -> StoreResult<Product> {
        self.fetch_product(id)
            .await?
            .ok_or_else(|| DomainError::not_found("product", id).into())
    }

    async fn list_products(&self, query: &ProductQuery) -> StoreResult<Vec<Product>> {
        let (category, uncategorized) = match query.category {
            None => (None, false),
            Some(CategoryFilter::Category(id)) => (Some(*id.as_uuid()), false),
            Some(CategoryFilter::Uncategorized) => (None, true),
        };

        let rows = sqlx::query(&format!(
            r#"
            SELECT {PRODUCT_COLUMNS}
            FROM products
            WHERE ($1::text IS NULL
                   OR strpos(lower(name), lower($1)) > 0
                   OR strpos(lower(sku), lower($1)) > 0)
              AND ($2::uuid IS NULL OR category_id = $2)
              AND (NOT $3::bool OR category_id IS NULL)
            "#
        ))
        .bind(query.search_term())
        .bind(category)
        .bind(uncategorized)
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_products", e))?;

        let mut products = rows.iter().map(decode_product).collect::<StoreResult<Vec<_>>>()?;
        // Same collation rules as the in-memory backend.
        query.sort(&mut products);
        Ok(products)
    }

    #[instrument(skip(self), fields(product_id = %id), err)]
    async fn apply_delta(&self, id: ProductId, delta: i64) -> StoreResult<Product> {
        let row = sqlx::query(&format!(
            r#"
            UPDATE products
            SET quantity = quantity + $2, updated_at = $3
            WHERE id = $1 AND quantity + $2 >= 0
            RETURNING {PRODUCT_COLUMNS}
            "#
        ))
        .bind(id.as_uuid())
        .bind(delta)
        .bind(Utc::now())
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("apply_delta", e))?;

        if let Some(row) = row {
            return decode_product(&row);
        }

        // Nothing updated: either the product is gone or the stock is short.
        match self.fetch_product(id).await? {
            None => Err(DomainError::not_found("product", id).into()),
            Some(current) => {
                Err(DomainError::insufficient_stock(id, current.quantity(), delta).into())
            }
        }
    }
}

#[async_trait]
impl InventoryStore for PostgresInventoryStore {
    #[instrument(skip(self), err)]
    async fn snapshot(&self) -> StoreResult<Snapshot> {
        let mut tx = self.begin("snapshot").await?;
        sqlx::query("SET TRANSACTION ISOLATION LEVEL REPEATABLE READ READ ONLY")
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("snapshot_isolation", e))?;

        let category_rows = sqlx::query("SELECT id, name, created_at FROM categories")
            .fetch_all(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("snapshot_categories", e))?;
        let product_rows = sqlx::query(&format!("SELECT {PRODUCT_COLUMNS} FROM products"))
            .fetch_all(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("snapshot_products", e))?;

        tx.commit().await.map_err(|e| map_sqlx_error("commit", e))?;

        let categories = category_rows.iter().map(decode_category).collect::<StoreResult<_>>()?;
        let products = product_rows.iter().map(decode_product).collect::<StoreResult<_>>()?;
        Ok(Snapshot::new(categories, products))
    }
}

fn to_db_quantity(quantity: u64) -> StoreResult<i64> {
    i64::try_from(quantity)
        .map_err(|_| DomainError::invalid("quantity", "exceeds the storable maximum").into())
}

// SQLx row types

#[derive(Debug)]
struct CategoryRow {
    id: uuid::Uuid,
    name: String,
    created_at: DateTime<Utc>,
}

impl<'r> FromRow<'r, PgRow> for CategoryRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(CategoryRow {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            created_at: row.try_get("created_at")?,
        })
    }
}

impl From<CategoryRow> for Category {
    fn from(row: CategoryRow) -> Self {
        Category::restore(CategoryId::from_uuid(row.id), row.name, row.created_at)
    }
}

#[derive(Debug)]
struct ProductRow {
    id: uuid::Uuid,
    sku: String,
    name: String,
    description: String,
    price_minor: i64,
    quantity: i64,
    category_id: Option<uuid::Uuid>,
    low_stock_threshold: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl<'r> FromRow<'r, PgRow> for ProductRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(ProductRow {
            id: row.try_get("id")?,
            sku: row.try_get("sku")?,
            name: row.try_get("name")?,
            description: row.try_get("description")?,
            price_minor: row.try_get("price_minor")?,
            quantity: row.try_get("quantity")?,
            category_id: row.try_get("category_id")?,
            low_stock_threshold: row.try_get("low_stock_threshold")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

impl TryFrom<ProductRow> for Product {
    type Error = StoreError;

    fn try_from(row: ProductRow) -> Result<Self, Self::Error> {
        let corrupt =
            |column: &str| StoreError::backend(format!("product {} has invalid {column}", row.id));
        Ok(Product::restore(ProductParts {
            id: ProductId::from_uuid(row.id),
            price: Money::from_minor(
                u64::try_from(row.price_minor).map_err(|_| corrupt("price_minor"))?,
            ),
            quantity: u64::try_from(row.quantity).map_err(|_| corrupt("quantity"))?,
            low_stock_threshold: u32::try_from(row.low_stock_threshold)
                .map_err(|_| corrupt("low_stock_threshold"))?,
            category: row.category_id.map(CategoryId::from_uuid),
            sku: row.sku,
            name: row.name,
            description: row.description,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }))
    }
}

fn decode_category(row: &PgRow) -> StoreResult<Category> {
    CategoryRow::from_row(row)
        .map(Category::from)
        .map_err(|e| StoreError::backend(format!("failed to decode category row: {e}")))
}

fn decode_product(row: &PgRow) -> StoreResult<Product> {
    let row = ProductRow::from_row(row)
        .map_err(|e| StoreError::backend(format!("failed to decode product row: {e}")))?;
    Product::try_from(row)
}

/// The record a write was about, for turning constraint violations into domain errors.
enum Subject<'a> {
    Category(&'a Category),
    Product(&'a Product),
}

fn map_write_error(operation: &str, err: sqlx::Error, subject: Subject<'_>) -> StoreError {
    if let sqlx::Error::Database(db_err) = &err {
        match (db_err.constraint(), subject) {
            (Some("categories_name_key_unique"), Subject::Category(c)) => {
                return DomainError::duplicate_name(c.name()).into();
            }
            (Some("products_sku_unique"), Subject::Product(p)) => {
                return DomainError::duplicate_sku(p.sku()).into();
            }
            (Some("products_category_id_fkey"), Subject::Product(p)) => {
                let id = p.category().map(|c| c.to_string()).unwrap_or_default();
                return DomainError::not_found("category", id).into();
            }
            _ => {}
        }
    }
    map_sqlx_error(operation, err)
}

fn map_sqlx_error(operation: &str, err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db_err) => match db_err.code().as_deref() {
            // numeric_value_out_of_range: quantity + delta left BIGINT
            Some("22003") => DomainError::invalid("delta", "quantity would overflow").into(),
            _ => StoreError::backend(format!(
                "database error in {operation}: {}",
                db_err.message()
            )),
        },
        sqlx::Error::PoolClosed => {
            StoreError::backend(format!("connection pool closed in {operation}"))
        }
        other => StoreError::backend(format!("sqlx error in {operation}: {other}")),
    }
}

#[cfg(test)]
mod tests {
    //! Run against a scratch database:
    //! `STOCKROOM_TEST_DATABASE_URL=postgres://... cargo test -p stockroom-infra`.
    //! Skipped when the variable is unset.

    use super::*;
    use stockroom_core::ErrorKind;

    async fn store() -> Option<PostgresInventoryStore> {
        let url = std::env::var("STOCKROOM_TEST_DATABASE_URL").ok()?;
        let store = PostgresInventoryStore::connect(&url, 5).await.unwrap();
        store.ensure_schema().await.unwrap();
        Some(store)
    }

    fn unique(prefix: &str) -> String {
        format!("{prefix}-{}", uuid::Uuid::now_v7().simple())
    }

    fn product(sku: &str, quantity: u64, category: Option<CategoryId>) -> CreateProduct {
        CreateProduct {
            sku: sku.to_string(),
            name: format!("Product {sku}"),
            description: None,
            price: Money::parse("4.25").unwrap().to_decimal(),
            quantity,
            category_id: category,
            low_stock_threshold: Some(3),
        }
    }

    #[tokio::test]
    async fn apply_delta_is_conditional() {
        let Some(store) = store().await else { return };
        let p = store.create_product(product(&unique("PG"), 5, None)).await.unwrap();

        let after = store.apply_delta(p.id_typed(), -5).await.unwrap();
        assert_eq!(after.quantity(), 0);

        let err = store.apply_delta(p.id_typed(), -1).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InsufficientStock);
        assert_eq!(store.get_product(p.id_typed()).await.unwrap().quantity(), 0);

        let err = store.apply_delta(ProductId::new(), 1).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn constraint_violations_become_domain_errors() {
        let Some(store) = store().await else { return };
        let name = unique("Cat");
        let cat = store
            .create_category(CreateCategory { name: name.clone() })
            .await
            .unwrap();
        let err = store
            .create_category(CreateCategory {
                name: name.to_uppercase(),
            })
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DuplicateName);

        let sku = unique("SKU");
        store.create_product(product(&sku, 1, Some(cat.id_typed()))).await.unwrap();
        let err = store.create_product(product(&sku, 1, None)).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DuplicateSku);

        let err = store
            .create_product(product(&unique("SKU"), 1, Some(CategoryId::new())))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn delete_category_detaches_products() {
        let Some(store) = store().await else { return };
        let cat = store
            .create_category(CreateCategory { name: unique("Cat") })
            .await
            .unwrap();
        let a = store.create_product(product(&unique("A"), 1, Some(cat.id_typed()))).await.unwrap();
        let b = store.create_product(product(&unique("B"), 1, Some(cat.id_typed()))).await.unwrap();

        let deleted = store.delete_category(cat.id_typed()).await.unwrap();
        assert_eq!(deleted.detached_products, 2);
        for id in [a.id_typed(), b.id_typed()] {
            assert_eq!(store.get_product(id).await.unwrap().category(), None);
        }
        let err = store.delete_category(cat.id_typed()).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn update_round_trips_every_field() {
        let Some(store) = store().await else { return };
        let p = store.create_product(product(&unique("U"), 7, None)).await.unwrap();
        let updated = store
            .update_product(
                p.id_typed(),
                UpdateProduct {
                    name: Some("Renamed".to_string()),
                    price: Some(Money::parse("9.99").unwrap().to_decimal()),
                    low_stock_threshold: Some(10),
                    ..UpdateProduct::default()
                },
            )
            .await
            .unwrap();
        let fetched = store.get_product(p.id_typed()).await.unwrap();
        assert_eq!(fetched.name(), "Renamed");
        assert_eq!(fetched.price(), Money::parse("9.99").unwrap());
        assert_eq!(fetched.low_stock_threshold(), 10);
        assert_eq!(fetched.quantity(), 7);
        assert_eq!(fetched.sku(), updated.sku());
    }
}
