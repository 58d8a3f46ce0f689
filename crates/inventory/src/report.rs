//! Inventory reporting over a point-in-time snapshot.
//!
//! Everything here is a pure function of a [`Snapshot`]; the store decides how
//! the snapshot is taken consistently.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stockroom_core::{CategoryId, Money};
use stockroom_products::{Category, Product};

use crate::stock::status_of;
use crate::view::ProductView;

/// Label of the bucket holding products without a resolvable category.
pub const UNCATEGORIZED: &str = "Uncategorized";

/// Consistent point-in-time view of all categories and products.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    pub categories: Vec<Category>,
    pub products: Vec<Product>,
    pub taken_at: DateTime<Utc>,
}

impl Snapshot {
    pub fn new(categories: Vec<Category>, products: Vec<Product>) -> Self {
        Self {
            categories,
            products,
            taken_at: Utc::now(),
        }
    }

    /// Category lookup keyed by id.
    pub fn category_index(&self) -> HashMap<CategoryId, &Category> {
        self.categories.iter().map(|c| (c.id_typed(), c)).collect()
    }
}

/// Per-category totals.
///
/// `category_id` is `None` for the uncategorized bucket, so a real category
/// that happens to be named "Uncategorized" stays a separate entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryBreakdown {
    pub category_id: Option<CategoryId>,
    pub name: String,
    pub product_count: usize,
    pub units: u64,
    pub value: Money,
    pub low_stock_items: usize,
}

impl CategoryBreakdown {
    fn empty(category_id: Option<CategoryId>, name: String) -> Self {
        Self {
            category_id,
            name,
            product_count: 0,
            units: 0,
            value: Money::ZERO,
            low_stock_items: 0,
        }
    }
}

/// Summary metrics over the whole catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryReport {
    pub total_value: Money,
    pub total_units: u64,
    pub low_stock_count: usize,
    pub product_count: usize,
    pub category_count: usize,
    pub categories: Vec<CategoryBreakdown>,
    pub generated_at: DateTime<Utc>,
}

/// Products currently at or below their threshold.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LowStockReport {
    pub count: usize,
    pub products: Vec<ProductView>,
}

/// A category with the number of products referencing it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryWithCount {
    #[serde(flatten)]
    pub category: Category,
    pub product_count: usize,
}

/// Compute the summary report in one pass over the snapshot.
///
/// Products whose category reference is null or points at a category missing
/// from the snapshot land in the [`UNCATEGORIZED`] bucket.
pub fn summarize(snapshot: &Snapshot) -> InventoryReport {
    let index = snapshot.category_index();

    let mut total_value = Money::ZERO;
    let mut total_units: u64 = 0;
    let mut low_stock_count = 0;
    let mut buckets: HashMap<Option<CategoryId>, CategoryBreakdown> = HashMap::new();

    for product in &snapshot.products {
        let value = product.stock_value();
        let low = status_of(product).is_low();

        total_value = total_value.saturating_add(value);
        total_units = total_units.saturating_add(product.quantity());
        if low {
            low_stock_count += 1;
        }

        let resolved = product
            .category()
            .and_then(|id| index.get(&id).map(|c| (id, c.name())));
        let key = resolved.map(|(id, _)| id);
        let bucket = buckets.entry(key).or_insert_with(|| {
            let name = resolved.map_or(UNCATEGORIZED, |(_, name)| name);
            CategoryBreakdown::empty(key, name.to_string())
        });

        bucket.product_count += 1;
        bucket.units = bucket.units.saturating_add(product.quantity());
        bucket.value = bucket.value.saturating_add(value);
        if low {
            bucket.low_stock_items += 1;
        }
    }

    let mut categories: Vec<CategoryBreakdown> = buckets.into_values().collect();
    // Named categories alphabetically, the uncategorized bucket last.
    categories.sort_by(|a, b| {
        a.category_id
            .is_none()
            .cmp(&b.category_id.is_none())
            .then_with(|| a.name.to_lowercase().cmp(&b.name.to_lowercase()))
            .then_with(|| a.category_id.cmp(&b.category_id))
    });

    InventoryReport {
        total_value,
        total_units,
        low_stock_count,
        product_count: snapshot.products.len(),
        category_count: snapshot.categories.len(),
        categories,
        generated_at: snapshot.taken_at,
    }
}

/// Every low-stock product, lowest quantity first.
pub fn low_stock(snapshot: &Snapshot) -> LowStockReport {
    let index = snapshot.category_index();

    let mut products: Vec<ProductView> = snapshot
        .products
        .iter()
        .filter(|p| status_of(p).is_low())
        .map(|p| ProductView::resolve(p.clone(), &index))
        .collect();
    products.sort_by(|a, b| {
        a.product
            .quantity()
            .cmp(&b.product.quantity())
            .then_with(|| a.product.name().cmp(b.product.name()))
    });

    LowStockReport {
        count: products.len(),
        products,
    }
}

/// Categories ordered by name, each with its product count.
pub fn category_counts(snapshot: &Snapshot) -> Vec<CategoryWithCount> {
    let mut counts: HashMap<CategoryId, usize> = HashMap::new();
    for product in &snapshot.products {
        if let Some(id) = product.category() {
            *counts.entry(id).or_default() += 1;
        }
    }

    let mut out: Vec<CategoryWithCount> = snapshot
        .categories
        .iter()
        .map(|c| CategoryWithCount {
            category: c.clone(),
            product_count: counts.get(&c.id_typed()).copied().unwrap_or(0),
        })
        .collect();
    out.sort_by_key(|c| c.category.name_key());
    out
}
