//! Reporting Aggregator: reports computed from one store snapshot.

use std::sync::Arc;

use tracing::{debug, instrument};

use stockroom_inventory::{
    CategoryWithCount, InventoryReport, LowStockReport, category_counts, low_stock, summarize,
};

use crate::error::StoreResult;
use crate::store::InventoryStore;

/// Recomputes every figure from a fresh snapshot on each call.
pub struct ReportingAggregator<S> {
    store: Arc<S>,
}

impl<S> Clone for ReportingAggregator<S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
        }
    }
}

impl<S: InventoryStore> ReportingAggregator<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Totals, low-stock count and the per-category breakdown.
    ///
    /// Stale category references land in the "Uncategorized" bucket; only a
    /// storage failure makes this fail.
    #[instrument(skip(self), err)]
    pub async fn summarize(&self) -> StoreResult<InventoryReport> {
        let snapshot = self.store.snapshot().await?;
        debug!(
            products = snapshot.products.len(),
            categories = snapshot.categories.len(),
            "snapshot taken"
        );
        Ok(summarize(&snapshot))
    }

    #[instrument(skip(self), err)]
    pub async fn low_stock(&self) -> StoreResult<LowStockReport> {
        let snapshot = self.store.snapshot().await?;
        Ok(low_stock(&snapshot))
    }

    /// Categories ordered by name, each with its product count.
    pub async fn categories_with_counts(&self) -> StoreResult<Vec<CategoryWithCount>> {
        let snapshot = self.store.snapshot().await?;
        Ok(category_counts(&snapshot))
    }
}
