//! Low-stock classification.
//!
//! The single place that decides whether a product is low on stock. Both the
//! adjustment engine's outcomes and the reports call into it so the `<=`
//! comparison cannot drift between write and read paths.

use serde::{Deserialize, Serialize};

use stockroom_products::Product;

/// Derived stock status. Never stored.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StockStatus {
    InStock,
    LowStock,
}

impl StockStatus {
    pub fn is_low(self) -> bool {
        self == StockStatus::LowStock
    }
}

/// `LowStock` when `quantity <= threshold`, `InStock` otherwise.
pub fn classify(quantity: u64, threshold: u32) -> StockStatus {
    if quantity <= u64::from(threshold) {
        StockStatus::LowStock
    } else {
        StockStatus::InStock
    }
}

pub fn status_of(product: &Product) -> StockStatus {
    classify(product.quantity(), product.low_stock_threshold())
}
