//! Inventory domain module: stock status, adjustments and reporting.
//!
//! This crate contains the stock rules shared by the adjustment engine and the
//! reports, implemented purely as deterministic domain logic (no IO, no HTTP,
//! no storage).

pub mod adjustment;
pub mod report;
pub mod stock;
pub mod view;

pub use adjustment::{
    AdjustStock, AdjustmentOutcome, Applied, BatchAdjustmentResult, BatchItem, MAX_REASON_LEN,
};
pub use report::{
    CategoryBreakdown, CategoryWithCount, InventoryReport, LowStockReport, Snapshot,
    UNCATEGORIZED, category_counts, low_stock, summarize,
};
pub use stock::{StockStatus, classify, status_of};
pub use view::ProductView;
