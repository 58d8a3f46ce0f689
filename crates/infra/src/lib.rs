//! Infrastructure layer: stores, the adjustment engine, reporting and config.

pub mod catalog;
pub mod config;
pub mod engine;
pub mod error;
pub mod reporting;
pub mod store;

pub use catalog::CatalogReader;
pub use config::{AppConfig, ConfigError, StoreBackend};
pub use engine::StockAdjustmentEngine;
pub use error::{StoreError, StoreResult};
pub use reporting::ReportingAggregator;
pub use store::{
    CategoryDeleted, CategoryFilter, CategoryStore, InMemoryInventoryStore, InventoryStore,
    OrderField, PostgresInventoryStore, ProductOrdering, ProductQuery, ProductStore,
};
