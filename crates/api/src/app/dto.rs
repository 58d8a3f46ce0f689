use serde::{Deserialize, Serialize};

use stockroom_core::{CategoryId, DomainError, ProductId};
use stockroom_infra::{CategoryDeleted, CategoryFilter, ProductOrdering, ProductQuery};
use stockroom_inventory::{AdjustStock, Applied, StockStatus};

// -------------------------
// Request DTOs
// -------------------------

#[derive(Debug, Deserialize)]
pub struct AdjustStockRequest {
    #[serde(alias = "delta")]
    pub quantity_change: i64,
    pub reason: String,
}

#[derive(Debug, Deserialize)]
pub struct BatchEntry {
    pub product_id: ProductId,
    #[serde(alias = "delta")]
    pub quantity_change: i64,
    pub reason: String,
}

/// Either an explicit list of adjustments, or one delta applied to many products.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum AdjustBatchRequest {
    Explicit {
        adjustments: Vec<BatchEntry>,
    },
    Uniform {
        product_ids: Vec<ProductId>,
        #[serde(alias = "delta")]
        quantity_change: i64,
        reason: String,
    },
}

impl From<BatchEntry> for AdjustStock {
    fn from(entry: BatchEntry) -> Self {
        AdjustStock::new(entry.product_id, entry.quantity_change, entry.reason)
    }
}

/// `GET /products` query string.
#[derive(Debug, Default, Deserialize)]
pub struct ListProductsParams {
    pub search: Option<String>,
    pub category: Option<String>,
    #[serde(default)]
    pub uncategorized: bool,
    pub ordering: Option<String>,
}

impl ListProductsParams {
    pub fn into_query(self) -> Result<ProductQuery, DomainError> {
        let mut query = ProductQuery::all();
        if let Some(term) = self.search {
            query = query.search(term);
        }
        match (self.uncategorized, self.category.as_deref().map(str::trim)) {
            (true, Some(c)) if !c.is_empty() => {
                return Err(DomainError::invalid(
                    "category",
                    "cannot be combined with uncategorized",
                ));
            }
            (true, _) => query = query.in_category(CategoryFilter::Uncategorized),
            (false, Some(c)) if !c.is_empty() => {
                let id: CategoryId = c.parse()?;
                query = query.in_category(CategoryFilter::Category(id));
            }
            (false, _) => {}
        }
        if let Some(ordering) = self.ordering.as_deref().filter(|o| !o.trim().is_empty()) {
            query = query.ordered_by(ordering.parse::<ProductOrdering>()?);
        }
        Ok(query)
    }
}

// -------------------------
// Response DTOs
// -------------------------

#[derive(Debug, Serialize)]
pub struct AdjustStockResponse {
    pub product_id: ProductId,
    pub quantity_change: i64,
    pub new_quantity: u64,
    pub status: StockStatus,
    pub is_low_stock: bool,
}

impl AdjustStockResponse {
    pub fn new(cmd: &AdjustStock, applied: Applied) -> Self {
        Self {
            product_id: cmd.product_id,
            quantity_change: cmd.delta,
            new_quantity: applied.new_quantity,
            status: applied.status,
            is_low_stock: applied.status.is_low(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CategoryDeletedResponse {
    pub id: CategoryId,
    pub detached_products: u64,
}

impl From<CategoryDeleted> for CategoryDeletedResponse {
    fn from(value: CategoryDeleted) -> Self {
        Self {
            id: value.category_id,
            detached_products: value.detached_products,
        }
    }
}
