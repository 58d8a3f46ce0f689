//! Product read view with the category label joined at read time.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use stockroom_core::CategoryId;
use stockroom_products::{Category, Product};

use crate::stock::{StockStatus, status_of};

/// A product as returned to callers.
///
/// `category_name` is looked up from the category store when the view is
/// built. It is display data only and is never written back to the product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductView {
    #[serde(flatten)]
    pub product: Product,
    pub category_name: Option<String>,
    pub status: StockStatus,
    pub is_low_stock: bool,
}

impl ProductView {
    pub fn new(product: Product, category: Option<&Category>) -> Self {
        let status = status_of(&product);
        Self {
            category_name: category.map(|c| c.name().to_string()),
            status,
            is_low_stock: status.is_low(),
            product,
        }
    }

    /// Build the view resolving the category through `index`. A reference
    /// to a category missing from the index resolves to no label.
    pub fn resolve(product: Product, index: &HashMap<CategoryId, &Category>) -> Self {
        let category = product.category().and_then(|id| index.get(&id).copied());
        Self::new(product, category)
    }
}
