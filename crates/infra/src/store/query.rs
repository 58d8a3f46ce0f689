//! Product listing queries (search, category filter, ordering).

use core::cmp::Ordering;
use core::str::FromStr;

use serde::{Deserialize, Serialize};

use stockroom_core::{CategoryId, DomainError};
use stockroom_products::Product;

/// Restrict a listing to one category, or to products without one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CategoryFilter {
    Category(CategoryId),
    Uncategorized,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderField {
    #[default]
    Name,
    Price,
    Quantity,
    CreatedAt,
}

/// Sort order, parsed from `"price"` / `"-price"` style strings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProductOrdering {
    pub field: OrderField,
    pub descending: bool,
}

impl FromStr for ProductOrdering {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let (descending, name) = match s.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, s),
        };
        let field = match name {
            "name" => OrderField::Name,
            "price" => OrderField::Price,
            "quantity" => OrderField::Quantity,
            "created_at" => OrderField::CreatedAt,
            other => {
                return Err(DomainError::invalid(
                    "ordering",
                    format!(
                        "unknown field '{other}' (expected name, price, quantity or created_at)"
                    ),
                ));
            }
        };
        Ok(Self { field, descending })
    }
}

/// Filter + ordering for [`crate::store::ProductStore::list_products`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProductQuery {
    /// Case-insensitive substring of the name or SKU.
    pub search: Option<String>,
    pub category: Option<CategoryFilter>,
    pub ordering: ProductOrdering,
}

impl ProductQuery {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn search(mut self, term: impl Into<String>) -> Self {
        self.search = Some(term.into());
        self
    }

    pub fn in_category(mut self, filter: CategoryFilter) -> Self {
        self.category = Some(filter);
        self
    }

    pub fn ordered_by(mut self, ordering: ProductOrdering) -> Self {
        self.ordering = ordering;
        self
    }

    /// Search term, trimmed, `None` when blank.
    pub fn search_term(&self) -> Option<&str> {
        self.search.as_deref().map(str::trim).filter(|s| !s.is_empty())
    }

    pub fn matches(&self, product: &Product) -> bool {
        if let Some(term) = self.search_term() {
            let term = term.to_lowercase();
            let hit = product.name().to_lowercase().contains(&term)
                || product.sku().to_lowercase().contains(&term);
            if !hit {
                return false;
            }
        }
        match self.category {
            None => true,
            Some(CategoryFilter::Category(id)) => product.category() == Some(id),
            Some(CategoryFilter::Uncategorized) => product.category().is_none(),
        }
    }

    /// Sort in place; ties fall back to SKU so output is deterministic.
    pub fn sort(&self, products: &mut [Product]) {
        let field = self.ordering.field;
        products.sort_by(|a, b| {
            let primary = match field {
                OrderField::Name => a.name().to_lowercase().cmp(&b.name().to_lowercase()),
                OrderField::Price => a.price().cmp(&b.price()),
                OrderField::Quantity => a.quantity().cmp(&b.quantity()),
                OrderField::CreatedAt => a.created_at().cmp(&b.created_at()),
            };
            let primary = if self.ordering.descending {
                primary.reverse()
            } else {
                primary
            };
            match primary {
                Ordering::Equal => a.sku().cmp(b.sku()),
                other => other,
            }
        });
    }

    /// Filter then sort.
    pub fn apply(&self, products: impl IntoIterator<Item = Product>) -> Vec<Product> {
        let mut out: Vec<Product> = products.into_iter().filter(|p| self.matches(p)).collect();
        self.sort(&mut out);
        out
    }
}
