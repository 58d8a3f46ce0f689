//! Product read views: products joined with their category label at read time.

use std::collections::HashMap;
use std::sync::Arc;

use stockroom_core::{ErrorKind, ProductId};
use stockroom_inventory::ProductView;
use stockroom_products::Category;

use crate::error::StoreResult;
use crate::store::{InventoryStore, ProductQuery};

pub struct CatalogReader<S> {
    store: Arc<S>,
}

impl<S> Clone for CatalogReader<S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
        }
    }
}

impl<S: InventoryStore> CatalogReader<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// One product with its category label.
    ///
    /// A reference to a category that no longer exists resolves to no label;
    /// any other store failure is returned.
    pub async fn product_view(&self, id: ProductId) -> StoreResult<ProductView> {
        let product = self.store.get_product(id).await?;
        let category = match product.category() {
            Some(category_id) => match self.store.get_category(category_id).await {
                Ok(category) => Some(category),
                Err(err) if err.kind() == ErrorKind::NotFound => None,
                Err(err) => return Err(err),
            },
            None => None,
        };
        Ok(ProductView::new(product, category.as_ref()))
    }

    /// Listing with labels. Categories are read once for the whole page.
    pub async fn product_views(&self, query: &ProductQuery) -> StoreResult<Vec<ProductView>> {
        let products = self.store.list_products(query).await?;
        let categories = self.store.list_categories().await?;
        let index: HashMap<_, &Category> = categories.iter().map(|c| (c.id_typed(), c)).collect();
        Ok(products
            .into_iter()
            .map(|p| ProductView::resolve(p, &index))
            .collect())
    }
}
