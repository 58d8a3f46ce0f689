//! Stock Adjustment Engine.
//!
//! The only path that changes a product's quantity. Single adjustments go
//! straight to [`ProductStore::apply_delta`]; batches fan out one task per
//! request and join them back in submission order.

use std::sync::Arc;

use tracing::{info, instrument, warn};

use stockroom_core::{ErrorKind, ProductId};
use stockroom_inventory::{
    AdjustStock, Applied, AdjustmentOutcome, BatchAdjustmentResult, BatchItem, status_of,
};

use crate::error::StoreResult;
use crate::store::ProductStore;

pub struct StockAdjustmentEngine<S> {
    store: Arc<S>,
}

impl<S> Clone for StockAdjustmentEngine<S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
        }
    }
}

impl<S> StockAdjustmentEngine<S>
where
    S: ProductStore + 'static,
{
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Apply one adjustment atomically.
    ///
    /// Fails with `InvalidInput` (zero delta, blank reason), `NotFound` or
    /// `InsufficientStock`; on failure the stored quantity is unchanged.
    #[instrument(
        skip(self, cmd),
        fields(product_id = %cmd.product_id, delta = cmd.delta, reason = %cmd.reason),
        err
    )]
    pub async fn adjust(&self, cmd: AdjustStock) -> StoreResult<Applied> {
        apply_one(self.store.as_ref(), &cmd).await
    }

    /// Apply every request independently and report each outcome in input order.
    ///
    /// There is no batch-wide transaction: a failed item never blocks or undoes
    /// another. Items run in parallel; two items on the same product are still
    /// serialized by the store. Once submitted, every item runs to completion
    /// even if the caller stops waiting.
    #[instrument(skip(self, requests), fields(items = requests.len()))]
    pub async fn adjust_batch(&self, requests: Vec<AdjustStock>) -> BatchAdjustmentResult {
        let handles: Vec<_> = requests
            .iter()
            .cloned()
            .map(|cmd| {
                let store = self.store.clone();
                tokio::spawn(async move { apply_one(store.as_ref(), &cmd).await })
            })
            .collect();

        let mut items = Vec::with_capacity(requests.len());
        for (cmd, handle) in requests.into_iter().zip(handles) {
            let outcome = match handle.await {
                Ok(Ok(applied)) => AdjustmentOutcome::from(applied),
                Ok(Err(err)) => AdjustmentOutcome::failed(err.kind(), err.to_string()),
                Err(join_err) => {
                    warn!(
                        product_id = %cmd.product_id,
                        error = %join_err,
                        "batch item task failed"
                    );
                    AdjustmentOutcome::failed(
                        ErrorKind::Storage,
                        format!("adjustment task failed: {join_err}"),
                    )
                }
            };
            items.push(BatchItem {
                product_id: cmd.product_id,
                delta: cmd.delta,
                reason: cmd.reason,
                outcome,
            });
        }

        let result = BatchAdjustmentResult::from_items(items);
        info!(applied = result.applied, failed = result.failed, "batch adjustment finished");
        result
    }

    /// Same delta and reason for every listed product.
    pub async fn adjust_many(
        &self,
        product_ids: Vec<ProductId>,
        delta: i64,
        reason: &str,
    ) -> BatchAdjustmentResult {
        let requests = product_ids
            .into_iter()
            .map(|id| AdjustStock::new(id, delta, reason))
            .collect();
        self.adjust_batch(requests).await
    }
}

async fn apply_one<S>(store: &S, cmd: &AdjustStock) -> StoreResult<Applied>
where
    S: ProductStore + ?Sized,
{
    if let Err(err) = cmd.validate() {
        warn!(product_id = %cmd.product_id, delta = cmd.delta, error = %err, "adjustment rejected");
        return Err(err.into());
    }

    match store.apply_delta(cmd.product_id, cmd.delta).await {
        Ok(product) => {
            let applied = Applied {
                new_quantity: product.quantity(),
                status: status_of(&product),
            };
            info!(
                product_id = %cmd.product_id,
                delta = cmd.delta,
                reason = %cmd.reason.trim(),
                new_quantity = applied.new_quantity,
                status = ?applied.status,
                "stock adjusted"
            );
            Ok(applied)
        }
        Err(err) => {
            warn!(
                product_id = %cmd.product_id,
                delta = cmd.delta,
                reason = %cmd.reason.trim(),
                error = %err,
                "adjustment rejected"
            );
            Err(err)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{InMemoryInventoryStore, InventoryStore};
    use stockroom_core::Money;
    use stockroom_inventory::StockStatus;
    use stockroom_products::CreateProduct;

    async fn seeded(quantities: &[u64]) -> (Arc<InMemoryInventoryStore>, Vec<ProductId>) {
        let store = Arc::new(InMemoryInventoryStore::new());
        let mut ids = Vec::new();
        for (i, q) in quantities.iter().enumerate() {
            let p = store
                .create_product(CreateProduct {
                    sku: format!("SKU-{i}"),
                    name: format!("Item {i}"),
                    description: None,
                    price: Money::parse("1.00").unwrap().to_decimal(),
                    quantity: *q,
                    category_id: None,
                    low_stock_threshold: None,
                })
                .await
                .unwrap();
            ids.push(p.id_typed());
        }
        (store, ids)
    }

    #[tokio::test]
    async fn adjust_down_to_low_stock_then_reject_overdraw() {
        let (store, ids) = seeded(&[10]).await;
        let engine = StockAdjustmentEngine::new(store.clone());
        let a = ids[0];

        let applied = engine.adjust(AdjustStock::new(a, -7, "Sale")).await.unwrap();
        assert_eq!(applied.new_quantity, 3);
        assert_eq!(applied.status, StockStatus::LowStock);

        let err = engine.adjust(AdjustStock::new(a, -5, "Sale")).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InsufficientStock);
        assert_eq!(store.get_product(a).await.unwrap().quantity(), 3);
    }

    #[tokio::test]
    async fn invalid_requests_never_reach_the_store() {
        let (store, ids) = seeded(&[10]).await;
        let engine = StockAdjustmentEngine::new(store.clone());

        let err = engine.adjust(AdjustStock::new(ids[0], 0, "Count")).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
        let err = engine.adjust(AdjustStock::new(ids[0], 4, " ")).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);

        let product = store.get_product(ids[0]).await.unwrap();
        assert_eq!(product.quantity(), 10);
        assert_eq!(product.updated_at(), product.created_at());
    }

    #[tokio::test]
    async fn batch_reports_partial_success_in_input_order() {
        let (store, ids) = seeded(&[10, 2, 0]).await;
        let engine = StockAdjustmentEngine::new(store.clone());
        let missing = ProductId::new();

        let result = engine
            .adjust_batch(vec![
                AdjustStock::new(ids[0], -4, "Sale"),
                AdjustStock::new(ids[1], -3, "Sale"),
                AdjustStock::new(missing, 5, "Restock"),
                AdjustStock::new(ids[2], 20, "Restock"),
                AdjustStock::new(ids[0], 0, "Noop"),
            ])
            .await;

        assert_eq!(result.applied, 2);
        assert_eq!(result.failed, 3);
        let kinds: Vec<_> = result.items.iter().map(|i| i.outcome.error_kind()).collect();
        assert_eq!(
            kinds,
            [
                None,
                Some(ErrorKind::InsufficientStock),
                Some(ErrorKind::NotFound),
                None,
                Some(ErrorKind::InvalidInput),
            ]
        );
        assert_eq!(result.items[2].product_id, missing);
        assert_eq!(
            result.items[3].outcome,
            AdjustmentOutcome::Applied {
                new_quantity: 20,
                status: StockStatus::InStock
            }
        );

        // The failed items left their products untouched.
        assert_eq!(store.get_product(ids[0]).await.unwrap().quantity(), 6);
        assert_eq!(store.get_product(ids[1]).await.unwrap().quantity(), 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn applied_deltas_match_net_quantity_change() {
        let (store, ids) = seeded(&[5, 5, 5]).await;
        let engine = StockAdjustmentEngine::new(store.clone());

        let before: u64 = {
            let snap = store.snapshot().await.unwrap();
            snap.products.iter().map(|p| p.quantity()).sum()
        };

        let mut requests = Vec::new();
        for round in 0..30i64 {
            let id = ids[(round % 3) as usize];
            let delta = if round % 4 == 0 { -6 } else { 2 };
            requests.push(AdjustStock::new(id, delta, "Cycle count"));
        }
        let result = engine.adjust_batch(requests).await;

        let after: u64 = {
            let snap = store.snapshot().await.unwrap();
            snap.products.iter().map(|p| p.quantity()).sum()
        };
        assert_eq!(after as i64 - before as i64, result.applied_delta());
        assert_eq!(result.items.len(), 30);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_batches_do_not_lose_updates() {
        let (store, ids) = seeded(&[100]).await;
        let engine = StockAdjustmentEngine::new(store.clone());

        let mut batches = Vec::new();
        for _ in 0..8 {
            let engine = engine.clone();
            let id = ids[0];
            batches.push(tokio::spawn(async move {
                engine
                    .adjust_batch((0..25).map(|_| AdjustStock::new(id, 1, "Restock")).collect())
                    .await
            }));
        }
        for b in batches {
            assert!(b.await.unwrap().is_complete_success());
        }
        assert_eq!(store.get_product(ids[0]).await.unwrap().quantity(), 300);
    }

    #[tokio::test]
    async fn adjust_many_applies_the_same_delta_to_each_product() {
        let (store, ids) = seeded(&[1, 2]).await;
        let engine = StockAdjustmentEngine::new(store.clone());

        let result = engine.adjust_many(ids.clone(), 10, "Bulk restock").await;
        assert!(result.is_complete_success());
        assert_eq!(store.get_product(ids[0]).await.unwrap().quantity(), 11);
        assert_eq!(store.get_product(ids[1]).await.unwrap().quantity(), 12);
    }
}
