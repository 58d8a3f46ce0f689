use std::sync::Arc;

use tracing::info;

use stockroom_core::{CategoryId, ProductId};
use stockroom_infra::{
    AppConfig, CatalogReader, CategoryDeleted, CategoryStore, InMemoryInventoryStore,
    InventoryStore, PostgresInventoryStore, ProductQuery, ProductStore, ReportingAggregator,
    StockAdjustmentEngine, StoreBackend, StoreResult,
};
use stockroom_inventory::{
    AdjustStock, Applied, BatchAdjustmentResult, CategoryWithCount, InventoryReport, LowStockReport,
    ProductView,
};
use stockroom_products::{Category, CreateCategory, CreateProduct, RenameCategory, UpdateProduct};

/// Everything the handlers need, over one store.
pub struct StockServices<S> {
    pub store: Arc<S>,
    pub engine: StockAdjustmentEngine<S>,
    pub reports: ReportingAggregator<S>,
    pub catalog: CatalogReader<S>,
}

impl<S: InventoryStore + 'static> StockServices<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self {
            engine: StockAdjustmentEngine::new(store.clone()),
            reports: ReportingAggregator::new(store.clone()),
            catalog: CatalogReader::new(store.clone()),
            store,
        }
    }
}

/// Services wired to the configured backend.
pub enum AppServices {
    InMemory(StockServices<InMemoryInventoryStore>),
    Postgres(StockServices<PostgresInventoryStore>),
}

/// Run `$body` with `$s` bound to the active backend's services.
macro_rules! with_backend {
    ($app:expr, $s:ident => $body:expr) => {
        match $app {
            AppServices::InMemory($s) => $body,
            AppServices::Postgres($s) => $body,
        }
    };
}

pub async fn build_services(config: &AppConfig) -> StoreResult<AppServices> {
    match &config.store {
        StoreBackend::Memory => {
            info!(backend = "memory", "inventory store ready");
            Ok(AppServices::in_memory())
        }
        StoreBackend::Postgres {
            database_url,
            max_connections,
        } => {
            let store = PostgresInventoryStore::connect(database_url, *max_connections).await?;
            store.ensure_schema().await?;
            info!(backend = "postgres", max_connections, "inventory store ready");
            Ok(AppServices::Postgres(StockServices::new(Arc::new(store))))
        }
    }
}

impl AppServices {
    pub fn in_memory() -> Self {
        AppServices::InMemory(StockServices::new(Arc::new(InMemoryInventoryStore::new())))
    }

    // Categories

    pub async fn create_category(&self, cmd: CreateCategory) -> StoreResult<Category> {
        with_backend!(self, s => s.store.create_category(cmd).await)
    }

    pub async fn rename_category(
        &self,
        id: CategoryId,
        cmd: RenameCategory,
    ) -> StoreResult<Category> {
        with_backend!(self, s => s.store.rename_category(id, cmd).await)
    }

    pub async fn delete_category(&self, id: CategoryId) -> StoreResult<CategoryDeleted> {
        with_backend!(self, s => s.store.delete_category(id).await)
    }

    pub async fn get_category(&self, id: CategoryId) -> StoreResult<Category> {
        with_backend!(self, s => s.store.get_category(id).await)
    }

    pub async fn categories_with_counts(&self) -> StoreResult<Vec<CategoryWithCount>> {
        with_backend!(self, s => s.reports.categories_with_counts().await)
    }

    // Products

    pub async fn create_product(&self, cmd: CreateProduct) -> StoreResult<ProductView> {
        with_backend!(self, s => {
            let product = s.store.create_product(cmd).await?;
            s.catalog.product_view(product.id_typed()).await
        })
    }

    pub async fn update_product(
        &self,
        id: ProductId,
        update: UpdateProduct,
    ) -> StoreResult<ProductView> {
        with_backend!(self, s => {
            s.store.update_product(id, update).await?;
            s.catalog.product_view(id).await
        })
    }

    pub async fn delete_product(&self, id: ProductId) -> StoreResult<()> {
        with_backend!(self, s => s.store.delete_product(id).await)
    }

    pub async fn product_view(&self, id: ProductId) -> StoreResult<ProductView> {
        with_backend!(self, s => s.catalog.product_view(id).await)
    }

    pub async fn product_views(&self, query: &ProductQuery) -> StoreResult<Vec<ProductView>> {
        with_backend!(self, s => s.catalog.product_views(query).await)
    }

    // Stock

    pub async fn adjust(&self, cmd: AdjustStock) -> StoreResult<Applied> {
        with_backend!(self, s => s.engine.adjust(cmd).await)
    }

    pub async fn adjust_batch(&self, requests: Vec<AdjustStock>) -> BatchAdjustmentResult {
        with_backend!(self, s => s.engine.adjust_batch(requests).await)
    }

    pub async fn adjust_many(
        &self,
        product_ids: Vec<ProductId>,
        delta: i64,
        reason: &str,
    ) -> BatchAdjustmentResult {
        with_backend!(self, s => s.engine.adjust_many(product_ids, delta, reason).await)
    }

    // Reports

    pub async fn summarize(&self) -> StoreResult<InventoryReport> {
        with_backend!(self, s => s.reports.summarize().await)
    }

    pub async fn low_stock(&self) -> StoreResult<LowStockReport> {
        with_backend!(self, s => s.reports.low_stock().await)
    }
}
