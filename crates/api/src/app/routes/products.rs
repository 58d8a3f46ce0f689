use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{
        Extension, Path, Query,
        rejection::{JsonRejection, QueryRejection},
    },
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use tracing::info;

use stockroom_core::ProductId;
use stockroom_inventory::AdjustStock;
use stockroom_products::{CreateProduct, UpdateProduct};

use crate::app::services::AppServices;
use crate::app::{dto, errors};

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_products).post(create_product))
        .route("/adjust_batch", post(adjust_batch))
        .route(
            "/:id",
            get(get_product).patch(update_product).delete(delete_product),
        )
        .route("/:id/adjust_stock", post(adjust_stock))
}

pub async fn list_products(
    Extension(services): Extension<Arc<AppServices>>,
    params: Result<Query<dto::ListProductsParams>, QueryRejection>,
) -> axum::response::Response {
    let params = match errors::query(params) {
        Ok(p) => p,
        Err(res) => return res,
    };
    let query = match params.into_query() {
        Ok(q) => q,
        Err(e) => return errors::store_error_to_response(e.into()),
    };

    match services.product_views(&query).await {
        Ok(products) => (StatusCode::OK, Json(products)).into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn create_product(
    Extension(services): Extension<Arc<AppServices>>,
    payload: Result<Json<CreateProduct>, JsonRejection>,
) -> axum::response::Response {
    let cmd = match errors::body(payload) {
        Ok(cmd) => cmd,
        Err(res) => return res,
    };

    match services.create_product(cmd).await {
        Ok(view) => {
            info!(
                product_id = %view.product.id_typed(),
                sku = %view.product.sku(),
                quantity = view.product.quantity(),
                "product created"
            );
            (StatusCode::CREATED, Json(view)).into_response()
        }
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn get_product(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id: ProductId = match errors::parse_id(&id) {
        Ok(v) => v,
        Err(res) => return res,
    };

    match services.product_view(id).await {
        Ok(view) => (StatusCode::OK, Json(view)).into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn update_product(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
    payload: Result<Json<UpdateProduct>, JsonRejection>,
) -> axum::response::Response {
    let id: ProductId = match errors::parse_id(&id) {
        Ok(v) => v,
        Err(res) => return res,
    };
    let update = match errors::body(payload) {
        Ok(u) => u,
        Err(res) => return res,
    };

    match services.update_product(id, update).await {
        Ok(view) => {
            info!(product_id = %id, "product updated");
            (StatusCode::OK, Json(view)).into_response()
        }
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn delete_product(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id: ProductId = match errors::parse_id(&id) {
        Ok(v) => v,
        Err(res) => return res,
    };

    match services.delete_product(id).await {
        Ok(()) => {
            info!(product_id = %id, "product deleted");
            StatusCode::NO_CONTENT.into_response()
        }
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn adjust_stock(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
    payload: Result<Json<dto::AdjustStockRequest>, JsonRejection>,
) -> axum::response::Response {
    let id: ProductId = match errors::parse_id(&id) {
        Ok(v) => v,
        Err(res) => return res,
    };
    let body = match errors::body(payload) {
        Ok(b) => b,
        Err(res) => return res,
    };

    let cmd = AdjustStock::new(id, body.quantity_change, body.reason);
    match services.adjust(cmd.clone()).await {
        Ok(applied) => (
            StatusCode::OK,
            Json(dto::AdjustStockResponse::new(&cmd, applied)),
        )
            .into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}

/// Per-item outcomes; a partially failed batch is still a 200.
pub async fn adjust_batch(
    Extension(services): Extension<Arc<AppServices>>,
    payload: Result<Json<dto::AdjustBatchRequest>, JsonRejection>,
) -> axum::response::Response {
    let request = match errors::body(payload) {
        Ok(r) => r,
        Err(res) => return res,
    };

    let result = match request {
        dto::AdjustBatchRequest::Explicit { adjustments } => {
            services
                .adjust_batch(adjustments.into_iter().map(AdjustStock::from).collect())
                .await
        }
        dto::AdjustBatchRequest::Uniform {
            product_ids,
            quantity_change,
            reason,
        } => {
            services
                .adjust_many(product_ids, quantity_change, &reason)
                .await
        }
    };
    (StatusCode::OK, Json(result)).into_response()
}
