use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path, rejection::JsonRejection},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
};
use tracing::info;

use stockroom_core::CategoryId;
use stockroom_products::{CreateCategory, RenameCategory};

use crate::app::services::AppServices;
use crate::app::{dto, errors};

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_categories).post(create_category))
        .route(
            "/:id",
            get(get_category).put(rename_category).delete(delete_category),
        )
}

pub async fn list_categories(
    Extension(services): Extension<Arc<AppServices>>,
) -> axum::response::Response {
    match services.categories_with_counts().await {
        Ok(categories) => (StatusCode::OK, Json(categories)).into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn create_category(
    Extension(services): Extension<Arc<AppServices>>,
    payload: Result<Json<CreateCategory>, JsonRejection>,
) -> axum::response::Response {
    let cmd = match errors::body(payload) {
        Ok(cmd) => cmd,
        Err(res) => return res,
    };

    match services.create_category(cmd).await {
        Ok(category) => {
            info!(category_id = %category.id_typed(), name = %category.name(), "category created");
            (StatusCode::CREATED, Json(category)).into_response()
        }
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn get_category(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id: CategoryId = match errors::parse_id(&id) {
        Ok(v) => v,
        Err(res) => return res,
    };

    match services.get_category(id).await {
        Ok(category) => (StatusCode::OK, Json(category)).into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn rename_category(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
    payload: Result<Json<RenameCategory>, JsonRejection>,
) -> axum::response::Response {
    let id: CategoryId = match errors::parse_id(&id) {
        Ok(v) => v,
        Err(res) => return res,
    };
    let cmd = match errors::body(payload) {
        Ok(cmd) => cmd,
        Err(res) => return res,
    };

    match services.rename_category(id, cmd).await {
        Ok(category) => {
            info!(category_id = %id, name = %category.name(), "category renamed");
            (StatusCode::OK, Json(category)).into_response()
        }
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn delete_category(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id: CategoryId = match errors::parse_id(&id) {
        Ok(v) => v,
        Err(res) => return res,
    };

    match services.delete_category(id).await {
        Ok(deleted) => {
            info!(
                category_id = %id,
                detached_products = deleted.detached_products,
                "category deleted"
            );
            (StatusCode::OK, Json(dto::CategoryDeletedResponse::from(deleted))).into_response()
        }
        Err(e) => errors::store_error_to_response(e),
    }
}
