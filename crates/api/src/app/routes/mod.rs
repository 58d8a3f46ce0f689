use axum::Router;

pub mod categories;
pub mod products;
pub mod reports;
pub mod system;

/// Router for every inventory endpoint.
pub fn router() -> Router {
    Router::new()
        .nest("/categories", categories::router())
        .nest("/products", products::router())
        .nest("/reports", reports::router())
}
