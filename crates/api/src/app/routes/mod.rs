use axum::{routing::get, Router};

pub mod movements;
pub mod products;
pub mod system;

/// Router for all catalog endpoints.
pub fn router() -> Router {
    Router::new()
        .nest("/products", products::router())
        .route("/movements", get(movements::list_movements))
}
