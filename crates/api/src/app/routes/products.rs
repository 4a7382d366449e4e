use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, put},
    Json, Router,
};

use stockroom_core::ProductId;
use stockroom_infra::{CatalogError, ProductView};

use crate::app::{dto, errors};
use crate::app::services::AppServices;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_products).post(create_product))
        .route("/low-stock", get(list_low_stock))
        .route(
            "/:id",
            get(get_product).put(update_product).delete(deactivate_product),
        )
        .route("/:id/stock", put(update_stock))
        .route("/:id/movements", get(list_product_movements))
}

/// No product has an id that does not parse, so a malformed id is simply not found.
fn parse_id(raw: &str) -> Result<ProductId, axum::response::Response> {
    raw.parse().map_err(|_| errors::not_found())
}

fn body_error(rejection: JsonRejection) -> axum::response::Response {
    errors::json_error(StatusCode::BAD_REQUEST, "validation_error", rejection.body_text())
}

pub async fn list_products(
    Extension(services): Extension<Arc<AppServices>>,
) -> axum::response::Response {
    match services.queries.list_active().await {
        Ok(products) => Json(products).into_response(),
        Err(e) => errors::engine_error_to_response(e),
    }
}

pub async fn list_low_stock(
    Extension(services): Extension<Arc<AppServices>>,
) -> axum::response::Response {
    match services.queries.low_stock().await {
        Ok(products) => Json(products).into_response(),
        Err(e) => errors::engine_error_to_response(e),
    }
}

pub async fn get_product(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id = match parse_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services.queries.get_by_id(id).await {
        Ok(product) => Json(product).into_response(),
        Err(e) => errors::engine_error_to_response(e),
    }
}

pub async fn create_product(
    Extension(services): Extension<Arc<AppServices>>,
    body: Result<Json<dto::CreateProductRequest>, JsonRejection>,
) -> axum::response::Response {
    let Json(body) = match body {
        Ok(v) => v,
        Err(rejection) => return body_error(rejection),
    };

    match services.engine.create_product(body.into()).await {
        Ok(created) => (
            StatusCode::CREATED,
            Json(ProductView::from(&created.product)),
        )
            .into_response(),
        Err(e) => errors::engine_error_to_response(e),
    }
}

pub async fn update_product(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
    body: Result<Json<dto::UpdateProductRequest>, JsonRejection>,
) -> axum::response::Response {
    let id = match parse_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let Json(body) = match body {
        Ok(v) => v,
        Err(rejection) => return body_error(rejection),
    };

    match services.engine.update_details(id, body.into()).await {
        Ok(product) => Json(ProductView::from(&product)).into_response(),
        Err(e) => errors::engine_error_to_response(e),
    }
}

pub async fn deactivate_product(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id = match parse_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services.engine.deactivate(id).await {
        Ok(_) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => errors::engine_error_to_response(e),
    }
}

/// Apply one stock movement. The movement type is parsed before the product is
/// looked up, so an unknown type is reported even for unknown products.
pub async fn update_stock(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
    body: Result<Json<dto::UpdateStockRequest>, JsonRejection>,
) -> axum::response::Response {
    let id = match parse_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let Json(body) = match body {
        Ok(v) => v,
        Err(rejection) => return body_error(rejection),
    };
    let request = match body.into_request() {
        Ok(r) => r,
        Err(e) => return errors::engine_error_to_response(CatalogError::from(e)),
    };

    match services.engine.apply_movement(id, request).await {
        Ok(outcome) => Json(dto::StockUpdateResponse::from(outcome)).into_response(),
        Err(e) => errors::engine_error_to_response(e),
    }
}

pub async fn list_product_movements(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id = match parse_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services.queries.movements_for_product(id).await {
        Ok(movements) => Json(movements).into_response(),
        Err(e) => errors::engine_error_to_response(e),
    }
}
