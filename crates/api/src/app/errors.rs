use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use stockroom_infra::CatalogError;

pub fn engine_error_to_response(err: CatalogError) -> axum::response::Response {
    let status = match &err {
        CatalogError::NotFound => StatusCode::NOT_FOUND,
        CatalogError::DuplicateSku(_)
        | CatalogError::Validation(_)
        | CatalogError::InvalidMovementType(_)
        | CatalogError::InvalidQuantity(_)
        | CatalogError::NegativeStockResult(_) => StatusCode::BAD_REQUEST,
        CatalogError::Concurrency(_) => StatusCode::CONFLICT,
        CatalogError::Store(e) => {
            tracing::error!(error = %e, "catalog store failure");
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    json_error(status, err.code(), err.to_string())
}

pub fn not_found() -> axum::response::Response {
    engine_error_to_response(CatalogError::NotFound)
}

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}
