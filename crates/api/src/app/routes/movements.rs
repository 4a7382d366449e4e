use std::sync::Arc;

use axum::{extract::Extension, response::IntoResponse, Json};

use crate::app::errors;
use crate::app::services::AppServices;

/// Every ledger entry, newest first, with the owning product's current name.
pub async fn list_movements(
    Extension(services): Extension<Arc<AppServices>>,
) -> axum::response::Response {
    match services.queries.all_movements().await {
        Ok(movements) => Json(movements).into_response(),
        Err(e) => errors::engine_error_to_response(e),
    }
}
