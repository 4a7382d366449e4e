use axum::{response::IntoResponse, Json};
use chrono::Utc;

use crate::app::dto::HealthResponse;

pub async fn health() -> impl IntoResponse {
    Json(HealthResponse {
        status: "Healthy",
        timestamp: Utc::now(),
    })
}
