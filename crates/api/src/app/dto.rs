use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use stockroom_catalog::{MovementType, NewProduct, ProductDetails, StockMovementRequest};
use stockroom_core::{DomainError, DomainResult};
use stockroom_infra::{MovementView, ProductView, StockMovementOutcome};

// -------------------------
// Request DTOs
// -------------------------

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateProductRequest {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub sku: String,
    pub price: Decimal,
    #[serde(default)]
    pub initial_stock: i64,
    #[serde(default)]
    pub reorder_level: i64,
}

impl From<CreateProductRequest> for NewProduct {
    fn from(body: CreateProductRequest) -> Self {
        NewProduct {
            name: body.name,
            description: body.description,
            sku: body.sku,
            price: body.price,
            initial_stock: body.initial_stock,
            reorder_level: body.reorder_level,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProductRequest {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub price: Decimal,
    #[serde(default)]
    pub reorder_level: i64,
}

impl From<UpdateProductRequest> for ProductDetails {
    fn from(body: UpdateProductRequest) -> Self {
        ProductDetails {
            name: body.name,
            description: body.description,
            price: body.price,
            reorder_level: body.reorder_level,
        }
    }
}

/// `movementType` is kept raw so that unknown tags map to `invalid_movement_type`
/// rather than a generic body rejection.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateStockRequest {
    pub movement_type: JsonValue,
    pub quantity: i64,
    #[serde(default)]
    pub notes: Option<String>,
}

impl UpdateStockRequest {
    pub fn into_request(self) -> DomainResult<StockMovementRequest> {
        Ok(StockMovementRequest {
            movement_type: parse_movement_type(&self.movement_type)?,
            quantity: self.quantity,
            notes: self.notes.unwrap_or_default(),
        })
    }
}

/// Accepts a tag name (any case) or its integer code.
pub fn parse_movement_type(raw: &JsonValue) -> DomainResult<MovementType> {
    match raw {
        JsonValue::String(s) => s.parse(),
        JsonValue::Number(n) => match n.as_i64() {
            Some(code) => MovementType::from_code(code),
            None => Err(DomainError::invalid_movement_type(format!(
                "unknown movement type code {n}"
            ))),
        },
        other => Err(DomainError::invalid_movement_type(format!(
            "movementType must be a name or an integer code, got {other}"
        ))),
    }
}

// -------------------------
// Response DTOs
// -------------------------

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StockUpdateResponse {
    pub product: ProductView,
    pub movement: MovementView,
}

impl From<StockMovementOutcome> for StockUpdateResponse {
    fn from(outcome: StockMovementOutcome) -> Self {
        Self {
            movement: MovementView::new(&outcome.movement, outcome.product.name()),
            product: ProductView::from(&outcome.product),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}
