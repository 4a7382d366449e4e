//! Error surface of the stock engine.

use thiserror::Error;

use stockroom_core::DomainError;

use crate::catalog_store::StoreError;

/// Every failure an engine operation can report, flattened for the outer layers.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// Unknown id, or the product is inactive.
    #[error("product not found")]
    NotFound,

    #[error("a product with SKU '{0}' already exists")]
    DuplicateSku(String),

    /// Field validation failure (length, required, range, overflow).
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    InvalidMovementType(String),

    /// Non-positive quantity for a StockIn/StockOut movement.
    #[error("{0}")]
    InvalidQuantity(String),

    #[error("{0}")]
    NegativeStockResult(String),

    /// Optimistic concurrency retries were exhausted.
    #[error("{0}")]
    Concurrency(String),

    /// The store failed; nothing was committed.
    #[error("store failure: {0}")]
    Store(StoreError),
}

impl CatalogError {
    /// Stable machine-readable code, shared by the HTTP and tool surfaces.
    pub fn code(&self) -> &'static str {
        match self {
            CatalogError::NotFound => "not_found",
            CatalogError::DuplicateSku(_) => "duplicate_sku",
            CatalogError::Validation(_) => "validation_error",
            CatalogError::InvalidMovementType(_) => "invalid_movement_type",
            CatalogError::InvalidQuantity(_) => "invalid_quantity",
            CatalogError::NegativeStockResult(_) => "negative_stock_result",
            CatalogError::Concurrency(_) => "conflict",
            CatalogError::Store(_) => "store_error",
        }
    }
}

impl From<StoreError> for CatalogError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::DuplicateSku(sku) => CatalogError::DuplicateSku(sku),
            StoreError::NotFound(_) => CatalogError::NotFound,
            StoreError::Concurrency(msg) => CatalogError::Concurrency(msg),
            other => CatalogError::Store(other),
        }
    }
}

impl From<DomainError> for CatalogError {
    fn from(value: DomainError) -> Self {
        match value {
            DomainError::Validation(msg) => CatalogError::Validation(msg),
            DomainError::NotFound => CatalogError::NotFound,
            DomainError::InvalidMovementType(msg) => CatalogError::InvalidMovementType(msg),
            DomainError::InvalidQuantity(msg) => CatalogError::InvalidQuantity(msg),
            DomainError::NegativeStockResult(msg) => CatalogError::NegativeStockResult(msg),
            DomainError::InvalidId(msg) => CatalogError::Validation(msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stockroom_core::ProductId;

    #[test]
    fn store_not_found_collapses_to_catalog_not_found() {
        let err: CatalogError = StoreError::NotFound(ProductId::new()).into();
        assert!(matches!(err, CatalogError::NotFound));
        assert_eq!(err.code(), "not_found");
    }

    #[test]
    fn backend_failures_stay_wrapped() {
        let err: CatalogError = StoreError::Backend("disk full".to_string()).into();
        assert!(matches!(err, CatalogError::Store(StoreError::Backend(_))));
        assert_eq!(err.code(), "store_error");
    }

    #[test]
    fn domain_errors_keep_their_category() {
        let cases = [
            (DomainError::invalid_quantity("q"), "invalid_quantity"),
            (DomainError::negative_stock("n"), "negative_stock_result"),
            (DomainError::invalid_movement_type("t"), "invalid_movement_type"),
            (DomainError::validation("v"), "validation_error"),
        ];
        for (domain, code) in cases {
            assert_eq!(CatalogError::from(domain).code(), code);
        }
    }
}
