//! Domain error model.

use thiserror::Error;

/// Result type used across the domain layer.
pub type DomainResult<T> = Result<T, DomainError>;

/// Domain-level error.
///
/// Keep this focused on deterministic, business/domain failures (validation,
/// invariants). Storage conflicts and uniqueness belong to the stores. concerns belong elsewhere.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// A field failed validation (length, required, range).
    #[error("validation failed: {0}")]
    Validation(String),

    /// The referenced product does not exist or is inactive.
    #[error("product not found")]
    NotFound,

    /// The movement type is outside the closed set of known tags.
    #[error("invalid movement type: {0}")]
    InvalidMovementType(String),

    /// A non-positive quantity was supplied for a delta movement.
    #[error("invalid quantity: {0}")]
    InvalidQuantity(String),

    /// The movement would leave the product with negative stock.
    #[error("negative stock result: {0}")]
    NegativeStockResult(String),

    /// An identifier was invalid (e.g. parse failure).
    #[error("invalid identifier: {0}")]
    InvalidId(String),
}

impl DomainError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn not_found() -> Self {
        Self::NotFound
    }

    pub fn invalid_movement_type(msg: impl Into<String>) -> Self {
        Self::InvalidMovementType(msg.into())
    }

    pub fn invalid_quantity(msg: impl Into<String>) -> Self {
        Self::InvalidQuantity(msg.into())
    }

    pub fn negative_stock(msg: impl Into<String>) -> Self {
        Self::NegativeStockResult(msg.into())
    }

    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }
}
