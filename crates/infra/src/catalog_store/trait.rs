use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use stockroom_catalog::{Movement, NewMovement, Product};
use stockroom_core::{ExpectedVersion, ProductId};

/// Catalog store operation error.
///
/// These are **storage errors** (uniqueness, concurrency, backend failures) as
/// opposed to domain errors (validation, invariants).
#[derive(Debug, Error)]
pub enum StoreError {
    /// Another product (active or inactive) already uses this SKU.
    #[error("duplicate sku: {0}")]
    DuplicateSku(String),

    /// The stored product revision no longer matches the expected one.
    #[error("optimistic concurrency check failed: {0}")]
    Concurrency(String),

    /// The product targeted by a write does not exist.
    #[error("product {0} not found")]
    NotFound(ProductId),

    /// The write itself is malformed (mismatched ids, illegal field change).
    #[error("invalid write: {0}")]
    InvalidWrite(String),

    /// The backend failed (connection, lock poisoning, row decoding).
    #[error("storage backend failure: {0}")]
    Backend(String),
}

/// Keyed product storage plus the append-only stock ledger.
///
/// ## Write paths
///
/// - `insert_product`: the product and its optional seed movement are stored
///   atomically; SKU uniqueness is checked across all products.
/// - `commit_movement`: the revised product and exactly one new movement are
///   stored atomically, guarded by `ExpectedVersion` on the product.
/// - `update_product`: detail edits and deactivation. Must not change
///   `sku` or `stock_quantity`; stock only ever changes with a movement.
///
/// ## Ordering
///
/// Movement listings are newest first by `(created_at, sequence)`. Stores
/// assign `sequence` at append time, strictly increasing across the ledger.
///
/// Movements are never updated or deleted.
#[async_trait]
pub trait CatalogStore: Send + Sync {
    /// Store a new product and its optional seed movement in one unit.
    async fn insert_product(
        &self,
        product: Product,
        seed: Option<NewMovement>,
    ) -> Result<Option<Movement>, StoreError>;

    /// Load a product by id, active or not.
    async fn get_product(&self, id: ProductId) -> Result<Option<Product>, StoreError>;

    /// All products, active or not.
    async fn list_products(&self) -> Result<Vec<Product>, StoreError>;

    /// Replace a product's details without touching stock or SKU.
    async fn update_product(
        &self,
        product: Product,
        expected_version: ExpectedVersion,
    ) -> Result<(), StoreError>;

    /// Replace the product and append the movement in one unit.
    async fn commit_movement(
        &self,
        product: Product,
        expected_version: ExpectedVersion,
        movement: NewMovement,
    ) -> Result<Movement, StoreError>;

    /// Movements of one product, newest first.
    async fn movements_for_product(&self, id: ProductId) -> Result<Vec<Movement>, StoreError>;

    /// Every movement in the ledger, newest first.
    async fn all_movements(&self) -> Result<Vec<Movement>, StoreError>;
}

#[async_trait]
impl<S> CatalogStore for Arc<S>
where
    S: CatalogStore + ?Sized,
{
    async fn insert_product(
        &self,
        product: Product,
        seed: Option<NewMovement>,
    ) -> Result<Option<Movement>, StoreError> {
        (**self).insert_product(product, seed).await
    }

    async fn get_product(&self, id: ProductId) -> Result<Option<Product>, StoreError> {
        (**self).get_product(id).await
    }

    async fn list_products(&self) -> Result<Vec<Product>, StoreError> {
        (**self).list_products().await
    }

    async fn update_product(
        &self,
        product: Product,
        expected_version: ExpectedVersion,
    ) -> Result<(), StoreError> {
        (**self).update_product(product, expected_version).await
    }

    async fn commit_movement(
        &self,
        product: Product,
        expected_version: ExpectedVersion,
        movement: NewMovement,
    ) -> Result<Movement, StoreError> {
        (**self).commit_movement(product, expected_version, movement).await
    }

    async fn movements_for_product(&self, id: ProductId) -> Result<Vec<Movement>, StoreError> {
        (**self).movements_for_product(id).await
    }

    async fn all_movements(&self) -> Result<Vec<Movement>, StoreError> {
        (**self).all_movements().await
    }
}

/// Checks shared by every backend before a paired write.
pub(crate) fn validate_paired_write(product: &Product, movement: &NewMovement) -> Result<(), StoreError> {
    if movement.product_id != product.id_typed() {
        return Err(StoreError::InvalidWrite(format!(
            "movement targets product {} but product {} was supplied",
            movement.product_id,
            product.id_typed()
        )));
    }
    if product.stock_quantity() < 0 {
        return Err(StoreError::InvalidWrite(format!(
            "refusing to store negative stock ({}) for product {}",
            product.stock_quantity(),
            product.id_typed()
        )));
    }
    Ok(())
}

/// Checks for `update_product`: stock and SKU must be unchanged.
pub(crate) fn validate_detail_update(current: &Product, next: &Product) -> Result<(), StoreError> {
    if current.sku() != next.sku() {
        return Err(StoreError::InvalidWrite(format!(
            "sku of product {} is immutable",
            current.id_typed()
        )));
    }
    if current.stock_quantity() != next.stock_quantity() {
        return Err(StoreError::InvalidWrite(format!(
            "stock of product {} can only change through a movement",
            current.id_typed()
        )));
    }
    Ok(())
}
