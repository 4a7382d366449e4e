use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;

use stockroom_catalog::{Movement, NewMovement, Product};
use stockroom_core::{AggregateRoot, ExpectedVersion, ProductId};

use super::ledger::Ledger;
use super::r#trait::{validate_detail_update, validate_paired_write, CatalogStore, StoreError};

#[derive(Debug, Default)]
struct CatalogState {
    products: HashMap<ProductId, Product>,
    sku_index: HashMap<String, ProductId>,
    ledger: Ledger,
}

impl CatalogState {
    fn check_version(
        &self,
        id: ProductId,
        expected_version: ExpectedVersion,
    ) -> Result<&Product, StoreError> {
        let current = self.products.get(&id).ok_or(StoreError::NotFound(id))?;
        if !expected_version.matches(current.version()) {
            return Err(StoreError::Concurrency(format!(
                "product {id}: expected {expected_version:?}, found {}",
                current.version()
            )));
        }
        Ok(current)
    }
}

/// In-memory catalog store.
///
/// Products, the SKU index and the ledger sit behind a single lock, so every
/// paired write is atomic. Intended for tests/dev and the default server mode.
#[derive(Debug, Default)]
pub struct InMemoryCatalogStore {
    state: RwLock<CatalogState>,
}

impl InMemoryCatalogStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn poisoned<T>(_: T) -> StoreError {
        StoreError::Backend("lock poisoned".to_string())
    }
}

#[async_trait]
impl CatalogStore for InMemoryCatalogStore {
    async fn insert_product(
        &self,
        product: Product,
        seed: Option<NewMovement>,
    ) -> Result<Option<Movement>, StoreError> {
        if let Some(seed) = &seed {
            validate_paired_write(&product, seed)?;
        }

        let mut state = self.state.write().map_err(Self::poisoned)?;

        let id = product.id_typed();
        if state.sku_index.contains_key(product.sku()) {
            return Err(StoreError::DuplicateSku(product.sku().to_string()));
        }
        if state.products.contains_key(&id) {
            return Err(StoreError::InvalidWrite(format!("product {id} already exists")));
        }

        state.sku_index.insert(product.sku().to_string(), id);
        state.products.insert(id, product);
        Ok(seed.map(|m| state.ledger.append(m)))
    }

    async fn get_product(&self, id: ProductId) -> Result<Option<Product>, StoreError> {
        let state = self.state.read().map_err(Self::poisoned)?;
        Ok(state.products.get(&id).cloned())
    }

    async fn list_products(&self) -> Result<Vec<Product>, StoreError> {
        let state = self.state.read().map_err(Self::poisoned)?;
        Ok(state.products.values().cloned().collect())
    }

    async fn update_product(
        &self,
        product: Product,
        expected_version: ExpectedVersion,
    ) -> Result<(), StoreError> {
        let mut state = self.state.write().map_err(Self::poisoned)?;

        let id = product.id_typed();
        let current = state.check_version(id, expected_version)?;
        validate_detail_update(current, &product)?;

        state.products.insert(id, product);
        Ok(())
    }

    async fn commit_movement(
        &self,
        product: Product,
        expected_version: ExpectedVersion,
        movement: NewMovement,
    ) -> Result<Movement, StoreError> {
        validate_paired_write(&product, &movement)?;

        let mut state = self.state.write().map_err(Self::poisoned)?;

        let id = product.id_typed();
        let current = state.check_version(id, expected_version)?;
        if current.sku() != product.sku() {
            return Err(StoreError::InvalidWrite(format!("sku of product {id} is immutable")));
        }

        state.products.insert(id, product);
        Ok(state.ledger.append(movement))
    }

    async fn movements_for_product(&self, id: ProductId) -> Result<Vec<Movement>, StoreError> {
        let state = self.state.read().map_err(Self::poisoned)?;
        Ok(state.ledger.for_product(id))
    }

    async fn all_movements(&self) -> Result<Vec<Movement>, StoreError> {
        let state = self.state.read().map_err(Self::poisoned)?;
        Ok(state.ledger.all())
    }
}
