//! Stock mutation engine.
//!
//! `StockEngine` is the only writer of products and movements. Every write
//! follows the same pipeline:
//!
//! 1. **Load** the current product from the store
//! 2. **Decide** the next revision with the pure rules in `stockroom-catalog`
//! 3. **Commit** it with `ExpectedVersion::Exact(loaded.version)`
//!
//! ## Concurrency Safety
//!
//! Writes to one product are serialized in-process by a per-product async
//! mutex held across the whole load/decide/commit sequence. The commit itself
//! is an optimistic compare-and-set, so writers in another process sharing
//! the same database are detected too. A `Concurrency` failure re-runs the
//! full sequence (fresh read, fresh validation) up to `max_attempts` times.
//! Different products never wait on each other.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use tracing::{debug, info, instrument, warn};

use stockroom_catalog::{
    plan_movement, Movement, NewProduct, Product, ProductDetails, StockMovementRequest,
};
use stockroom_core::{DomainResult, ExpectedVersion, ProductId};

use crate::catalog_store::{CatalogStore, StoreError};
use crate::error::CatalogError;

pub const DEFAULT_MAX_ATTEMPTS: u32 = 8;

/// Result of a successful product creation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatedProduct {
    pub product: Product,
    /// The "Initial stock" movement, present when initial stock was > 0.
    pub initial_movement: Option<Movement>,
}

/// Result of a successful stock movement: the new product state and its ledger entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StockMovementOutcome {
    pub product: Product,
    pub movement: Movement,
}

type ProductLock = Arc<tokio::sync::Mutex<()>>;

/// One async mutex per product with a writer in flight. Entries are evicted
/// when the last holder or waiter goes away, so the map only ever holds ids
/// that are being written right now.
#[derive(Debug, Default)]
struct ProductLocks {
    inner: Mutex<HashMap<ProductId, ProductLock>>,
}

impl ProductLocks {
    fn map(&self) -> MutexGuard<'_, HashMap<ProductId, ProductLock>> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    async fn acquire(&self, id: ProductId) -> ProductLockGuard<'_> {
        let mut held = ProductLockGuard {
            locks: self,
            id,
            guard: None,
        };
        // Declared after `held` so a cancelled wait drops it first and the
        // eviction in `held`'s Drop sees the true holder count.
        let lock = self.map().entry(id).or_default().clone();
        held.guard = Some(lock.lock_owned().await);
        held
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.map().len()
    }
}

struct ProductLockGuard<'a> {
    locks: &'a ProductLocks,
    id: ProductId,
    guard: Option<tokio::sync::OwnedMutexGuard<()>>,
}

impl Drop for ProductLockGuard<'_> {
    fn drop(&mut self) {
        drop(self.guard.take());
        let mut map = self.locks.map();
        // Clones are only taken under the map lock, so a count of 1 means
        // nobody else holds or waits on this mutex.
        if map.get(&self.id).is_some_and(|lock| Arc::strong_count(lock) == 1) {
            map.remove(&self.id);
        }
    }
}

#[derive(Debug)]
pub struct StockEngine<S> {
    store: S,
    locks: ProductLocks,
    max_attempts: u32,
}

impl<S> StockEngine<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            locks: ProductLocks::default(),
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }

    /// Override the number of optimistic attempts per write (minimum 1).
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }
}

impl<S> StockEngine<S>
where
    S: CatalogStore,
{
    /// Validate and store a new product, seeding its ledger when `initial_stock > 0`.
    #[instrument(skip(self, candidate), fields(sku = %candidate.sku))]
    pub async fn create_product(&self, candidate: NewProduct) -> Result<CreatedProduct, CatalogError> {
        let (product, seed) = Product::create(ProductId::new(), candidate, Utc::now()).inspect_err(|e| {
            debug!(error = %e, "product rejected");
        })?;

        let initial_movement = self
            .store
            .insert_product(product.clone(), seed)
            .await
            .map_err(CatalogError::from)
            .inspect_err(|e| debug!(error = %e, "product not stored"))?;

        info!(
            product_id = %product.id_typed(),
            initial_stock = product.stock_quantity(),
            "product created"
        );
        Ok(CreatedProduct {
            product,
            initial_movement,
        })
    }

    /// Apply one stock movement to an active product.
    ///
    /// On success the new stock level and the movement are committed together;
    /// on any failure nothing changes.
    #[instrument(
        skip(self, request),
        fields(
            product_id = %id,
            movement_type = %request.movement_type,
            quantity = request.quantity
        )
    )]
    pub async fn apply_movement(
        &self,
        id: ProductId,
        request: StockMovementRequest,
    ) -> Result<StockMovementOutcome, CatalogError> {
        let _guard = self.locks.acquire(id).await;

        let mut last_conflict = String::new();
        for attempt in 1..=self.max_attempts {
            let current = self.load(id).await?;
            let plan = plan_movement(&current, &request, Utc::now()).inspect_err(|e| {
                debug!(error = %e, stock = current.stock_quantity(), "movement rejected");
            })?;

            match self
                .store
                .commit_movement(plan.product.clone(), ExpectedVersion::of(&current), plan.movement)
                .await
            {
                Ok(movement) => {
                    info!(
                        previous_stock = current.stock_quantity(),
                        new_stock = plan.product.stock_quantity(),
                        sequence = movement.sequence,
                        "stock movement applied"
                    );
                    return Ok(StockMovementOutcome {
                        product: plan.product,
                        movement,
                    });
                }
                Err(StoreError::Concurrency(msg)) => {
                    warn!(attempt, max_attempts = self.max_attempts, %msg, "stale product version, retrying");
                    last_conflict = msg;
                }
                Err(other) => return Err(other.into()),
            }
        }

        Err(CatalogError::Concurrency(format!(
            "product {id} kept changing after {} attempts: {last_conflict}",
            self.max_attempts
        )))
    }

    /// Edit name, description, price and reorder level of an active product.
    #[instrument(skip(self, details), fields(product_id = %id))]
    pub async fn update_details(
        &self,
        id: ProductId,
        details: ProductDetails,
    ) -> Result<Product, CatalogError> {
        let product = self
            .revise(id, |current, now| current.with_details(details.clone(), now))
            .await?;
        info!("product details updated");
        Ok(product)
    }

    /// Soft delete. The product's movements stay in the ledger.
    #[instrument(skip(self), fields(product_id = %id))]
    pub async fn deactivate(&self, id: ProductId) -> Result<Product, CatalogError> {
        let product = self.revise(id, |current, now| current.deactivated(now)).await?;
        info!("product deactivated");
        Ok(product)
    }

    async fn load(&self, id: ProductId) -> Result<Product, CatalogError> {
        self.store
            .get_product(id)
            .await?
            .ok_or(CatalogError::NotFound)
    }

    /// Load/decide/commit loop for writes that do not touch stock.
    async fn revise<F>(&self, id: ProductId, decide: F) -> Result<Product, CatalogError>
    where
        F: Fn(&Product, DateTime<Utc>) -> DomainResult<Product>,
    {
        let _guard = self.locks.acquire(id).await;

        let mut last_conflict = String::new();
        for attempt in 1..=self.max_attempts {
            let current = self.load(id).await?;
            let next = decide(&current, Utc::now()).inspect_err(|e| {
                debug!(error = %e, "revision rejected");
            })?;

            match self
                .store
                .update_product(next.clone(), ExpectedVersion::of(&current))
                .await
            {
                Ok(()) => return Ok(next),
                Err(StoreError::Concurrency(msg)) => {
                    warn!(attempt, max_attempts = self.max_attempts, %msg, "stale product version, retrying");
                    last_conflict = msg;
                }
                Err(other) => return Err(other.into()),
            }
        }

        Err(CatalogError::Concurrency(format!(
            "product {id} kept changing after {} attempts: {last_conflict}",
            self.max_attempts
        )))
    }
}
