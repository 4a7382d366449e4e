use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use stockroom_catalog::{Movement, MovementType, Product};
use stockroom_core::{MovementId, ProductId};

use crate::catalog_store::CatalogStore;
use crate::error::CatalogError;

/// Queryable product view with its derived low-stock flag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductView {
    pub id: ProductId,
    pub name: String,
    pub description: String,
    pub sku: String,
    pub price: Decimal,
    pub stock_quantity: i64,
    pub reorder_level: i64,
    pub is_active: bool,
    pub is_low_stock: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&Product> for ProductView {
    fn from(p: &Product) -> Self {
        Self {
            id: p.id_typed(),
            name: p.name().to_string(),
            description: p.description().to_string(),
            sku: p.sku().to_string(),
            price: p.price(),
            stock_quantity: p.stock_quantity(),
            reorder_level: p.reorder_level(),
            is_active: p.is_active(),
            is_low_stock: p.is_low_stock(),
            created_at: p.created_at(),
            updated_at: p.updated_at(),
        }
    }
}

/// Product view plus the units missing to reach the reorder level.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LowStockView {
    #[serde(flatten)]
    pub product: ProductView,
    pub shortfall: i64,
}

/// Ledger entry annotated with the owning product's current name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MovementView {
    pub id: MovementId,
    pub product_id: ProductId,
    pub product_name: String,
    pub movement_type: MovementType,
    pub quantity: i64,
    pub notes: String,
    pub created_at: DateTime<Utc>,
}

impl MovementView {
    pub fn new(movement: &Movement, product_name: impl Into<String>) -> Self {
        Self {
            id: movement.id,
            product_id: movement.product_id,
            product_name: product_name.into(),
            movement_type: movement.movement_type,
            quantity: movement.quantity,
            notes: movement.notes.clone(),
            created_at: movement.created_at,
        }
    }
}

/// Read-only catalog queries. Inactive products are invisible here, except
/// as the owner named on their historical movements.
#[derive(Debug, Clone)]
pub struct CatalogQueries<S> {
    store: S,
}

impl<S> CatalogQueries<S>
where
    S: CatalogStore,
{
    pub fn new(store: S) -> Self {
        Self { store }
    }

    async fn active_products(&self) -> Result<Vec<Product>, CatalogError> {
        let mut products: Vec<Product> = self
            .store
            .list_products()
            .await?
            .into_iter()
            .filter(Product::is_active)
            .collect();
        products.sort_by(|a, b| a.name().cmp(b.name()).then_with(|| a.sku().cmp(b.sku())));
        Ok(products)
    }

    /// Active products sorted by name (ties by SKU).
    #[instrument(skip(self))]
    pub async fn list_active(&self) -> Result<Vec<ProductView>, CatalogError> {
        Ok(self.active_products().await?.iter().map(ProductView::from).collect())
    }

    #[instrument(skip(self))]
    pub async fn get_by_id(&self, id: ProductId) -> Result<ProductView, CatalogError> {
        self.store
            .get_product(id)
            .await?
            .filter(Product::is_active)
            .map(|p| ProductView::from(&p))
            .ok_or(CatalogError::NotFound)
    }

    /// Active products at or below their reorder level, largest shortfall first.
    #[instrument(skip(self))]
    pub async fn low_stock(&self) -> Result<Vec<LowStockView>, CatalogError> {
        let mut views: Vec<LowStockView> = self
            .active_products()
            .await?
            .iter()
            .filter_map(|p| {
                p.shortfall().map(|shortfall| LowStockView {
                    product: ProductView::from(p),
                    shortfall,
                })
            })
            .collect();
        views.sort_by(|a, b| b.shortfall.cmp(&a.shortfall));
        Ok(views)
    }

    /// Movements of an active product, newest first. Unknown or inactive ids
    /// yield an empty list.
    #[instrument(skip(self))]
    pub async fn movements_for_product(&self, id: ProductId) -> Result<Vec<MovementView>, CatalogError> {
        let Some(product) = self.store.get_product(id).await?.filter(Product::is_active) else {
            return Ok(Vec::new());
        };
        let movements = self.store.movements_for_product(id).await?;
        Ok(movements
            .iter()
            .map(|m| MovementView::new(m, product.name()))
            .collect())
    }

    /// Every movement, newest first, joined with its product's current name.
    #[instrument(skip(self))]
    pub async fn all_movements(&self) -> Result<Vec<MovementView>, CatalogError> {
        // Movements first: a product is stored no later than its first movement
        // and never removed, so the product list read afterwards names every owner.
        let movements = self.store.all_movements().await?;
        let names: HashMap<ProductId, String> = self
            .store
            .list_products()
            .await?
            .into_iter()
            .map(|p| (p.id_typed(), p.name().to_string()))
            .collect();

        Ok(movements
            .iter()
            .map(|m| {
                let name = names.get(&m.product_id).map(String::as_str).unwrap_or_default();
                MovementView::new(m, name)
            })
            .collect())
    }
}
