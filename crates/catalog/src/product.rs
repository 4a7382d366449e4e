use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use stockroom_core::{AggregateRoot, DomainError, DomainResult, MovementId, ProductId};

use crate::movement::{MovementType, NewMovement, INITIAL_STOCK_NOTE};

pub const MAX_NAME_CHARS: usize = 100;
pub const MAX_DESCRIPTION_CHARS: usize = 500;
pub const MAX_SKU_CHARS: usize = 50;

/// Prices are stored with at most this many fractional digits.
pub const MAX_PRICE_SCALE: u32 = 2;

/// Exclusive upper bound for a price (16 integer digits).
pub const PRICE_LIMIT: Decimal = Decimal::from_parts(1_874_919_424, 2_328_306, 0, false, 0);

/// Aggregate root: Product.
///
/// `stock_quantity` is never negative. The only ways to obtain a `Product` are
/// [`Product::create`], [`Product::rehydrate`] and the state transitions below,
/// all of which enforce that.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Product {
    id: ProductId,
    name: String,
    description: String,
    sku: String,
    price: Decimal,
    stock_quantity: i64,
    reorder_level: i64,
    is_active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    version: u64,
}

/// Candidate for product creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewProduct {
    pub name: String,
    pub description: String,
    pub sku: String,
    pub price: Decimal,
    pub initial_stock: i64,
    pub reorder_level: i64,
}

/// Editable product details. SKUs are immutable after creation, so there is no `sku` here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductDetails {
    pub name: String,
    pub description: String,
    pub price: Decimal,
    pub reorder_level: i64,
}

/// Flat persisted form of a product, used by stores to load rows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductRecord {
    pub id: ProductId,
    pub name: String,
    pub description: String,
    pub sku: String,
    pub price: Decimal,
    pub stock_quantity: i64,
    pub reorder_level: i64,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub version: u64,
}

impl Product {
    /// Validate a candidate and build the product plus its optional
    /// "Initial stock" seed movement. Both must be persisted together.
    pub fn create(
        id: ProductId,
        candidate: NewProduct,
        now: DateTime<Utc>,
    ) -> DomainResult<(Product, Option<NewMovement>)> {
        validate_name(&candidate.name)?;
        validate_description(&candidate.description)?;
        validate_sku(&candidate.sku)?;
        validate_price(candidate.price)?;
        if candidate.initial_stock < 0 {
            return Err(DomainError::validation("initial stock cannot be negative"));
        }
        validate_reorder_level(candidate.reorder_level)?;

        let product = Product {
            id,
            name: candidate.name,
            description: candidate.description,
            sku: candidate.sku,
            price: candidate.price,
            stock_quantity: candidate.initial_stock,
            reorder_level: candidate.reorder_level,
            is_active: true,
            created_at: now,
            updated_at: now,
            version: 1,
        };

        let seed = (candidate.initial_stock > 0).then(|| NewMovement {
            id: MovementId::new(),
            product_id: id,
            movement_type: MovementType::StockIn,
            quantity: candidate.initial_stock,
            notes: INITIAL_STOCK_NOTE.to_string(),
            created_at: now,
        });

        Ok((product, seed))
    }

    /// Rebuild a product from its persisted form.
    pub fn rehydrate(record: ProductRecord) -> DomainResult<Product> {
        if record.stock_quantity < 0 {
            return Err(DomainError::validation(format!(
                "stored stock for product {} is negative ({})",
                record.id, record.stock_quantity
            )));
        }
        Ok(Product {
            id: record.id,
            name: record.name,
            description: record.description,
            sku: record.sku,
            price: record.price,
            stock_quantity: record.stock_quantity,
            reorder_level: record.reorder_level,
            is_active: record.is_active,
            created_at: record.created_at,
            updated_at: record.updated_at,
            version: record.version,
        })
    }

    pub fn to_record(&self) -> ProductRecord {
        ProductRecord {
            id: self.id,
            name: self.name.clone(),
            description: self.description.clone(),
            sku: self.sku.clone(),
            price: self.price,
            stock_quantity: self.stock_quantity,
            reorder_level: self.reorder_level,
            is_active: self.is_active,
            created_at: self.created_at,
            updated_at: self.updated_at,
            version: self.version,
        }
    }

    pub fn id_typed(&self) -> ProductId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn sku(&self) -> &str {
        &self.sku
    }

    pub fn price(&self) -> Decimal {
        self.price
    }

    pub fn stock_quantity(&self) -> i64 {
        self.stock_quantity
    }

    pub fn reorder_level(&self) -> i64 {
        self.reorder_level
    }

    pub fn is_active(&self) -> bool {
        self.is_active
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    pub fn is_low_stock(&self) -> bool {
        self.stock_quantity <= self.reorder_level
    }

    /// Units missing to reach the reorder level; `None` unless low on stock.
    pub fn shortfall(&self) -> Option<i64> {
        self.is_low_stock()
            .then_some(self.reorder_level - self.stock_quantity)
    }

    /// Next revision with a new stock level. Callers go through `plan_movement`.
    pub(crate) fn with_stock(&self, stock_quantity: i64, now: DateTime<Utc>) -> Product {
        debug_assert!(stock_quantity >= 0);
        Product {
            stock_quantity,
            updated_at: now,
            version: self.version + 1,
            ..self.clone()
        }
    }

    /// Next revision with edited details. Stock and SKU are untouched.
    pub fn with_details(&self, details: ProductDetails, now: DateTime<Utc>) -> DomainResult<Product> {
        self.ensure_active()?;
        validate_name(&details.name)?;
        validate_description(&details.description)?;
        validate_price(details.price)?;
        validate_reorder_level(details.reorder_level)?;

        Ok(Product {
            name: details.name,
            description: details.description,
            price: details.price,
            reorder_level: details.reorder_level,
            updated_at: now,
            version: self.version + 1,
            ..self.clone()
        })
    }

    /// Next revision marked inactive (soft delete). The ledger is kept.
    pub fn deactivated(&self, now: DateTime<Utc>) -> DomainResult<Product> {
        self.ensure_active()?;
        Ok(Product {
            is_active: false,
            updated_at: now,
            version: self.version + 1,
            ..self.clone()
        })
    }

    pub(crate) fn ensure_active(&self) -> DomainResult<()> {
        if !self.is_active {
            return Err(DomainError::not_found());
        }
        Ok(())
    }
}

impl AggregateRoot for Product {
    type Id = ProductId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

fn validate_name(name: &str) -> DomainResult<()> {
    if name.trim().is_empty() {
        return Err(DomainError::validation("name cannot be empty"));
    }
    if name.chars().count() > MAX_NAME_CHARS {
        return Err(DomainError::validation(format!(
            "name cannot exceed {MAX_NAME_CHARS} characters"
        )));
    }
    Ok(())
}

fn validate_description(description: &str) -> DomainResult<()> {
    if description.chars().count() > MAX_DESCRIPTION_CHARS {
        return Err(DomainError::validation(format!(
            "description cannot exceed {MAX_DESCRIPTION_CHARS} characters"
        )));
    }
    Ok(())
}

fn validate_sku(sku: &str) -> DomainResult<()> {
    if sku.trim().is_empty() {
        return Err(DomainError::validation("SKU cannot be empty"));
    }
    if sku.chars().count() > MAX_SKU_CHARS {
        return Err(DomainError::validation(format!(
            "SKU cannot exceed {MAX_SKU_CHARS} characters"
        )));
    }
    Ok(())
}

fn validate_price(price: Decimal) -> DomainResult<()> {
    if price < Decimal::ZERO {
        return Err(DomainError::validation("price cannot be negative"));
    }
    if price.normalize().scale() > MAX_PRICE_SCALE {
        return Err(DomainError::validation(format!(
            "price cannot have more than {MAX_PRICE_SCALE} decimal places"
        )));
    }
    if price >= PRICE_LIMIT {
        return Err(DomainError::validation(format!("price must be less than {PRICE_LIMIT}")));
    }
    Ok(())
}

fn validate_reorder_level(reorder_level: i64) -> DomainResult<()> {
    if reorder_level < 0 {
        return Err(DomainError::validation("reorder level cannot be negative"));
    }
    Ok(())
}
