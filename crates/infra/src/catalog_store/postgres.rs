//! Postgres-backed catalog store.
//!
//! Products live in `products`, the ledger in `stock_movements`. Every paired
//! write (product row + movement row) runs in one transaction, and product
//! rows are only replaced with `WHERE id = $1 AND version = $2`.
//!
//! ## Error Mapping
//!
//! | SQLx Error | PostgreSQL Error Code | StoreError | Scenario |
//! |------------|----------------------|------------|----------|
//! | Database (unique violation on `products_sku_key`) | `23505` | `DuplicateSku` | SKU already taken |
//! | Database (other unique violation) | `23505` | `Concurrency` | Concurrent insert of the same id |
//! | Database (check constraint violation) | `23514` | `InvalidWrite` | Negative stock reached the database |
//! | Database (other) | Any other | `Backend` | Other database errors |
//! | PoolClosed / Other | N/A | `Backend` | Network errors, connection failures, etc. |

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Postgres, Row, Transaction};
use tracing::{instrument, Span};

use stockroom_catalog::{Movement, MovementType, NewMovement, Product, ProductRecord};
use stockroom_core::{AggregateRoot, ExpectedVersion, MovementId, ProductId};

use super::r#trait::{validate_detail_update, validate_paired_write, CatalogStore, StoreError};

const SKU_CONSTRAINT: &str = "products_sku_key";

const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS products (
        id UUID PRIMARY KEY,
        name VARCHAR(100) NOT NULL,
        description VARCHAR(500) NOT NULL DEFAULT '',
        sku VARCHAR(50) NOT NULL,
        price NUMERIC(18, 2) NOT NULL CHECK (price >= 0),
        stock_quantity BIGINT NOT NULL CHECK (stock_quantity >= 0),
        reorder_level BIGINT NOT NULL CHECK (reorder_level >= 0),
        is_active BOOLEAN NOT NULL DEFAULT TRUE,
        created_at TIMESTAMPTZ NOT NULL,
        updated_at TIMESTAMPTZ NOT NULL,
        version BIGINT NOT NULL,
        CONSTRAINT products_sku_key UNIQUE (sku)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS stock_movements (
        sequence BIGSERIAL PRIMARY KEY,
        id UUID NOT NULL UNIQUE,
        product_id UUID NOT NULL REFERENCES products (id),
        movement_type SMALLINT NOT NULL CHECK (movement_type IN (1, 2, 3)),
        quantity BIGINT NOT NULL,
        notes VARCHAR(500) NOT NULL DEFAULT '',
        created_at TIMESTAMPTZ NOT NULL
    )
    "#,
    r#"
    CREATE INDEX IF NOT EXISTS stock_movements_product_history_idx
        ON stock_movements (product_id, created_at DESC, sequence DESC)
    "#,
];

const PRODUCT_COLUMNS: &str = "id, name, description, sku, price, stock_quantity, reorder_level, \
     is_active, created_at, updated_at, version";

const MOVEMENT_COLUMNS: &str = "sequence, id, product_id, movement_type, quantity, notes, created_at";

/// Postgres-backed catalog store.
///
/// `Send + Sync`; share it behind an `Arc` like the in-memory store.
#[derive(Debug, Clone)]
pub struct PostgresCatalogStore {
    pool: Arc<PgPool>,
}

impl PostgresCatalogStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }

    /// Connect to `database_url` and make sure the schema exists.
    pub async fn connect(database_url: &str) -> Result<Self, StoreError> {
        let pool = PgPool::connect(database_url)
            .await
            .map_err(|e| map_sqlx_error("connect", e))?;
        let store = Self::new(pool);
        store.ensure_schema().await?;
        Ok(store)
    }

    /// Create tables and indexes if missing. Idempotent.
    #[instrument(skip(self), err)]
    pub async fn ensure_schema(&self) -> Result<(), StoreError> {
        for statement in SCHEMA {
            sqlx::query(statement)
                .execute(&*self.pool)
                .await
                .map_err(|e| map_sqlx_error("ensure_schema", e))?;
        }
        Ok(())
    }

    async fn insert_movement(
        tx: &mut Transaction<'_, Postgres>,
        movement: NewMovement,
    ) -> Result<Movement, StoreError> {
        let row = sqlx::query(
            r#"
            INSERT INTO stock_movements (id, product_id, movement_type, quantity, notes, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING sequence
            "#,
        )
        .bind(movement.id.as_uuid())
        .bind(movement.product_id.as_uuid())
        .bind(movement.movement_type.code() as i16)
        .bind(movement.quantity)
        .bind(&movement.notes)
        .bind(movement.created_at)
        .fetch_one(&mut **tx)
        .await
        .map_err(|e| map_sqlx_error("insert_movement", e))?;

        let sequence: i64 = row
            .try_get("sequence")
            .map_err(|e| decode_error("stock_movements.sequence", e))?;
        Ok(movement.into_stored(sequence as u64))
    }

    async fn replace_product(
        tx: &mut Transaction<'_, Postgres>,
        product: &Product,
        expected_version: ExpectedVersion,
    ) -> Result<(), StoreError> {
        let id = product.id_typed();
        let current = sqlx::query(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1 FOR UPDATE"
        ))
        .bind(id.as_uuid())
        .fetch_optional(&mut **tx)
        .await
        .map_err(|e| map_sqlx_error("select_product_for_update", e))?
        .ok_or(StoreError::NotFound(id))
        .and_then(|row| product_from_row(&row))?;

        if !expected_version.matches(current.version()) {
            return Err(StoreError::Concurrency(format!(
                "product {id}: expected {expected_version:?}, found {}",
                current.version()
            )));
        }
        if current.sku() != product.sku() {
            return Err(StoreError::InvalidWrite(format!("sku of product {id} is immutable")));
        }

        let updated = sqlx::query(
            r#"
            UPDATE products
            SET name = $3, description = $4, price = $5, stock_quantity = $6,
                reorder_level = $7, is_active = $8, updated_at = $9, version = $10
            WHERE id = $1 AND version = $2
            "#,
        )
        .bind(id.as_uuid())
        .bind(current.version() as i64)
        .bind(product.name())
        .bind(product.description())
        .bind(product.price())
        .bind(product.stock_quantity())
        .bind(product.reorder_level())
        .bind(product.is_active())
        .bind(product.updated_at())
        .bind(product.version() as i64)
        .execute(&mut **tx)
        .await
        .map_err(|e| map_sqlx_error("update_product", e))?;

        if updated.rows_affected() != 1 {
            return Err(StoreError::Concurrency(format!(
                "product {id} changed while being updated"
            )));
        }
        Ok(())
    }

    async fn current_product(
        tx: &mut Transaction<'_, Postgres>,
        id: ProductId,
    ) -> Result<Product, StoreError> {
        let row = sqlx::query(&format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1"))
            .bind(id.as_uuid())
            .fetch_optional(&mut **tx)
            .await
            .map_err(|e| map_sqlx_error("select_product", e))?
            .ok_or(StoreError::NotFound(id))?;
        product_from_row(&row)
    }
}

#[async_trait]
impl CatalogStore for PostgresCatalogStore {
    #[instrument(skip(self, product, seed), fields(product_id = %product.id_typed(), sku = %product.sku()), err)]
    async fn insert_product(
        &self,
        product: Product,
        seed: Option<NewMovement>,
    ) -> Result<Option<Movement>, StoreError> {
        if let Some(seed) = &seed {
            validate_paired_write(&product, seed)?;
        }

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))?;

        sqlx::query(&format!(
            "INSERT INTO products ({PRODUCT_COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)"
        ))
        .bind(product.id_typed().as_uuid())
        .bind(product.name())
        .bind(product.description())
        .bind(product.sku())
        .bind(product.price())
        .bind(product.stock_quantity())
        .bind(product.reorder_level())
        .bind(product.is_active())
        .bind(product.created_at())
        .bind(product.updated_at())
        .bind(product.version() as i64)
        .execute(&mut *tx)
        .await
        .map_err(|e| match map_sqlx_error("insert_product", e) {
            StoreError::DuplicateSku(_) => StoreError::DuplicateSku(product.sku().to_string()),
            other => other,
        })?;

        let seeded = match seed {
            Some(seed) => Some(Self::insert_movement(&mut tx, seed).await?),
            None => None,
        };

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit", e))?;
        Ok(seeded)
    }

    #[instrument(skip(self), err)]
    async fn get_product(&self, id: ProductId) -> Result<Option<Product>, StoreError> {
        let row = sqlx::query(&format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1"))
            .bind(id.as_uuid())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("get_product", e))?;
        row.as_ref().map(product_from_row).transpose()
    }

    #[instrument(skip(self), fields(product_count = tracing::field::Empty), err)]
    async fn list_products(&self) -> Result<Vec<Product>, StoreError> {
        let rows = sqlx::query(&format!("SELECT {PRODUCT_COLUMNS} FROM products"))
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("list_products", e))?;

        let products = rows.iter().map(product_from_row).collect::<Result<Vec<_>, _>>()?;
        Span::current().record("product_count", products.len());
        Ok(products)
    }

    #[instrument(skip(self, product), fields(product_id = %product.id_typed(), expected_version = ?expected_version), err)]
    async fn update_product(
        &self,
        product: Product,
        expected_version: ExpectedVersion,
    ) -> Result<(), StoreError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))?;

        let current = Self::current_product(&mut tx, product.id_typed()).await?;
        validate_detail_update(&current, &product)?;
        Self::replace_product(&mut tx, &product, expected_version).await?;

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit", e))
    }

    #[instrument(
        skip(self, product, movement),
        fields(
            product_id = %product.id_typed(),
            movement_type = %movement.movement_type,
            expected_version = ?expected_version
        ),
        err
    )]
    async fn commit_movement(
        &self,
        product: Product,
        expected_version: ExpectedVersion,
        movement: NewMovement,
    ) -> Result<Movement, StoreError> {
        validate_paired_write(&product, &movement)?;

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))?;

        // Dropping `tx` on an early return rolls the transaction back.
        Self::replace_product(&mut tx, &product, expected_version).await?;
        let stored = Self::insert_movement(&mut tx, movement).await?;

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit", e))?;
        Ok(stored)
    }

    #[instrument(skip(self), err)]
    async fn movements_for_product(&self, id: ProductId) -> Result<Vec<Movement>, StoreError> {
        let rows = sqlx::query(&format!(
            "SELECT {MOVEMENT_COLUMNS} FROM stock_movements WHERE product_id = $1 \
             ORDER BY created_at DESC, sequence DESC"
        ))
        .bind(id.as_uuid())
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("movements_for_product", e))?;

        rows.iter().map(movement_from_row).collect()
    }

    #[instrument(skip(self), err)]
    async fn all_movements(&self) -> Result<Vec<Movement>, StoreError> {
        let rows = sqlx::query(&format!(
            "SELECT {MOVEMENT_COLUMNS} FROM stock_movements ORDER BY created_at DESC, sequence DESC"
        ))
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("all_movements", e))?;

        rows.iter().map(movement_from_row).collect()
    }
}

fn product_from_row(row: &PgRow) -> Result<Product, StoreError> {
    let id: uuid::Uuid = row.try_get("id").map_err(|e| decode_error("products.id", e))?;
    let version: i64 = row
        .try_get("version")
        .map_err(|e| decode_error("products.version", e))?;

    let record = ProductRecord {
        id: ProductId::from_uuid(id),
        name: row.try_get("name").map_err(|e| decode_error("products.name", e))?,
        description: row
            .try_get("description")
            .map_err(|e| decode_error("products.description", e))?,
        sku: row.try_get("sku").map_err(|e| decode_error("products.sku", e))?,
        price: row
            .try_get::<Decimal, _>("price")
            .map_err(|e| decode_error("products.price", e))?,
        stock_quantity: row
            .try_get("stock_quantity")
            .map_err(|e| decode_error("products.stock_quantity", e))?,
        reorder_level: row
            .try_get("reorder_level")
            .map_err(|e| decode_error("products.reorder_level", e))?,
        is_active: row
            .try_get("is_active")
            .map_err(|e| decode_error("products.is_active", e))?,
        created_at: row
            .try_get::<DateTime<Utc>, _>("created_at")
            .map_err(|e| decode_error("products.created_at", e))?,
        updated_at: row
            .try_get::<DateTime<Utc>, _>("updated_at")
            .map_err(|e| decode_error("products.updated_at", e))?,
        version: version as u64,
    };

    Product::rehydrate(record).map_err(|e| StoreError::Backend(e.to_string()))
}

fn movement_from_row(row: &PgRow) -> Result<Movement, StoreError> {
    let id: uuid::Uuid = row
        .try_get("id")
        .map_err(|e| decode_error("stock_movements.id", e))?;
    let product_id: uuid::Uuid = row
        .try_get("product_id")
        .map_err(|e| decode_error("stock_movements.product_id", e))?;
    let code: i16 = row
        .try_get("movement_type")
        .map_err(|e| decode_error("stock_movements.movement_type", e))?;
    let sequence: i64 = row
        .try_get("sequence")
        .map_err(|e| decode_error("stock_movements.sequence", e))?;

    Ok(Movement {
        id: MovementId::from_uuid(id),
        product_id: ProductId::from_uuid(product_id),
        movement_type: MovementType::from_code(i64::from(code))
            .map_err(|e| StoreError::Backend(e.to_string()))?,
        quantity: row
            .try_get("quantity")
            .map_err(|e| decode_error("stock_movements.quantity", e))?,
        notes: row
            .try_get("notes")
            .map_err(|e| decode_error("stock_movements.notes", e))?,
        created_at: row
            .try_get::<DateTime<Utc>, _>("created_at")
            .map_err(|e| decode_error("stock_movements.created_at", e))?,
        sequence: sequence as u64,
    })
}

fn decode_error(column: &str, err: sqlx::Error) -> StoreError {
    StoreError::Backend(format!("failed to decode {column}: {err}"))
}

/// Map SQLx errors to `StoreError`. See the module docs for the table.
fn map_sqlx_error(operation: &str, err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db_err) => {
            let msg = format!("database error in {}: {}", operation, db_err.message());
            match db_err.code().as_deref() {
                Some("23505") if db_err.constraint() == Some(SKU_CONSTRAINT) => {
                    StoreError::DuplicateSku(msg)
                }
                Some("23505") => StoreError::Concurrency(msg),
                Some("23514") => StoreError::InvalidWrite(msg),
                _ => StoreError::Backend(msg),
            }
        }
        sqlx::Error::PoolClosed => {
            StoreError::Backend(format!("connection pool closed in {}", operation))
        }
        _ => StoreError::Backend(format!("sqlx error in {}: {}", operation, err)),
    }
}
