//! Infrastructure layer: catalog storage, the stock mutation engine, and read projections.

pub mod catalog_store;
pub mod engine;
pub mod error;
pub mod projections;


pub use catalog_store::{CatalogStore, InMemoryCatalogStore, Ledger, StoreError};
pub use engine::{CreatedProduct, StockEngine, StockMovementOutcome};
pub use error::CatalogError;
pub use projections::catalog::{CatalogQueries, LowStockView, MovementView, ProductView};
