//! Catalog storage boundary.
//!
//! Products and their stock ledger live behind one store so that a stock
//! change and its ledger entry can be committed as a single unit.

pub mod in_memory;
pub mod ledger;
pub mod r#trait;

#[cfg(feature = "postgres")]
pub mod postgres;

pub use in_memory::InMemoryCatalogStore;
pub use ledger::Ledger;
pub use r#trait::{CatalogStore, StoreError};

#[cfg(feature = "postgres")]
pub use postgres::PostgresCatalogStore;
