//! Read-side projections.
//!
//! Views are computed from the store at read time, so they can never drift
//! from the product and ledger state they describe.

pub mod catalog;

pub use catalog::{CatalogQueries, LowStockView, MovementView, ProductView};
