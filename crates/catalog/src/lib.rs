//! Catalog domain module.
//!
//! This crate contains the business rules for products and their stock ledger,
//! implemented purely as deterministic domain logic (no IO, no HTTP, no storage).

pub mod movement;
pub mod product;

pub use movement::{
    plan_movement, replay_stock, Movement, MovementType, NewMovement, PlannedMovement,
    StockMovementRequest, INITIAL_STOCK_NOTE, MAX_NOTES_CHARS,
};
pub use product::{
    NewProduct, Product, ProductDetails, ProductRecord, MAX_DESCRIPTION_CHARS, MAX_NAME_CHARS,
    MAX_PRICE_SCALE, MAX_SKU_CHARS, PRICE_LIMIT,
};
