//! Domain primitives shared by every Stockroom crate: typed ids, the domain
//! error type and optimistic version expectations. No IO lives here.

pub mod aggregate;
pub mod error;
pub mod id;

pub use aggregate::{AggregateRoot, ExpectedVersion};
pub use error::{DomainError, DomainResult};
pub use id::{MovementId, ProductId};
