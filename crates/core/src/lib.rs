//! `stockroom-core`: domain foundation building blocks.
//!
//! This crate contains **pure domain** primitives (no infrastructure concerns):
//! identifiers, the entity contract used by repositories, optimistic version
//! checks, money helpers and the shared error model.

pub mod entity;
pub mod error;
pub mod id;
pub mod money;
pub mod version;

pub use entity::{Entity, Timestamps};
pub use error::{DomainError, DomainResult};
pub use id::{CustomerId, ProductId, PurchaseOrderId, SaleId, SupplierId, UserId};
pub use money::Money;
pub use version::ExpectedVersion;
