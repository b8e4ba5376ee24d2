//! Product catalogue module.
//!
//! A product carries its catalogue data, pricing and the current stock level.
//! Stock only moves through `receive_stock`/`withdraw_stock`, which purchase
//! receipts and sale confirmations call.

pub mod product;

pub use product::{NewProduct, Product, ProductPatch, ProductStatus, MAX_STOCK};
