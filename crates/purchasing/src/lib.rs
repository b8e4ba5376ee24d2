//! Purchasing module: purchase orders placed with suppliers.

pub mod order;

pub use order::{NewPurchaseLine, NewPurchaseOrder, PurchaseLine, PurchaseOrder, PurchaseOrderStatus};
