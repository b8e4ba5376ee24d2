//! Parties domain module: customers and suppliers.
//!
//! Pure domain logic (no IO, no HTTP, no storage). Services load a record,
//! call one of the operations here and hand the result back to a repository.

pub mod contact;
pub mod customer;
pub mod supplier;

pub use contact::{ContactInfo, ContactPatch};
pub use customer::{Customer, CustomerPatch, NewCustomer};
pub use supplier::{NewSupplier, Supplier, SupplierPatch};
