//! Sales module: stock disposal to customers.

pub mod sale;

pub use sale::{NewSale, NewSaleLine, Sale, SaleLine, SaleStatus, StockEffect};
