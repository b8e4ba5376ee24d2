//! Financial and stock reports.
//!
//! Every report is a pure function over already-loaded records: the caller
//! fetches sales, purchase orders and products from its repositories and the
//! aggregation happens in memory. Only confirmed sales and received purchase
//! orders count as financial activity.

pub mod dashboard;
pub mod period;
pub mod summary;
pub mod top_products;

pub use dashboard::{dashboard, Dashboard, LowStockItem};
pub use period::Period;
pub use summary::{monthly_report, yearly_overview, MonthSummary, Totals, YearReport, YearSummary};
pub use top_products::{top_products, ProductSales};
