use chrono::{Datelike, Utc};

use stockroom_core::DomainError;
use stockroom_reports::{self as reports, Dashboard, Period, ProductSales, YearReport, YearSummary};

use super::{AppServices, ServiceResult};

pub const DEFAULT_TOP_LIMIT: usize = 10;
pub const MAX_TOP_LIMIT: usize = 100;

impl AppServices {
    pub async fn dashboard(&self) -> ServiceResult<Dashboard> {
        let customers = self.repos.customers.count().await?;
        let suppliers = self.repos.suppliers.count().await?;
        let products = self.repos.products.find_all().await?;
        let sales = self.repos.sales.find_all().await?;
        let purchases = self.repos.purchases.find_all().await?;
        Ok(reports::dashboard(
            customers as usize,
            suppliers as usize,
            &products,
            &sales,
            &purchases,
        )?)
    }

    /// Month-by-month figures; defaults to the current year.
    pub async fn monthly_report(&self, year: Option<i32>) -> ServiceResult<YearReport> {
        let year = year.unwrap_or_else(|| Utc::now().year());
        let sales = self.repos.sales.find_all().await?;
        let purchases = self.repos.purchases.find_all().await?;
        let products = self.repos.products.find_all().await?;
        Ok(reports::monthly_report(year, &sales, &purchases, &products)?)
    }

    pub async fn yearly_overview(&self) -> ServiceResult<Vec<YearSummary>> {
        let sales = self.repos.sales.find_all().await?;
        let purchases = self.repos.purchases.find_all().await?;
        let products = self.repos.products.find_all().await?;
        Ok(reports::yearly_overview(&sales, &purchases, &products)?)
    }

    pub async fn top_products(
        &self,
        year: Option<i32>,
        month: Option<u32>,
        limit: Option<usize>,
    ) -> ServiceResult<Vec<ProductSales>> {
        let period = Period::new(year, month)?;
        let limit = limit.unwrap_or(DEFAULT_TOP_LIMIT);
        if !(1..=MAX_TOP_LIMIT).contains(&limit) {
            return Err(DomainError::validation(format!(
                "limit must be between 1 and {MAX_TOP_LIMIT}"
            ))
            .into());
        }
        let sales = self.repos.sales.find_all().await?;
        let products = self.repos.products.find_all().await?;
        Ok(reports::top_products(period, &sales, &products, limit)?)
    }
}
