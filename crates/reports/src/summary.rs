use std::collections::{BTreeMap, HashMap};

use chrono::Datelike;
use serde::Serialize;

use stockroom_core::{money, DomainResult, Money, ProductId};
use stockroom_products::Product;
use stockroom_purchasing::{PurchaseOrder, PurchaseOrderStatus};
use stockroom_sales::{Sale, SaleStatus};

use crate::period::check_year;

/// Aggregated figures for a period.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Totals {
    /// Confirmed sales, net of discounts.
    pub revenue: Money,
    /// Received purchase orders at cost.
    pub purchases: Money,
    /// Current cost price of the units sold.
    pub cost_of_goods: Money,
    pub gross_profit: Money,
    pub sales_count: usize,
    pub purchase_count: usize,
}

impl Totals {
    fn add_sale(&mut self, revenue: Money, cost: Money) -> DomainResult<()> {
        self.revenue = money::checked_sum([self.revenue, revenue])?;
        self.cost_of_goods = money::checked_sum([self.cost_of_goods, cost])?;
        self.gross_profit = self.revenue - self.cost_of_goods;
        self.sales_count += 1;
        Ok(())
    }

    fn add_purchase(&mut self, amount: Money) -> DomainResult<()> {
        self.purchases = money::checked_sum([self.purchases, amount])?;
        self.purchase_count += 1;
        Ok(())
    }

    fn merge(&mut self, other: &Totals) -> DomainResult<()> {
        self.revenue = money::checked_sum([self.revenue, other.revenue])?;
        self.purchases = money::checked_sum([self.purchases, other.purchases])?;
        self.cost_of_goods = money::checked_sum([self.cost_of_goods, other.cost_of_goods])?;
        self.gross_profit = self.revenue - self.cost_of_goods;
        self.sales_count += other.sales_count;
        self.purchase_count += other.purchase_count;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MonthSummary {
    pub month: u32,
    #[serde(flatten)]
    pub totals: Totals,
}

/// Month-by-month figures for one calendar year (always twelve entries).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct YearReport {
    pub year: i32,
    pub months: Vec<MonthSummary>,
    pub totals: Totals,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct YearSummary {
    pub year: i32,
    #[serde(flatten)]
    pub totals: Totals,
}

type Buckets = BTreeMap<(i32, u32), Totals>;

fn cost_index(products: &[Product]) -> HashMap<ProductId, Money> {
    use stockroom_core::Entity;
    products.iter().map(|p| (p.id(), p.cost_price())).collect()
}

/// Single pass over the records, bucketing activity by (year, month).
fn bucket(sales: &[Sale], purchases: &[PurchaseOrder], products: &[Product]) -> DomainResult<Buckets> {
    let costs = cost_index(products);
    let mut buckets = Buckets::new();

    for sale in sales.iter().filter(|s| s.status() == SaleStatus::Confirmed) {
        let Some(at) = sale.confirmed_at() else { continue };
        let cost = sale.cost_of_goods(|id| costs.get(&id).copied())?;
        buckets
            .entry((at.year(), at.month()))
            .or_default()
            .add_sale(sale.total(), cost)?;
    }

    for po in purchases.iter().filter(|p| p.status() == PurchaseOrderStatus::InStock) {
        let Some(at) = po.received_at() else { continue };
        buckets
            .entry((at.year(), at.month()))
            .or_default()
            .add_purchase(po.total())?;
    }

    Ok(buckets)
}

/// Month-by-month report for `year`.
pub fn monthly_report(
    year: i32,
    sales: &[Sale],
    purchases: &[PurchaseOrder],
    products: &[Product],
) -> DomainResult<YearReport> {
    check_year(year)?;
    let buckets = bucket(sales, purchases, products)?;

    let mut totals = Totals::default();
    let mut months = Vec::with_capacity(12);
    for month in 1..=12 {
        let month_totals = buckets.get(&(year, month)).cloned().unwrap_or_default();
        totals.merge(&month_totals)?;
        months.push(MonthSummary { month, totals: month_totals });
    }

    Ok(YearReport { year, months, totals })
}

/// One entry per calendar year that has any activity, ascending.
pub fn yearly_overview(
    sales: &[Sale],
    purchases: &[PurchaseOrder],
    products: &[Product],
) -> DomainResult<Vec<YearSummary>> {
    let mut years: BTreeMap<i32, Totals> = BTreeMap::new();
    for ((year, _month), totals) in bucket(sales, purchases, products)? {
        years.entry(year).or_default().merge(&totals)?;
    }
    Ok(years
        .into_iter()
        .map(|(year, totals)| YearSummary { year, totals })
        .collect())
}

/// All-time revenue of confirmed sales.
pub(crate) fn confirmed_revenue(sales: &[Sale]) -> DomainResult<Money> {
    money::checked_sum(
        sales
            .iter()
            .filter(|s| s.status() == SaleStatus::Confirmed)
            .map(Sale::total),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use rust_decimal::Decimal;
    use stockroom_core::{CustomerId, SupplierId};
    use stockroom_products::NewProduct;
    use stockroom_purchasing::{NewPurchaseLine, NewPurchaseOrder};
    use stockroom_sales::{NewSale, NewSaleLine};

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    fn product(cost: &str) -> Product {
        Product::create(
            NewProduct {
                sku: format!("SKU-{cost}"),
                name: "Thing".into(),
                unit_price: dec("10"),
                cost_price: dec(cost),
                ..Default::default()
            },
            Utc::now(),
        )
        .unwrap()
    }

    fn confirmed_sale(product: &Product, qty: u32, price: &str, y: i32, m: u32) -> Sale {
        use stockroom_core::Entity;
        let mut sale = Sale::create(
            NewSale {
                customer_id: CustomerId::new(),
                lines: vec![NewSaleLine {
                    product_id: product.id(),
                    quantity: qty,
                    unit_price: dec(price),
                }],
                discount: Decimal::ZERO,
            },
            Utc::now(),
        )
        .unwrap();
        sale.confirm(Utc.with_ymd_and_hms(y, m, 10, 9, 0, 0).unwrap()).unwrap();
        sale
    }

    fn received_po(product: &Product, qty: u32, cost: &str, y: i32, m: u32) -> PurchaseOrder {
        use stockroom_core::Entity;
        let mut po = PurchaseOrder::create(
            NewPurchaseOrder {
                supplier_id: SupplierId::new(),
                lines: vec![NewPurchaseLine {
                    product_id: product.id(),
                    quantity: qty,
                    unit_cost: dec(cost),
                }],
                note: None,
            },
            Utc::now(),
        )
        .unwrap();
        po.receive(Utc.with_ymd_and_hms(y, m, 2, 9, 0, 0).unwrap()).unwrap();
        po
    }

    #[test]
    fn monthly_report_buckets_by_confirmation_and_receipt_month() {
        let p = product("4");
        let sales = vec![
            confirmed_sale(&p, 2, "10", 2024, 3),
            confirmed_sale(&p, 1, "10", 2024, 3),
            confirmed_sale(&p, 5, "10", 2023, 3),
        ];
        let purchases = vec![received_po(&p, 10, "4", 2024, 1)];

        let report = monthly_report(2024, &sales, &purchases, &[p]).unwrap();
        assert_eq!(report.months.len(), 12);

        let march = &report.months[2];
        assert_eq!(march.month, 3);
        assert_eq!(march.totals.revenue, dec("30"));
        assert_eq!(march.totals.cost_of_goods, dec("12"));
        assert_eq!(march.totals.gross_profit, dec("18"));
        assert_eq!(march.totals.sales_count, 2);

        let january = &report.months[0];
        assert_eq!(january.totals.purchases, dec("40"));
        assert_eq!(january.totals.purchase_count, 1);

        assert_eq!(report.totals.revenue, dec("30"));
        assert_eq!(report.totals.purchases, dec("40"));
    }

    #[test]
    fn pending_and_cancelled_records_are_ignored() {
        use stockroom_core::Entity;
        let p = product("1");
        let pending = Sale::create(
            NewSale {
                customer_id: CustomerId::new(),
                lines: vec![NewSaleLine { product_id: p.id(), quantity: 1, unit_price: dec("5") }],
                discount: Decimal::ZERO,
            },
            Utc::now(),
        )
        .unwrap();
        let mut cancelled = confirmed_sale(&p, 1, "5", 2024, 6);
        cancelled.cancel(Utc::now()).unwrap();

        let report = monthly_report(2024, &[pending, cancelled], &[], &[p]).unwrap();
        assert_eq!(report.totals, Totals::default());
    }

    #[test]
    fn yearly_overview_lists_active_years_ascending() {
        let p = product("2");
        let sales = vec![
            confirmed_sale(&p, 1, "10", 2024, 5),
            confirmed_sale(&p, 1, "10", 2022, 1),
        ];
        let purchases = vec![received_po(&p, 1, "2", 2023, 7)];
        let years = yearly_overview(&sales, &purchases, &[p]).unwrap();
        let ys: Vec<i32> = years.iter().map(|y| y.year).collect();
        assert_eq!(ys, vec![2022, 2023, 2024]);
        assert_eq!(years[1].totals.purchases, dec("2"));
        assert_eq!(years[1].totals.revenue, Decimal::ZERO);
    }

    #[test]
    fn invalid_year_is_rejected() {
        assert!(monthly_report(10_000, &[], &[], &[]).is_err());
    }

    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            /// Property: yearly totals equal the sum of the twelve months.
            #[test]
            fn year_totals_equal_sum_of_months(
                raw in prop::collection::vec((1u32..=12, 1u32..20, 1i64..10_000), 0..30)
            ) {
                let p = product("1.25");
                let sales: Vec<Sale> = raw
                    .iter()
                    .map(|(m, q, c)| confirmed_sale(&p, *q, &Decimal::new(*c, 2).to_string(), 2024, *m))
                    .collect();
                let report = monthly_report(2024, &sales, &[], std::slice::from_ref(&p)).unwrap();

                let revenue: Decimal = report.months.iter().map(|m| m.totals.revenue).sum();
                let count: usize = report.months.iter().map(|m| m.totals.sales_count).sum();
                prop_assert_eq!(report.totals.revenue, revenue);
                prop_assert_eq!(report.totals.sales_count, count);
                prop_assert_eq!(count, raw.len());
                prop_assert_eq!(
                    report.totals.gross_profit,
                    report.totals.revenue - report.totals.cost_of_goods
                );
            }
        }
    }
}
