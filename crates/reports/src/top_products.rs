use std::collections::HashMap;

use serde::Serialize;

use stockroom_core::{money, DomainResult, Entity, Money, ProductId};
use stockroom_products::Product;
use stockroom_sales::{Sale, SaleStatus};

use crate::period::Period;

/// Units sold and gross line revenue for one product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProductSales {
    pub product_id: ProductId,
    pub sku: Option<String>,
    pub name: Option<String>,
    pub units_sold: u64,
    pub revenue: Money,
}

/// Best sellers among confirmed sales in `period`, by revenue then name.
///
/// Revenue here is the line total before sale-level discounts.
pub fn top_products(
    period: Period,
    sales: &[Sale],
    products: &[Product],
    limit: usize,
) -> DomainResult<Vec<ProductSales>> {
    let catalogue: HashMap<ProductId, &Product> = products.iter().map(|p| (p.id(), p)).collect();
    let mut totals: HashMap<ProductId, (u64, Money)> = HashMap::new();

    for sale in sales.iter().filter(|s| s.status() == SaleStatus::Confirmed) {
        let Some(at) = sale.confirmed_at() else { continue };
        if !period.contains(at) {
            continue;
        }
        for line in sale.lines() {
            let entry = totals.entry(line.product_id).or_default();
            entry.0 = entry.0.saturating_add(u64::from(line.quantity));
            entry.1 = money::checked_sum([entry.1, line.total()])?;
        }
    }

    let mut rows: Vec<ProductSales> = totals
        .into_iter()
        .map(|(product_id, (units_sold, revenue))| {
            let product = catalogue.get(&product_id);
            ProductSales {
                product_id,
                sku: product.map(|p| p.sku().to_string()),
                name: product.map(|p| p.name().to_string()),
                units_sold,
                revenue,
            }
        })
        .collect();

    rows.sort_by(|a, b| {
        b.revenue
            .cmp(&a.revenue)
            .then_with(|| a.name.cmp(&b.name))
            .then_with(|| a.product_id.cmp(&b.product_id))
    });
    rows.truncate(limit);
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use rust_decimal::Decimal;
    use stockroom_core::CustomerId;
    use stockroom_products::NewProduct;
    use stockroom_sales::{NewSale, NewSaleLine};

    fn product(sku: &str, name: &str) -> Product {
        Product::create(
            NewProduct {
                sku: sku.into(),
                name: name.into(),
                unit_price: Decimal::from(1),
                ..Default::default()
            },
            Utc::now(),
        )
        .unwrap()
    }

    fn sale(lines: &[(&Product, u32, i64)], month: u32) -> Sale {
        let mut s = Sale::create(
            NewSale {
                customer_id: CustomerId::new(),
                lines: lines
                    .iter()
                    .map(|(p, q, price)| NewSaleLine {
                        product_id: p.id(),
                        quantity: *q,
                        unit_price: Decimal::from(*price),
                    })
                    .collect(),
                discount: Decimal::ZERO,
            },
            Utc::now(),
        )
        .unwrap();
        s.confirm(Utc.with_ymd_and_hms(2024, month, 1, 0, 0, 0).unwrap()).unwrap();
        s
    }

    #[test]
    fn ranks_by_revenue_and_honours_limit() {
        let a = product("A", "Alpha");
        let b = product("B", "Bravo");
        let c = product("C", "Charlie");
        let sales = vec![
            sale(&[(&a, 1, 10), (&b, 3, 10)], 1),
            sale(&[(&c, 1, 5), (&a, 1, 10)], 2),
        ];
        let catalogue = vec![a.clone(), b.clone(), c.clone()];

        let rows = top_products(Period::all_time(), &sales, &catalogue, 2).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].product_id, b.id());
        assert_eq!(rows[0].units_sold, 3);
        assert_eq!(rows[1].product_id, a.id());
        assert_eq!(rows[1].revenue, Decimal::from(20));
    }

    #[test]
    fn month_filter_narrows_the_window() {
        let a = product("A", "Alpha");
        let sales = vec![sale(&[(&a, 1, 10)], 1), sale(&[(&a, 2, 10)], 2)];
        let period = Period::new(Some(2024), Some(2)).unwrap();
        let rows = top_products(period, &sales, std::slice::from_ref(&a), 10).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].units_sold, 2);
        assert_eq!(rows[0].sku.as_deref(), Some("A"));
    }

    #[test]
    fn ties_break_on_name() {
        let z = product("Z", "Zulu");
        let a = product("A", "Alpha");
        let sales = vec![sale(&[(&z, 1, 10), (&a, 1, 10)], 3)];
        let rows = top_products(Period::all_time(), &sales, &[z, a], 10).unwrap();
        assert_eq!(rows[0].name.as_deref(), Some("Alpha"));
    }
}
