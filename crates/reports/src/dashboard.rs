use serde::Serialize;

use stockroom_core::{money, DomainResult, Entity, Money, ProductId};
use stockroom_products::Product;
use stockroom_purchasing::{PurchaseOrder, PurchaseOrderStatus};
use stockroom_sales::{Sale, SaleStatus};

use crate::summary::confirmed_revenue;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LowStockItem {
    pub product_id: ProductId,
    pub sku: String,
    pub name: String,
    pub quantity_in_stock: i64,
    pub reorder_level: i64,
}

/// At-a-glance counters for the landing page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Dashboard {
    pub customers: usize,
    pub suppliers: usize,
    pub products: usize,
    pub pending_sales: usize,
    pub pending_purchases: usize,
    pub revenue: Money,
    pub stock_value: Money,
    pub low_stock: Vec<LowStockItem>,
}

/// Fails only when the sums leave the supported decimal range.
pub fn dashboard(
    customers: usize,
    suppliers: usize,
    products: &[Product],
    sales: &[Sale],
    purchases: &[PurchaseOrder],
) -> DomainResult<Dashboard> {
    let mut low_stock: Vec<LowStockItem> = products
        .iter()
        .filter(|p| p.needs_reorder())
        .map(|p| LowStockItem {
            product_id: p.id(),
            sku: p.sku().to_string(),
            name: p.name().to_string(),
            quantity_in_stock: p.quantity_in_stock(),
            reorder_level: p.reorder_level(),
        })
        .collect();
    low_stock.sort_by(|a, b| a.quantity_in_stock.cmp(&b.quantity_in_stock).then_with(|| a.sku.cmp(&b.sku)));

    let stock_value = money::checked_sum(
        products
            .iter()
            .map(Product::stock_value)
            .collect::<DomainResult<Vec<_>>>()?,
    )?;

    Ok(Dashboard {
        customers,
        suppliers,
        products: products.len(),
        pending_sales: sales.iter().filter(|s| s.status() == SaleStatus::Pending).count(),
        pending_purchases: purchases
            .iter()
            .filter(|p| p.status() == PurchaseOrderStatus::Pending)
            .count(),
        revenue: confirmed_revenue(sales)?,
        stock_value,
        low_stock,
    })
}
