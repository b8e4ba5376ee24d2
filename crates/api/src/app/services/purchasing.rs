use std::collections::HashMap;

use chrono::Utc;
use tracing::info;

use stockroom_core::{Entity, ExpectedVersion, ProductId, PurchaseOrderId};
use stockroom_purchasing::{NewPurchaseOrder, PurchaseOrder, PurchaseOrderStatus};

use super::stock::StockMove;
use super::{insert, load, update, AppServices, ServiceResult};

impl AppServices {
    pub async fn list_purchases(
        &self,
        status: Option<PurchaseOrderStatus>,
    ) -> ServiceResult<Vec<PurchaseOrder>> {
        let orders = self.repos.purchases.find_all().await?;
        Ok(orders
            .into_iter()
            .filter(|po| status.is_none_or(|s| po.status() == s))
            .collect())
    }

    pub async fn get_purchase(&self, id: PurchaseOrderId) -> ServiceResult<PurchaseOrder> {
        load(self.repos.purchases.as_ref(), id).await
    }

    pub async fn create_purchase(&self, input: NewPurchaseOrder) -> ServiceResult<PurchaseOrder> {
        self.get_supplier(input.supplier_id).await?;
        for line in &input.lines {
            self.get_product(line.product_id).await?;
        }
        let order = PurchaseOrder::create(input, Utc::now())?;
        let order = insert(self.repos.purchases.as_ref(), order).await?;
        info!(
            purchase_order_id = %order.id(),
            supplier_id = %order.supplier_id(),
            total = %order.total(),
            "purchase order created"
        );
        Ok(order)
    }

    /// Mark the order received and add every line to stock.
    pub async fn receive_purchase(
        &self,
        id: PurchaseOrderId,
        expected: ExpectedVersion,
    ) -> ServiceResult<PurchaseOrder> {
        let _stock = self.stock_lock.lock().await;
        let now = Utc::now();

        let mut order = self.get_purchase(id).await?;
        expected.check(order.version())?;
        order.receive(now)?;

        let mut moved: HashMap<ProductId, StockMove> = HashMap::new();
        for line in order.lines() {
            if !moved.contains_key(&line.product_id) {
                let before = self.get_product(line.product_id).await?;
                let after = before.clone();
                moved.insert(line.product_id, StockMove { before, after });
            }
            if let Some(m) = moved.get_mut(&line.product_id) {
                m.after.receive_stock(line.quantity, now)?;
            }
        }

        let order = self
            .commit_stock_move(moved.into_values().collect(), self.repos.purchases.as_ref(), order)
            .await?;
        info!(purchase_order_id = %id, lines = order.lines().len(), "purchase order received");
        Ok(order)
    }

    pub async fn cancel_purchase(
        &self,
        id: PurchaseOrderId,
        expected: ExpectedVersion,
    ) -> ServiceResult<PurchaseOrder> {
        let _stock = self.stock_lock.lock().await;
        let mut order = self.get_purchase(id).await?;
        expected.check(order.version())?;
        order.cancel(Utc::now())?;
        let order = update(self.repos.purchases.as_ref(), order).await?;
        info!(purchase_order_id = %id, "purchase order cancelled");
        Ok(order)
    }
}
