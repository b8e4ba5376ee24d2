use std::collections::BTreeMap;

use chrono::Utc;
use tracing::info;

use stockroom_core::{CustomerId, DomainError, Entity, ExpectedVersion, Money, ProductId, SaleId};
use stockroom_infra::MailTemplate;
use stockroom_sales::{NewSale, NewSaleLine, Sale, SaleStatus, StockEffect};

use super::stock::StockMove;
use super::{insert, load, AppServices, ServiceResult};

/// Sale line as requested; a missing price is taken from the catalogue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaleLineInput {
    pub product_id: ProductId,
    pub quantity: u32,
    pub unit_price: Option<Money>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaleInput {
    pub customer_id: CustomerId,
    pub lines: Vec<SaleLineInput>,
    pub discount: Money,
}

impl AppServices {
    pub async fn list_sales(&self, status: Option<SaleStatus>) -> ServiceResult<Vec<Sale>> {
        let sales = self.repos.sales.find_all().await?;
        Ok(sales
            .into_iter()
            .filter(|s| status.is_none_or(|st| s.status() == st))
            .collect())
    }

    pub async fn get_sale(&self, id: SaleId) -> ServiceResult<Sale> {
        load(self.repos.sales.as_ref(), id).await
    }

    /// Record a pending sale. Stock is only checked and moved on confirmation.
    pub async fn create_sale(&self, input: SaleInput) -> ServiceResult<Sale> {
        self.get_customer(input.customer_id).await?;

        let mut lines = Vec::with_capacity(input.lines.len());
        for line in input.lines {
            let product = self.get_product(line.product_id).await?;
            if !product.can_be_sold() {
                return Err(DomainError::invariant(format!(
                    "product '{}' is archived and cannot be sold",
                    product.sku()
                ))
                .into());
            }
            lines.push(NewSaleLine {
                product_id: line.product_id,
                quantity: line.quantity,
                unit_price: line.unit_price.unwrap_or(product.unit_price()),
            });
        }

        let sale = Sale::create(
            NewSale {
                customer_id: input.customer_id,
                lines,
                discount: input.discount,
            },
            Utc::now(),
        )?;
        let sale = insert(self.repos.sales.as_ref(), sale).await?;
        info!(sale_id = %sale.id(), customer_id = %sale.customer_id(), total = %sale.total(), "sale recorded");
        Ok(sale)
    }

    /// Confirm a pending sale, withdrawing stock for every line, then mail a
    /// receipt when the customer has an address.
    pub async fn confirm_sale(&self, id: SaleId, expected: ExpectedVersion) -> ServiceResult<Sale> {
        let sale = {
            let _stock = self.stock_lock.lock().await;
            let mut sale = self.get_sale(id).await?;
            expected.check(sale.version())?;
            let effect = sale.confirm(Utc::now())?;
            self.apply_stock_effect(&sale, effect).await?
        };
        info!(sale_id = %id, total = %sale.total(), "sale confirmed");
        self.send_receipt(&sale).await;
        Ok(sale)
    }

    /// Cancel a sale; a confirmed sale puts its stock back.
    pub async fn cancel_sale(&self, id: SaleId, expected: ExpectedVersion) -> ServiceResult<Sale> {
        let _stock = self.stock_lock.lock().await;
        let mut sale = self.get_sale(id).await?;
        expected.check(sale.version())?;
        let effect = sale.cancel(Utc::now())?;
        let sale = self.apply_stock_effect(&sale, effect).await?;
        info!(sale_id = %id, ?effect, "sale cancelled");
        Ok(sale)
    }

    /// Caller holds `stock_lock`. All stock checks run before anything is saved.
    async fn apply_stock_effect(&self, sale: &Sale, effect: StockEffect) -> ServiceResult<Sale> {
        let now = Utc::now();
        let mut moves: Vec<StockMove> = Vec::new();
        if effect != StockEffect::None {
            for line in sale.lines() {
                let before = self.get_product(line.product_id).await?;
                let mut after = before.clone();
                match effect {
                    StockEffect::Withdraw => after.withdraw_stock(line.quantity, now)?,
                    StockEffect::Restock => after.receive_stock(line.quantity, now)?,
                    StockEffect::None => {}
                }
                moves.push(StockMove { before, after });
            }
        }
        self.commit_stock_move(moves, self.repos.sales.as_ref(), sale.clone())
            .await
    }

    async fn send_receipt(&self, sale: &Sale) {
        let customer = match self.get_customer(sale.customer_id()).await {
            Ok(customer) => customer,
            Err(_) => return,
        };
        let Some(email) = customer.email() else {
            return;
        };

        let mut lines = String::new();
        for line in sale.lines() {
            let name = match self.get_product(line.product_id).await {
                Ok(product) => product.name().to_string(),
                Err(_) => line.product_id.to_string(),
            };
            lines.push_str(&format!(
                "{} x {} @ {} = {}\n",
                line.quantity,
                name,
                line.unit_price,
                line.total()
            ));
        }

        let vars = BTreeMap::from([
            ("sale_id", sale.id().to_string()),
            ("customer_name", customer.name().to_string()),
            ("lines", lines),
            ("subtotal", sale.subtotal().to_string()),
            ("discount", sale.discount().to_string()),
            ("total", sale.total().to_string()),
        ]);
        self.send_mail(MailTemplate::SALE_RECEIPT, email, &vars).await;
    }
}
