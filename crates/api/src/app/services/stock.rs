//! Writes that move stock across several records.
//!
//! Repositories have no cross-record transaction, so a move is committed in a
//! fixed order: the touched products first, the order or sale last. When any
//! write fails, the products already written are put back.

use tracing::error;

use stockroom_core::{Entity, ExpectedVersion};
use stockroom_infra::Repository;
use stockroom_products::Product;

use super::{update, AppServices, ServiceResult};

/// One product before and after a stock move.
pub(super) struct StockMove {
    pub before: Product,
    pub after: Product,
}

impl AppServices {
    /// Caller holds `stock_lock`.
    pub(super) async fn commit_stock_move<E: Entity>(
        &self,
        moves: Vec<StockMove>,
        repo: &dyn Repository<E>,
        record: E,
    ) -> ServiceResult<E> {
        let mut written: Vec<(Product, u64)> = Vec::with_capacity(moves.len());
        for StockMove { before, after } in moves {
            match update(self.repos.products.as_ref(), after).await {
                Ok(saved) => written.push((before, saved.version())),
                Err(err) => {
                    self.restore_products(written).await;
                    return Err(err);
                }
            }
        }

        match update(repo, record).await {
            Ok(saved) => Ok(saved),
            Err(err) => {
                self.restore_products(written).await;
                Err(err)
            }
        }
    }

    async fn restore_products(&self, written: Vec<(Product, u64)>) {
        for (before, version) in written {
            let id = before.id();
            if let Err(e) = self
                .repos
                .products
                .save(before, ExpectedVersion::Exact(version))
                .await
            {
                error!(product_id = %id, error = %e, "failed to restore stock after an aborted move");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    use async_trait::async_trait;
    use rust_decimal::Decimal;
    use serde_json::Value as JsonValue;

    use stockroom_core::{ExpectedVersion, ProductId};
    use stockroom_infra::{InMemoryRepository, RepositoryError};
    use stockroom_parties::{ContactInfo, NewCustomer, NewSupplier};
    use stockroom_products::NewProduct;
    use stockroom_purchasing::{NewPurchaseLine, NewPurchaseOrder, PurchaseOrderStatus};
    use stockroom_sales::{Sale, SaleStatus};

    use super::*;
    use crate::app::services::{test_services, Repositories, SaleInput, SaleLineInput};

    /// In-memory repository whose writes can be switched off.
    struct Switchable<E: Entity> {
        inner: InMemoryRepository<E>,
        fail_saves: AtomicBool,
    }

    impl<E: Entity> Switchable<E> {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                inner: InMemoryRepository::new(),
                fail_saves: AtomicBool::new(false),
            })
        }

        fn fail_saves(&self, on: bool) {
            self.fail_saves.store(on, Ordering::SeqCst);
        }
    }

    #[async_trait]
    impl<E: Entity> Repository<E> for Switchable<E> {
        async fn find_all(&self) -> Result<Vec<E>, RepositoryError> {
            self.inner.find_all().await
        }

        async fn find_by_id(&self, id: E::Id) -> Result<Option<E>, RepositoryError> {
            self.inner.find_by_id(id).await
        }

        async fn find_by_field(&self, field: &str, value: &JsonValue) -> Result<Vec<E>, RepositoryError> {
            self.inner.find_by_field(field, value).await
        }

        async fn save(&self, entity: E, expected: ExpectedVersion) -> Result<E, RepositoryError> {
            if self.fail_saves.load(Ordering::SeqCst) {
                return Err(RepositoryError::Conflict("write refused".into()));
            }
            self.inner.save(entity, expected).await
        }

        async fn delete(&self, id: E::Id) -> Result<bool, RepositoryError> {
            self.inner.delete(id).await
        }

        async fn count(&self) -> Result<u64, RepositoryError> {
            self.inner.count().await
        }
    }

    struct Fixture {
        services: AppServices,
        products: Arc<Switchable<Product>>,
        sales: Arc<Switchable<Sale>>,
    }

    fn fixture() -> Fixture {
        let products = Switchable::<Product>::new();
        let sales = Switchable::<Sale>::new();
        let mut repos = Repositories::in_memory();
        repos.products = products.clone() as Arc<dyn Repository<Product>>;
        repos.sales = sales.clone() as Arc<dyn Repository<Sale>>;
        Fixture { services: test_services(repos), products, sales }
    }

    async fn product_with_stock(services: &AppServices, sku: &str, stock: i64) -> ProductId {
        services
            .create_product(NewProduct {
                sku: sku.into(),
                name: sku.into(),
                unit_price: Decimal::from(10),
                quantity_in_stock: stock,
                ..Default::default()
            })
            .await
            .unwrap()
            .id()
    }

    async fn pending_sale(services: &AppServices, lines: &[(ProductId, u32)]) -> Sale {
        let customer = services
            .create_customer(NewCustomer { name: "Ada".into(), contact: ContactInfo::default() })
            .await
            .unwrap();
        services
            .create_sale(SaleInput {
                customer_id: customer.id(),
                lines: lines
                    .iter()
                    .map(|(product_id, quantity)| SaleLineInput {
                        product_id: *product_id,
                        quantity: *quantity,
                        unit_price: None,
                    })
                    .collect(),
                discount: Decimal::ZERO,
            })
            .await
            .unwrap()
    }

    async fn stock_of(services: &AppServices, id: ProductId) -> i64 {
        services.get_product(id).await.unwrap().quantity_in_stock()
    }

    #[tokio::test]
    async fn failed_product_write_leaves_sale_pending_and_stock_untouched() {
        let f = fixture();
        let product = product_with_stock(&f.services, "WID", 5).await;
        let sale = pending_sale(&f.services, &[(product, 2)]).await;

        f.products.fail_saves(true);
        let res = f.services.confirm_sale(sale.id(), ExpectedVersion::Any).await;
        f.products.fail_saves(false);

        assert!(res.is_err());
        let stored = f.services.get_sale(sale.id()).await.unwrap();
        assert_eq!(stored.status(), SaleStatus::Pending);
        assert_eq!(stock_of(&f.services, product).await, 5);
    }

    #[tokio::test]
    async fn failed_sale_write_puts_withdrawn_stock_back() {
        let f = fixture();
        let a = product_with_stock(&f.services, "A", 5).await;
        let b = product_with_stock(&f.services, "B", 7).await;
        let sale = pending_sale(&f.services, &[(a, 2), (b, 3)]).await;

        f.sales.fail_saves(true);
        let res = f.services.confirm_sale(sale.id(), ExpectedVersion::Any).await;
        f.sales.fail_saves(false);

        assert!(res.is_err());
        assert_eq!(f.services.get_sale(sale.id()).await.unwrap().status(), SaleStatus::Pending);
        assert_eq!(stock_of(&f.services, a).await, 5);
        assert_eq!(stock_of(&f.services, b).await, 7);

        let confirmed = f.services.confirm_sale(sale.id(), ExpectedVersion::Any).await.unwrap();
        assert_eq!(confirmed.status(), SaleStatus::Confirmed);
        assert_eq!(stock_of(&f.services, a).await, 3);
        assert_eq!(stock_of(&f.services, b).await, 4);
    }

    #[tokio::test]
    async fn failed_product_write_leaves_purchase_order_pending() {
        let f = fixture();
        let supplier = f
            .services
            .create_supplier(NewSupplier {
                name: "Parts Co".into(),
                ..Default::default()
            })
            .await
            .unwrap();
        let product = product_with_stock(&f.services, "BOLT", 1).await;
        let order = f
            .services
            .create_purchase(NewPurchaseOrder {
                supplier_id: supplier.id(),
                lines: vec![NewPurchaseLine {
                    product_id: product,
                    quantity: 10,
                    unit_cost: Decimal::from(2),
                }],
                note: None,
            })
            .await
            .unwrap();

        f.products.fail_saves(true);
        let res = f.services.receive_purchase(order.id(), ExpectedVersion::Any).await;
        f.products.fail_saves(false);

        assert!(res.is_err());
        let stored = f.services.get_purchase(order.id()).await.unwrap();
        assert_eq!(stored.status(), PurchaseOrderStatus::Pending);
        assert_eq!(stock_of(&f.services, product).await, 1);
    }
}
