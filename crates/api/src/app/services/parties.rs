use chrono::Utc;
use serde_json::json;
use tracing::info;

use stockroom_core::{CustomerId, DomainError, Entity, ExpectedVersion, SupplierId};
use stockroom_parties::{Customer, CustomerPatch, NewCustomer, NewSupplier, Supplier, SupplierPatch};
use stockroom_purchasing::PurchaseOrder;
use stockroom_sales::Sale;

use super::{insert, load, update, AppServices, ServiceResult};

impl AppServices {
    pub async fn list_customers(&self) -> ServiceResult<Vec<Customer>> {
        Ok(self.repos.customers.find_all().await?)
    }

    pub async fn get_customer(&self, id: CustomerId) -> ServiceResult<Customer> {
        load(self.repos.customers.as_ref(), id).await
    }

    pub async fn create_customer(&self, input: NewCustomer) -> ServiceResult<Customer> {
        let customer = Customer::register(input, Utc::now())?;
        let customer = insert(self.repos.customers.as_ref(), customer).await?;
        info!(customer_id = %customer.id(), "customer registered");
        Ok(customer)
    }

    pub async fn update_customer(
        &self,
        id: CustomerId,
        patch: CustomerPatch,
        expected: ExpectedVersion,
    ) -> ServiceResult<Customer> {
        let mut customer = self.get_customer(id).await?;
        expected.check(customer.version())?;
        customer.update(patch, Utc::now())?;
        update(self.repos.customers.as_ref(), customer).await
    }

    /// Refused while any sale references the customer.
    pub async fn delete_customer(&self, id: CustomerId, expected: ExpectedVersion) -> ServiceResult<()> {
        let customer = self.get_customer(id).await?;
        expected.check(customer.version())?;
        if !self.customer_sales(id).await?.is_empty() {
            return Err(DomainError::conflict("customer has recorded sales").into());
        }
        self.repos.customers.delete(id).await?;
        info!(customer_id = %id, "customer deleted");
        Ok(())
    }

    pub async fn customer_sales(&self, id: CustomerId) -> ServiceResult<Vec<Sale>> {
        self.get_customer(id).await?;
        Ok(self
            .repos
            .sales
            .find_by_field("customer_id", &json!(id))
            .await?)
    }

    pub async fn list_suppliers(&self) -> ServiceResult<Vec<Supplier>> {
        Ok(self.repos.suppliers.find_all().await?)
    }

    pub async fn get_supplier(&self, id: SupplierId) -> ServiceResult<Supplier> {
        load(self.repos.suppliers.as_ref(), id).await
    }

    pub async fn create_supplier(&self, input: NewSupplier) -> ServiceResult<Supplier> {
        let supplier = Supplier::register(input, Utc::now())?;
        let supplier = insert(self.repos.suppliers.as_ref(), supplier).await?;
        info!(supplier_id = %supplier.id(), "supplier registered");
        Ok(supplier)
    }

    pub async fn update_supplier(
        &self,
        id: SupplierId,
        patch: SupplierPatch,
        expected: ExpectedVersion,
    ) -> ServiceResult<Supplier> {
        let mut supplier = self.get_supplier(id).await?;
        expected.check(supplier.version())?;
        supplier.update(patch, Utc::now())?;
        update(self.repos.suppliers.as_ref(), supplier).await
    }

    /// Refused while purchase orders or products reference the supplier.
    pub async fn delete_supplier(&self, id: SupplierId, expected: ExpectedVersion) -> ServiceResult<()> {
        let supplier = self.get_supplier(id).await?;
        expected.check(supplier.version())?;
        if !self.supplier_purchases(id).await?.is_empty() {
            return Err(DomainError::conflict("supplier has purchase orders").into());
        }
        let supplied = self
            .repos
            .products
            .find_by_field("supplier_id", &json!(id))
            .await?;
        if !supplied.is_empty() {
            return Err(DomainError::conflict("supplier is linked to products").into());
        }
        self.repos.suppliers.delete(id).await?;
        info!(supplier_id = %id, "supplier deleted");
        Ok(())
    }

    pub async fn supplier_purchases(&self, id: SupplierId) -> ServiceResult<Vec<PurchaseOrder>> {
        self.get_supplier(id).await?;
        Ok(self
            .repos
            .purchases
            .find_by_field("supplier_id", &json!(id))
            .await?)
    }
}
