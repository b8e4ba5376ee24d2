use chrono::Utc;
use serde_json::json;
use tracing::info;

use stockroom_core::{DomainError, Entity, ExpectedVersion, ProductId, SupplierId};
use stockroom_infra::storage::validate_image;
use stockroom_products::{NewProduct, Product, ProductPatch};

use super::{insert, load, update, AppServices, ServiceResult};

/// Optional filters for the product listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProductFilter {
    pub low_stock: bool,
    pub category: Option<String>,
}

impl ProductFilter {
    fn matches(&self, product: &Product) -> bool {
        if self.low_stock && !product.needs_reorder() {
            return false;
        }
        match &self.category {
            Some(category) => product
                .category()
                .is_some_and(|c| c.eq_ignore_ascii_case(category.trim())),
            None => true,
        }
    }
}

impl AppServices {
    pub async fn list_products(&self, filter: &ProductFilter) -> ServiceResult<Vec<Product>> {
        let products = self.repos.products.find_all().await?;
        Ok(products.into_iter().filter(|p| filter.matches(p)).collect())
    }

    pub async fn get_product(&self, id: ProductId) -> ServiceResult<Product> {
        load(self.repos.products.as_ref(), id).await
    }

    pub async fn create_product(&self, input: NewProduct) -> ServiceResult<Product> {
        let product = Product::create(input, Utc::now())?;
        self.ensure_supplier(product.supplier_id()).await?;
        self.ensure_unique_sku(&product).await?;
        let product = insert(self.repos.products.as_ref(), product).await?;
        info!(product_id = %product.id(), sku = product.sku(), "product created");
        Ok(product)
    }

    pub async fn update_product(
        &self,
        id: ProductId,
        patch: ProductPatch,
        expected: ExpectedVersion,
    ) -> ServiceResult<Product> {
        let _stock = self.stock_lock.lock().await;
        let mut product = self.get_product(id).await?;
        expected.check(product.version())?;
        product.update(patch, Utc::now())?;
        self.ensure_supplier(product.supplier_id()).await?;
        self.ensure_unique_sku(&product).await?;
        update(self.repos.products.as_ref(), product).await
    }

    /// Refused while any purchase order or sale references the product.
    pub async fn delete_product(&self, id: ProductId, expected: ExpectedVersion) -> ServiceResult<()> {
        let _stock = self.stock_lock.lock().await;
        let product = self.get_product(id).await?;
        expected.check(product.version())?;

        let purchases = self.repos.purchases.find_all().await?;
        if purchases.iter().any(|po| po.references_product(id)) {
            return Err(DomainError::conflict("product is referenced by purchase orders").into());
        }
        let sales = self.repos.sales.find_all().await?;
        if sales.iter().any(|s| s.references_product(id)) {
            return Err(DomainError::conflict("product is referenced by sales").into());
        }

        self.repos.products.delete(id).await?;
        info!(product_id = %id, "product deleted");
        Ok(())
    }

    /// Store an uploaded image and point the product at its public URL.
    pub async fn upload_product_image(
        &self,
        id: ProductId,
        content_type: &str,
        bytes: Vec<u8>,
        expected: ExpectedVersion,
    ) -> ServiceResult<Product> {
        let ext = validate_image(content_type, bytes.len())?;
        expected.check(self.get_product(id).await?.version())?;

        let key = format!("products/{id}.{ext}");
        let stored = self.store.put(&key, content_type, bytes).await?;

        let _stock = self.stock_lock.lock().await;
        let mut product = self.get_product(id).await?;
        expected.check(product.version())?;
        product.attach_image(stored.url.clone(), Utc::now());
        let product = update(self.repos.products.as_ref(), product).await?;
        info!(product_id = %id, key = %stored.key, size = stored.size, "product image stored");
        Ok(product)
    }

    async fn ensure_supplier(&self, supplier_id: Option<SupplierId>) -> ServiceResult<()> {
        if let Some(supplier_id) = supplier_id {
            self.get_supplier(supplier_id).await?;
        }
        Ok(())
    }

    async fn ensure_unique_sku(&self, product: &Product) -> ServiceResult<()> {
        let clash = self
            .repos
            .products
            .find_by_field("sku", &json!(product.sku()))
            .await?
            .into_iter()
            .any(|other| other.id() != product.id());
        if clash {
            return Err(DomainError::conflict(format!("sku '{}' is already in use", product.sku())).into());
        }
        Ok(())
    }
}
