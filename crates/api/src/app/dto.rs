use serde::Deserialize;
use serde_json::{json, Value};

use stockroom_auth::{Role, TokenPair, User, UserPatch};
use stockroom_core::{CustomerId, Entity, ExpectedVersion, Money, ProductId};
use stockroom_parties::{Customer, CustomerPatch, Supplier, SupplierPatch};
use stockroom_products::{Product, ProductPatch};
use stockroom_purchasing::PurchaseOrder;
use stockroom_sales::Sale;

use crate::app::services::{CreateUser, SaleInput, SaleLineInput};

// -------------------------
// Request DTOs
// -------------------------

/// Body of action routes (`/receive`, `/confirm`, ...). The whole body is optional.
#[derive(Debug, Default, Deserialize)]
pub struct VersionRequest {
    pub expected_version: Option<u64>,
}

impl VersionRequest {
    pub fn expected(&self) -> ExpectedVersion {
        ExpectedVersion::from_option(self.expected_version)
    }
}

#[derive(Debug, Deserialize)]
pub struct UpdateCustomerRequest {
    #[serde(flatten)]
    pub patch: CustomerPatch,
    pub expected_version: Option<u64>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateSupplierRequest {
    #[serde(flatten)]
    pub patch: SupplierPatch,
    pub expected_version: Option<u64>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateProductRequest {
    #[serde(flatten)]
    pub patch: ProductPatch,
    pub expected_version: Option<u64>,
}

#[derive(Debug, Deserialize)]
pub struct SaleLineRequest {
    pub product_id: ProductId,
    pub quantity: u32,
    /// Catalogue price when absent.
    pub unit_price: Option<Money>,
}

#[derive(Debug, Deserialize)]
pub struct CreateSaleRequest {
    pub customer_id: CustomerId,
    pub lines: Vec<SaleLineRequest>,
    #[serde(default)]
    pub discount: Money,
}

impl From<CreateSaleRequest> for SaleInput {
    fn from(req: CreateSaleRequest) -> Self {
        SaleInput {
            customer_id: req.customer_id,
            lines: req
                .lines
                .into_iter()
                .map(|l| SaleLineInput {
                    product_id: l.product_id,
                    quantity: l.quantity,
                    unit_price: l.unit_price,
                })
                .collect(),
            discount: req.discount,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

#[derive(Debug, Deserialize)]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    pub username: String,
    pub email: String,
    pub display_name: String,
    pub password: String,
    #[serde(default)]
    pub roles: Vec<Role>,
}

impl From<CreateUserRequest> for CreateUser {
    fn from(req: CreateUserRequest) -> Self {
        CreateUser {
            username: req.username,
            email: req.email,
            display_name: req.display_name,
            password: req.password,
            roles: req.roles,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct UpdateUserRequest {
    #[serde(flatten)]
    pub patch: UserPatch,
    pub expected_version: Option<u64>,
}

#[derive(Debug, Deserialize)]
pub struct AssignRoleRequest {
    pub role: String,
    pub expected_version: Option<u64>,
}

// -------------------------
// Query strings
// -------------------------

#[derive(Debug, Default, Deserialize)]
pub struct ProductQuery {
    pub low_stock: Option<bool>,
    pub category: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct StatusQuery {
    pub status: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct YearQuery {
    pub year: Option<i32>,
}

#[derive(Debug, Default, Deserialize)]
pub struct TopProductsQuery {
    pub year: Option<i32>,
    pub month: Option<u32>,
    pub limit: Option<usize>,
}

// -------------------------
// JSON mapping helpers
// -------------------------

pub fn customer_to_json(c: &Customer) -> Value {
    json!({
        "id": c.id().to_string(),
        "name": c.name(),
        "email": c.contact().email,
        "phone": c.contact().phone,
        "address": c.contact().address,
        "version": c.version(),
        "created_at": c.timestamps().created_at,
        "updated_at": c.timestamps().updated_at,
    })
}

pub fn supplier_to_json(s: &Supplier) -> Value {
    json!({
        "id": s.id().to_string(),
        "name": s.name(),
        "contact_person": s.contact_person(),
        "email": s.contact().email,
        "phone": s.contact().phone,
        "address": s.contact().address,
        "version": s.version(),
        "created_at": s.timestamps().created_at,
        "updated_at": s.timestamps().updated_at,
    })
}

pub fn product_to_json(p: &Product) -> Value {
    json!({
        "id": p.id().to_string(),
        "sku": p.sku(),
        "name": p.name(),
        "description": p.description(),
        "category": p.category(),
        "unit_price": p.unit_price(),
        "cost_price": p.cost_price(),
        "quantity_in_stock": p.quantity_in_stock(),
        "reorder_level": p.reorder_level(),
        "needs_reorder": p.needs_reorder(),
        "supplier_id": p.supplier_id().map(|id| id.to_string()),
        "image_url": p.image_url(),
        "status": p.status(),
        "version": p.version(),
        "created_at": p.timestamps().created_at,
        "updated_at": p.timestamps().updated_at,
    })
}

pub fn purchase_order_to_json(po: &PurchaseOrder) -> Value {
    json!({
        "id": po.id().to_string(),
        "supplier_id": po.supplier_id().to_string(),
        "status": po.status(),
        "note": po.note(),
        "lines": po.lines().iter().map(|l| json!({
            "product_id": l.product_id.to_string(),
            "quantity": l.quantity,
            "unit_cost": l.unit_cost,
            "total": l.total(),
        })).collect::<Vec<_>>(),
        "total": po.total(),
        "ordered_at": po.ordered_at(),
        "received_at": po.received_at(),
        "cancelled_at": po.cancelled_at(),
        "version": po.version(),
    })
}

pub fn sale_to_json(s: &Sale) -> Value {
    json!({
        "id": s.id().to_string(),
        "customer_id": s.customer_id().to_string(),
        "status": s.status(),
        "lines": s.lines().iter().map(|l| json!({
            "product_id": l.product_id.to_string(),
            "quantity": l.quantity,
            "unit_price": l.unit_price,
            "total": l.total(),
        })).collect::<Vec<_>>(),
        "subtotal": s.subtotal(),
        "discount": s.discount(),
        "total": s.total(),
        "sold_at": s.sold_at(),
        "confirmed_at": s.confirmed_at(),
        "cancelled_at": s.cancelled_at(),
        "version": s.version(),
    })
}

/// Never includes the password hash.
pub fn user_to_json(u: &User) -> Value {
    json!({
        "id": u.id().to_string(),
        "username": u.username(),
        "email": u.email(),
        "display_name": u.display_name(),
        "roles": u.roles(),
        "status": u.status(),
        "last_login_at": u.last_login_at(),
        "version": u.version(),
        "created_at": u.timestamps().created_at,
        "updated_at": u.timestamps().updated_at,
    })
}

pub fn token_pair_to_json(pair: &TokenPair) -> Value {
    json!({
        "access_token": pair.access_token,
        "refresh_token": pair.refresh_token,
        "token_type": pair.token_type,
        "expires_in": pair.expires_in,
    })
}

/// `{"items": [...]}` list envelope.
pub fn items<T>(records: &[T], to_json: fn(&T) -> Value) -> Value {
    json!({ "items": records.iter().map(to_json).collect::<Vec<_>>() })
}
