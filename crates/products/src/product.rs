use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use stockroom_core::error::{optional_text, required_text};
use stockroom_core::money::{self, ensure_amount};
use stockroom_core::{DomainError, DomainResult, Entity, Money, ProductId, SupplierId, Timestamps};

/// Upper bound for stock and reorder levels: one `u32` line quantity.
pub const MAX_STOCK: i64 = u32::MAX as i64;

/// Product status lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProductStatus {
    #[default]
    Active,
    Archived,
}

/// Catalogue product with its stock level.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    id: ProductId,
    sku: String,
    name: String,
    description: Option<String>,
    category: Option<String>,
    unit_price: Money,
    cost_price: Money,
    quantity_in_stock: i64,
    reorder_level: i64,
    supplier_id: Option<SupplierId>,
    image_url: Option<String>,
    status: ProductStatus,
    version: u64,
    timestamps: Timestamps,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewProduct {
    pub sku: String,
    pub name: String,
    pub description: Option<String>,
    pub category: Option<String>,
    pub unit_price: Money,
    #[serde(default)]
    pub cost_price: Money,
    #[serde(default)]
    pub quantity_in_stock: i64,
    #[serde(default)]
    pub reorder_level: i64,
    pub supplier_id: Option<SupplierId>,
}

/// Partial update. Stock is deliberately absent: it moves through orders.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProductPatch {
    pub sku: Option<String>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub unit_price: Option<Money>,
    pub cost_price: Option<Money>,
    pub reorder_level: Option<i64>,
    pub supplier_id: Option<SupplierId>,
    pub status: Option<ProductStatus>,
}

fn normalize_sku(raw: &str) -> DomainResult<String> {
    let sku = required_text("sku", raw, 64)?.to_uppercase();
    if sku.chars().any(char::is_whitespace) {
        return Err(DomainError::validation("sku cannot contain whitespace"));
    }
    Ok(sku)
}

fn ensure_count(field: &str, value: i64) -> DomainResult<i64> {
    if value < 0 {
        return Err(DomainError::validation(format!("{field} cannot be negative")));
    }
    if value > MAX_STOCK {
        return Err(DomainError::validation(format!("{field} cannot exceed {MAX_STOCK}")));
    }
    Ok(value)
}

impl Product {
    pub fn create(input: NewProduct, now: DateTime<Utc>) -> DomainResult<Self> {
        Ok(Self {
            id: ProductId::new(),
            sku: normalize_sku(&input.sku)?,
            name: required_text("name", &input.name, 200)?,
            description: optional_text(input.description),
            category: optional_text(input.category),
            unit_price: ensure_amount("unit_price", input.unit_price)?,
            cost_price: ensure_amount("cost_price", input.cost_price)?,
            quantity_in_stock: ensure_count("quantity_in_stock", input.quantity_in_stock)?,
            reorder_level: ensure_count("reorder_level", input.reorder_level)?,
            supplier_id: input.supplier_id,
            image_url: None,
            status: ProductStatus::Active,
            version: 0,
            timestamps: Timestamps::new(now),
        })
    }

    /// Apply a partial update atomically: either every field changes or none.
    pub fn update(&mut self, patch: ProductPatch, now: DateTime<Utc>) -> DomainResult<()> {
        let mut next = self.clone();
        if let Some(sku) = patch.sku {
            next.sku = normalize_sku(&sku)?;
        }
        if let Some(name) = patch.name {
            next.name = required_text("name", &name, 200)?;
        }
        if patch.description.is_some() {
            next.description = optional_text(patch.description);
        }
        if patch.category.is_some() {
            next.category = optional_text(patch.category);
        }
        if let Some(price) = patch.unit_price {
            next.unit_price = ensure_amount("unit_price", price)?;
        }
        if let Some(price) = patch.cost_price {
            next.cost_price = ensure_amount("cost_price", price)?;
        }
        if let Some(level) = patch.reorder_level {
            next.reorder_level = ensure_count("reorder_level", level)?;
        }
        if patch.supplier_id.is_some() {
            next.supplier_id = patch.supplier_id;
        }
        if let Some(status) = patch.status {
            next.status = status;
        }
        next.timestamps.touch(now);
        *self = next;
        Ok(())
    }

    /// Add received units to stock, up to [`MAX_STOCK`].
    pub fn receive_stock(&mut self, quantity: u32, now: DateTime<Utc>) -> DomainResult<()> {
        if quantity == 0 {
            return Err(DomainError::validation("quantity must be positive"));
        }
        let next = self
            .quantity_in_stock
            .checked_add(i64::from(quantity))
            .filter(|n| *n <= MAX_STOCK)
            .ok_or_else(|| {
                DomainError::invariant(format!(
                    "receiving {quantity} units of {} would exceed the stock limit of {MAX_STOCK}",
                    self.sku
                ))
            })?;
        self.quantity_in_stock = next;
        self.timestamps.touch(now);
        Ok(())
    }

    /// Remove sold units from stock; stock never goes negative.
    pub fn withdraw_stock(&mut self, quantity: u32, now: DateTime<Utc>) -> DomainResult<()> {
        if quantity == 0 {
            return Err(DomainError::validation("quantity must be positive"));
        }
        let quantity = i64::from(quantity);
        if quantity > self.quantity_in_stock {
            return Err(DomainError::invariant(format!(
                "insufficient stock for {}: requested {}, available {}",
                self.sku, quantity, self.quantity_in_stock
            )));
        }
        self.quantity_in_stock -= quantity;
        self.timestamps.touch(now);
        Ok(())
    }

    pub fn attach_image(&mut self, url: impl Into<String>, now: DateTime<Utc>) {
        self.image_url = Some(url.into());
        self.timestamps.touch(now);
    }

    pub fn needs_reorder(&self) -> bool {
        self.quantity_in_stock <= self.reorder_level
    }

    /// Only active products can appear on new sales.
    pub fn can_be_sold(&self) -> bool {
        self.status == ProductStatus::Active
    }

    /// Value of the units on hand at cost.
    pub fn stock_value(&self) -> DomainResult<Money> {
        Decimal::from(self.quantity_in_stock)
            .checked_mul(self.cost_price)
            .map(money::round)
            .ok_or_else(|| DomainError::validation(format!("stock value of {} is out of range", self.sku)))
    }

    pub fn sku(&self) -> &str {
        &self.sku
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn category(&self) -> Option<&str> {
        self.category.as_deref()
    }

    pub fn unit_price(&self) -> Money {
        self.unit_price
    }

    pub fn cost_price(&self) -> Money {
        self.cost_price
    }

    pub fn quantity_in_stock(&self) -> i64 {
        self.quantity_in_stock
    }

    pub fn reorder_level(&self) -> i64 {
        self.reorder_level
    }

    pub fn supplier_id(&self) -> Option<SupplierId> {
        self.supplier_id
    }

    pub fn image_url(&self) -> Option<&str> {
        self.image_url.as_deref()
    }

    pub fn status(&self) -> ProductStatus {
        self.status
    }
}

impl Entity for Product {
    type Id = ProductId;
    const TABLE: &'static str = "products";
    const KIND: &'static str = "product";

    fn id(&self) -> ProductId {
        self.id
    }

    fn version(&self) -> u64 {
        self.version
    }

    fn set_version(&mut self, version: u64) {
        self.version = version;
    }

    fn timestamps(&self) -> &Timestamps {
        &self.timestamps
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    fn widget() -> Product {
        Product::create(
            NewProduct {
                sku: " wid-001 ".into(),
                name: "Widget".into(),
                unit_price: dec("12.50"),
                cost_price: dec("7.25"),
                quantity_in_stock: 10,
                reorder_level: 3,
                ..Default::default()
            },
            Utc::now(),
        )
        .unwrap()
    }

    #[test]
    fn create_normalizes_sku() {
        let p = widget();
        assert_eq!(p.sku(), "WID-001");
        assert_eq!(p.status(), ProductStatus::Active);
        assert!(p.can_be_sold());
    }

    #[test]
    fn create_rejects_negative_price_and_stock() {
        let bad_price = Product::create(
            NewProduct {
                sku: "A".into(),
                name: "A".into(),
                unit_price: dec("-1"),
                ..Default::default()
            },
            Utc::now(),
        );
        assert!(matches!(bad_price, Err(DomainError::Validation(_))));

        let bad_stock = Product::create(
            NewProduct {
                sku: "A".into(),
                name: "A".into(),
                quantity_in_stock: -5,
                ..Default::default()
            },
            Utc::now(),
        );
        assert!(bad_stock.is_err());
    }

    #[test]
    fn withdraw_beyond_stock_is_an_invariant_violation() {
        let mut p = widget();
        let err = p.withdraw_stock(11, Utc::now()).unwrap_err();
        assert!(matches!(err, DomainError::InvariantViolation(_)));
        assert_eq!(p.quantity_in_stock(), 10);

        p.withdraw_stock(10, Utc::now()).unwrap();
        assert_eq!(p.quantity_in_stock(), 0);
        assert!(p.needs_reorder());
    }

    #[test]
    fn zero_quantity_moves_are_rejected() {
        let mut p = widget();
        assert!(p.receive_stock(0, Utc::now()).is_err());
        assert!(p.withdraw_stock(0, Utc::now()).is_err());
    }

    #[test]
    fn update_is_all_or_nothing() {
        let mut p = widget();
        let before = p.clone();
        let res = p.update(
            ProductPatch {
                name: Some("Renamed".into()),
                cost_price: Some(dec("-3")),
                ..Default::default()
            },
            Utc::now(),
        );
        assert!(res.is_err());
        assert_eq!(p, before);
    }

    #[test]
    fn archive_blocks_selling() {
        let mut p = widget();
        p.update(
            ProductPatch { status: Some(ProductStatus::Archived), ..Default::default() },
            Utc::now(),
        )
        .unwrap();
        assert!(!p.can_be_sold());
    }

    #[test]
    fn stock_value_uses_cost_price() {
        assert_eq!(widget().stock_value().unwrap(), dec("72.50"));
    }

    #[test]
    fn create_rejects_amounts_and_stock_beyond_the_limits() {
        let too_much_stock = Product::create(
            NewProduct {
                sku: "HUGE".into(),
                name: "Huge".into(),
                quantity_in_stock: i64::MAX,
                ..Default::default()
            },
            Utc::now(),
        );
        assert!(matches!(too_much_stock, Err(DomainError::Validation(_))));

        let too_dear = Product::create(
            NewProduct {
                sku: "DEAR".into(),
                name: "Dear".into(),
                unit_price: dec("100000000000000000000"),
                ..Default::default()
            },
            Utc::now(),
        );
        assert!(matches!(too_dear, Err(DomainError::Validation(_))));
    }

    #[test]
    fn receiving_past_the_stock_limit_changes_nothing() {
        let mut p = widget();
        p.receive_stock(u32::MAX - 10, Utc::now()).unwrap();
        assert_eq!(p.quantity_in_stock(), MAX_STOCK);

        let err = p.receive_stock(1, Utc::now()).unwrap_err();
        assert!(matches!(err, DomainError::InvariantViolation(_)));
        assert_eq!(p.quantity_in_stock(), MAX_STOCK);
    }

    #[test]
    fn stock_value_at_the_limits_is_computed() {
        let p = Product::create(
            NewProduct {
                sku: "MAX".into(),
                name: "Max".into(),
                cost_price: money::MAX_AMOUNT,
                quantity_in_stock: MAX_STOCK,
                ..Default::default()
            },
            Utc::now(),
        )
        .unwrap();
        assert_eq!(p.stock_value().unwrap(), Decimal::from(MAX_STOCK) * money::MAX_AMOUNT);
    }

    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        #[derive(Debug, Clone)]
        enum Move {
            Receive(u32),
            Withdraw(u32),
        }

        fn moves() -> impl Strategy<Value = Vec<Move>> {
            prop::collection::vec(
                prop_oneof![
                    (1u32..50).prop_map(Move::Receive),
                    (1u32..50).prop_map(Move::Withdraw),
                ],
                0..64,
            )
        }

        proptest! {
            /// Property: stock never goes negative and equals the net of accepted moves.
            #[test]
            fn stock_tracks_accepted_moves(ops in moves()) {
                let mut p = widget();
                let mut expected = p.quantity_in_stock();
                for op in ops {
                    match op {
                        Move::Receive(q) => {
                            p.receive_stock(q, Utc::now()).unwrap();
                            expected += i64::from(q);
                        }
                        Move::Withdraw(q) => {
                            if p.withdraw_stock(q, Utc::now()).is_ok() {
                                expected -= i64::from(q);
                            }
                        }
                    }
                    prop_assert!(p.quantity_in_stock() >= 0);
                }
                prop_assert_eq!(p.quantity_in_stock(), expected);
            }

            /// Property: any accepted product has a computable stock value.
            #[test]
            fn stock_value_never_overflows(
                stock in 0i64..=MAX_STOCK,
                cents in 0i64..=100_000_000_000_000,
                receipts in prop::collection::vec(any::<u32>(), 0..4),
            ) {
                let mut p = Product::create(
                    NewProduct {
                        sku: "BOUND".into(),
                        name: "Bound".into(),
                        cost_price: Decimal::new(cents, 2),
                        quantity_in_stock: stock,
                        ..Default::default()
                    },
                    Utc::now(),
                )
                .unwrap();
                for q in receipts {
                    let _ = p.receive_stock(q, Utc::now());
                    prop_assert!(p.quantity_in_stock() <= MAX_STOCK);
                }
                prop_assert!(p.stock_value().is_ok());
            }
        }
    }

    #[test]
    fn serde_roundtrip_keeps_status_spelling() {
        let p = widget();
        let json = serde_json::to_value(&p).unwrap();
        assert_eq!(json["status"], "ACTIVE");
        let back: Product = serde_json::from_value(json).unwrap();
        assert_eq!(back, p);
    }
}
