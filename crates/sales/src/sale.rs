use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stockroom_core::money::{self, ensure_amount};
use stockroom_core::{
    CustomerId, DomainError, DomainResult, Entity, Money, ProductId, SaleId, Timestamps,
};

/// Sale status lifecycle.
///
/// `Pending` → `Confirmed` → `Cancelled`, or `Pending` → `Cancelled`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SaleStatus {
    Pending,
    Confirmed,
    Cancelled,
}

impl core::fmt::Display for SaleStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(match self {
            SaleStatus::Pending => "PENDING",
            SaleStatus::Confirmed => "CONFIRMED",
            SaleStatus::Cancelled => "CANCELLED",
        })
    }
}

impl core::str::FromStr for SaleStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "PENDING" => Ok(Self::Pending),
            "CONFIRMED" => Ok(Self::Confirmed),
            "CANCELLED" | "CANCELED" => Ok(Self::Cancelled),
            other => Err(DomainError::validation(format!("unknown sale status: {other}"))),
        }
    }
}

/// Sale line item (price captured at the time of sale).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaleLine {
    pub product_id: ProductId,
    pub quantity: u32,
    pub unit_price: Money,
}

impl SaleLine {
    /// Lines accepted by [`Sale::create`] always fit; anything else saturates.
    pub fn total(&self) -> Money {
        money::line_total(self.quantity, self.unit_price).unwrap_or(Money::MAX)
    }
}

/// Line input with the price already resolved (the service fills in catalogue
/// prices for lines that omit one).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewSaleLine {
    pub product_id: ProductId,
    pub quantity: u32,
    pub unit_price: Money,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewSale {
    pub customer_id: CustomerId,
    pub lines: Vec<NewSaleLine>,
    pub discount: Money,
}

/// What a status change did to stock; the service applies it to products.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StockEffect {
    None,
    /// Confirmation: withdraw every line.
    Withdraw,
    /// Cancelling a confirmed sale: put every line back.
    Restock,
}

/// A sale to a customer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sale {
    id: SaleId,
    customer_id: CustomerId,
    lines: Vec<SaleLine>,
    discount: Money,
    status: SaleStatus,
    sold_at: DateTime<Utc>,
    confirmed_at: Option<DateTime<Utc>>,
    cancelled_at: Option<DateTime<Utc>>,
    version: u64,
    timestamps: Timestamps,
}

impl Sale {
    pub fn create(input: NewSale, now: DateTime<Utc>) -> DomainResult<Self> {
        if input.lines.is_empty() {
            return Err(DomainError::validation("sale needs at least one line"));
        }

        let mut lines = Vec::with_capacity(input.lines.len());
        let mut subtotal = Money::ZERO;
        for line in input.lines {
            if line.quantity == 0 {
                return Err(DomainError::validation("line quantity must be positive"));
            }
            if lines.iter().any(|l: &SaleLine| l.product_id == line.product_id) {
                return Err(DomainError::validation(format!(
                    "product {} appears on more than one line",
                    line.product_id
                )));
            }
            let unit_price = ensure_amount("unit_price", line.unit_price)?;
            subtotal = money::checked_sum([subtotal, money::line_total(line.quantity, unit_price)?])?;
            lines.push(SaleLine {
                product_id: line.product_id,
                quantity: line.quantity,
                unit_price,
            });
        }

        let discount = ensure_amount("discount", input.discount)?;
        let sale = Self {
            id: SaleId::new(),
            customer_id: input.customer_id,
            lines,
            discount,
            status: SaleStatus::Pending,
            sold_at: now,
            confirmed_at: None,
            cancelled_at: None,
            version: 0,
            timestamps: Timestamps::new(now),
        };

        if discount > subtotal {
            return Err(DomainError::validation("discount cannot exceed the subtotal"));
        }
        Ok(sale)
    }

    pub fn confirm(&mut self, now: DateTime<Utc>) -> DomainResult<StockEffect> {
        if self.status != SaleStatus::Pending {
            return Err(DomainError::invariant(format!(
                "cannot confirm a sale in status {}",
                self.status
            )));
        }
        self.status = SaleStatus::Confirmed;
        self.confirmed_at = Some(now);
        self.timestamps.touch(now);
        Ok(StockEffect::Withdraw)
    }

    pub fn cancel(&mut self, now: DateTime<Utc>) -> DomainResult<StockEffect> {
        let effect = match self.status {
            SaleStatus::Pending => StockEffect::None,
            SaleStatus::Confirmed => StockEffect::Restock,
            SaleStatus::Cancelled => {
                return Err(DomainError::invariant("sale is already cancelled"));
            }
        };
        self.status = SaleStatus::Cancelled;
        self.cancelled_at = Some(now);
        self.timestamps.touch(now);
        Ok(effect)
    }

    pub fn subtotal(&self) -> Money {
        money::checked_sum(self.lines.iter().map(SaleLine::total)).unwrap_or(Money::MAX)
    }

    pub fn total(&self) -> Money {
        self.subtotal().saturating_sub(self.discount)
    }

    /// Cost of the goods on this sale given a cost lookup; unknown products cost zero.
    pub fn cost_of_goods<F>(&self, cost_of: F) -> DomainResult<Money>
    where
        F: Fn(ProductId) -> Option<Money>,
    {
        let lines = self
            .lines
            .iter()
            .map(|l| money::line_total(l.quantity, cost_of(l.product_id).unwrap_or_default()))
            .collect::<DomainResult<Vec<_>>>()?;
        money::checked_sum(lines)
    }

    pub fn references_product(&self, product_id: ProductId) -> bool {
        self.lines.iter().any(|l| l.product_id == product_id)
    }

    pub fn customer_id(&self) -> CustomerId {
        self.customer_id
    }

    pub fn lines(&self) -> &[SaleLine] {
        &self.lines
    }

    pub fn discount(&self) -> Money {
        self.discount
    }

    pub fn status(&self) -> SaleStatus {
        self.status
    }

    pub fn sold_at(&self) -> DateTime<Utc> {
        self.sold_at
    }

    pub fn confirmed_at(&self) -> Option<DateTime<Utc>> {
        self.confirmed_at
    }

    pub fn cancelled_at(&self) -> Option<DateTime<Utc>> {
        self.cancelled_at
    }
}

impl Entity for Sale {
    type Id = SaleId;
    const TABLE: &'static str = "sales";
    const KIND: &'static str = "sale";

    fn id(&self) -> SaleId {
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
