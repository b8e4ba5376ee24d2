use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stockroom_core::error::optional_text;
use stockroom_core::money::{self, ensure_amount};
use stockroom_core::{
    DomainError, DomainResult, Entity, Money, ProductId, PurchaseOrderId, SupplierId, Timestamps,
};

/// Purchase order status lifecycle.
///
/// `Pending` → `InStock` (goods received) or `Pending` → `Cancelled`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PurchaseOrderStatus {
    Pending,
    InStock,
    Cancelled,
}

impl core::fmt::Display for PurchaseOrderStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(match self {
            PurchaseOrderStatus::Pending => "PENDING",
            PurchaseOrderStatus::InStock => "IN_STOCK",
            PurchaseOrderStatus::Cancelled => "CANCELLED",
        })
    }
}

impl core::str::FromStr for PurchaseOrderStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().replace('-', "_").as_str() {
            "PENDING" => Ok(Self::Pending),
            "IN_STOCK" | "INSTOCK" => Ok(Self::InStock),
            "CANCELLED" | "CANCELED" => Ok(Self::Cancelled),
            other => Err(DomainError::validation(format!(
                "unknown purchase order status: {other}"
            ))),
        }
    }
}

/// Purchase order line item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchaseLine {
    pub product_id: ProductId,
    pub quantity: u32,
    pub unit_cost: Money,
}

impl PurchaseLine {
    /// Lines accepted by [`PurchaseOrder::create`] always fit; anything else saturates.
    pub fn total(&self) -> Money {
        money::line_total(self.quantity, self.unit_cost).unwrap_or(Money::MAX)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewPurchaseLine {
    pub product_id: ProductId,
    pub quantity: u32,
    pub unit_cost: Money,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewPurchaseOrder {
    pub supplier_id: SupplierId,
    pub lines: Vec<NewPurchaseLine>,
    pub note: Option<String>,
}

/// A purchase order: stock acquisition from a supplier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PurchaseOrder {
    id: PurchaseOrderId,
    supplier_id: SupplierId,
    lines: Vec<PurchaseLine>,
    status: PurchaseOrderStatus,
    note: Option<String>,
    ordered_at: DateTime<Utc>,
    received_at: Option<DateTime<Utc>>,
    cancelled_at: Option<DateTime<Utc>>,
    version: u64,
    timestamps: Timestamps,
}

impl PurchaseOrder {
    /// Create a pending order. Lines for the same product at the same unit cost
    /// are merged; the same product at a different cost keeps its own line.
    pub fn create(input: NewPurchaseOrder, now: DateTime<Utc>) -> DomainResult<Self> {
        if input.lines.is_empty() {
            return Err(DomainError::validation("purchase order needs at least one line"));
        }

        let mut lines: Vec<PurchaseLine> = Vec::with_capacity(input.lines.len());
        for line in input.lines {
            if line.quantity == 0 {
                return Err(DomainError::validation("line quantity must be positive"));
            }
            let unit_cost = ensure_amount("unit_cost", line.unit_cost)?;

            match lines
                .iter_mut()
                .find(|l| l.product_id == line.product_id && l.unit_cost == unit_cost)
            {
                Some(existing) => {
                    existing.quantity = existing
                        .quantity
                        .checked_add(line.quantity)
                        .ok_or_else(|| DomainError::validation("line quantity overflow"))?;
                }
                None => lines.push(PurchaseLine {
                    product_id: line.product_id,
                    quantity: line.quantity,
                    unit_cost,
                }),
            }
        }

        let totals = lines
            .iter()
            .map(|l| money::line_total(l.quantity, l.unit_cost))
            .collect::<DomainResult<Vec<_>>>()?;
        money::checked_sum(totals)?;

        Ok(Self {
            id: PurchaseOrderId::new(),
            supplier_id: input.supplier_id,
            lines,
            status: PurchaseOrderStatus::Pending,
            note: optional_text(input.note),
            ordered_at: now,
            received_at: None,
            cancelled_at: None,
            version: 0,
            timestamps: Timestamps::new(now),
        })
    }

    /// Mark the goods as received. The caller adds the line quantities to stock.
    pub fn receive(&mut self, now: DateTime<Utc>) -> DomainResult<()> {
        self.ensure_pending("receive")?;
        self.status = PurchaseOrderStatus::InStock;
        self.received_at = Some(now);
        self.timestamps.touch(now);
        Ok(())
    }

    pub fn cancel(&mut self, now: DateTime<Utc>) -> DomainResult<()> {
        self.ensure_pending("cancel")?;
        self.status = PurchaseOrderStatus::Cancelled;
        self.cancelled_at = Some(now);
        self.timestamps.touch(now);
        Ok(())
    }

    fn ensure_pending(&self, action: &str) -> DomainResult<()> {
        if self.status != PurchaseOrderStatus::Pending {
            return Err(DomainError::invariant(format!(
                "cannot {action} a purchase order in status {}",
                self.status
            )));
        }
        Ok(())
    }

    pub fn total(&self) -> Money {
        money::checked_sum(self.lines.iter().map(PurchaseLine::total)).unwrap_or(Money::MAX)
    }

    pub fn references_product(&self, product_id: ProductId) -> bool {
        self.lines.iter().any(|l| l.product_id == product_id)
    }

    pub fn supplier_id(&self) -> SupplierId {
        self.supplier_id
    }

    pub fn lines(&self) -> &[PurchaseLine] {
        &self.lines
    }

    pub fn status(&self) -> PurchaseOrderStatus {
        self.status
    }

    pub fn note(&self) -> Option<&str> {
        self.note.as_deref()
    }

    pub fn ordered_at(&self) -> DateTime<Utc> {
        self.ordered_at
    }

    pub fn received_at(&self) -> Option<DateTime<Utc>> {
        self.received_at
    }

    pub fn cancelled_at(&self) -> Option<DateTime<Utc>> {
        self.cancelled_at
    }
}

impl Entity for PurchaseOrder {
    type Id = PurchaseOrderId;
    const TABLE: &'static str = "purchase_orders";
    const KIND: &'static str = "purchase order";

    fn id(&self) -> PurchaseOrderId {
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
