//! Order aggregate implementation.

use chrono::{DateTime, Utc};
use common::{ItemId, OrderId, UserId};
use serde::{Deserialize, Serialize};

use crate::catalog::CatalogItem;
use crate::error::DomainError;
use crate::value_objects::{Money, PaymentMethod, ShippingAddress};

use super::{OrderNumber, OrderStatus};

/// A frozen line of an order.
///
/// Name and price are copied from the catalog when the order is placed so
/// later catalog edits never rewrite order history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderLine {
    pub item_id: ItemId,
    pub name: String,
    pub quantity: u32,
    pub unit_price: Money,
    pub subtotal: Money,
}

impl OrderLine {
    /// Snapshots `quantity` units of `item` at `unit_price`.
    ///
    /// The cart path passes the price captured when the line was added;
    /// the single-item path passes the item's current price.
    pub fn snapshot(item: &CatalogItem, quantity: u32, unit_price: Money) -> Self {
        Self {
            item_id: item.id,
            name: item.name.clone(),
            quantity,
            unit_price,
            subtotal: unit_price.multiply(quantity),
        }
    }
}

/// Everything needed to place an order.
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub user_id: UserId,
    pub lines: Vec<OrderLine>,
    pub address: ShippingAddress,
    pub payment_method: PaymentMethod,
}

/// Result of a status change.
///
/// Customer cancellation goes through the lifecycle checks and yields
/// `Checked`. The operator escape hatch skips them and yields `Forced`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// A change validated against the status machine.
    Checked { from: OrderStatus, to: OrderStatus },
    /// An operator-imposed change with no lifecycle checks.
    Forced { from: OrderStatus, to: OrderStatus },
}

impl Transition {
    pub fn from_status(&self) -> OrderStatus {
        match self {
            Transition::Checked { from, .. } | Transition::Forced { from, .. } => *from,
        }
    }

    pub fn to_status(&self) -> OrderStatus {
        match self {
            Transition::Checked { to, .. } | Transition::Forced { to, .. } => *to,
        }
    }

    /// True when the change matches a step of the lifecycle diagram.
    pub fn follows_lifecycle(&self) -> bool {
        self.from_status().permits(self.to_status())
    }
}

/// Persisted form of an order, used by stores to rehydrate it.
#[derive(Debug, Clone)]
pub struct OrderParts {
    pub id: OrderId,
    pub order_number: OrderNumber,
    pub user_id: UserId,
    pub lines: Vec<OrderLine>,
    pub total_bill: Money,
    pub address: ShippingAddress,
    pub payment_method: PaymentMethod,
    pub status: OrderStatus,
    pub is_deleted: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Order aggregate root.
///
/// Lines and the total bill are fixed at placement. Afterwards only the
/// status and the soft-delete flag change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    id: OrderId,
    order_number: OrderNumber,
    user_id: UserId,
    #[serde(rename = "items")]
    lines: Vec<OrderLine>,
    total_bill: Money,
    address: ShippingAddress,
    payment_method: PaymentMethod,
    status: OrderStatus,
    is_deleted: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Order {
    /// Places a new order at status `pending`.
    pub fn place(
        request: NewOrder,
        order_number: OrderNumber,
        now: DateTime<Utc>,
    ) -> Result<Self, DomainError> {
        if request.lines.is_empty() {
            return Err(DomainError::validation("items", "order has no items"));
        }
        if let Some(line) = request.lines.iter().find(|line| line.quantity == 0) {
            return Err(DomainError::validation(
                "quantity",
                format!("must be at least 1 for {}", line.name),
            ));
        }
        request.address.validate()?;

        let total_bill = request
            .lines
            .iter()
            .try_fold(Money::zero(), |acc, line| {
                line.unit_price
                    .checked_multiply(line.quantity)
                    .and_then(|subtotal| acc.checked_add(subtotal))
            })
            .ok_or_else(|| DomainError::validation("items", "order total is too large"))?;

        Ok(Self {
            id: OrderId::new(),
            order_number,
            user_id: request.user_id,
            lines: request.lines,
            total_bill,
            address: request.address,
            payment_method: request.payment_method,
            status: OrderStatus::Pending,
            is_deleted: false,
            created_at: now,
            updated_at: now,
        })
    }

    /// Rehydrates a persisted order without re-running placement checks.
    pub fn from_parts(parts: OrderParts) -> Self {
        Self {
            id: parts.id,
            order_number: parts.order_number,
            user_id: parts.user_id,
            lines: parts.lines,
            total_bill: parts.total_bill,
            address: parts.address,
            payment_method: parts.payment_method,
            status: parts.status,
            is_deleted: parts.is_deleted,
            created_at: parts.created_at,
            updated_at: parts.updated_at,
        }
    }

    /// Gives a fresh number to an order that has not been persisted yet.
    pub fn renumber(&mut self, order_number: OrderNumber) {
        self.order_number = order_number;
    }
}

// Query methods
impl Order {
    pub fn id(&self) -> OrderId {
        self.id
    }

    pub fn order_number(&self) -> &OrderNumber {
        &self.order_number
    }

    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    pub fn lines(&self) -> &[OrderLine] {
        &self.lines
    }

    pub fn total_bill(&self) -> Money {
        self.total_bill
    }

    pub fn address(&self) -> &ShippingAddress {
        &self.address
    }

    pub fn payment_method(&self) -> &PaymentMethod {
        &self.payment_method
    }

    pub fn status(&self) -> OrderStatus {
        self.status
    }

    pub fn is_deleted(&self) -> bool {
        self.is_deleted
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// True when `user` owns the order and it has not been soft-deleted.
    pub fn is_visible_to(&self, user: UserId) -> bool {
        self.user_id == user && !self.is_deleted
    }
}

// Command methods
impl Order {
    /// Cancels the order. Allowed only while pending or processing.
    ///
    /// The caller is responsible for restocking `lines()`; the store does
    /// that in the same atomic unit that persists the new status.
    pub fn cancel(&mut self, now: DateTime<Utc>) -> Result<Transition, DomainError> {
        if !self.status.can_cancel() {
            return Err(DomainError::InvalidTransition {
                current: self.status,
                action: "cancel",
            });
        }

        let from = self.status;
        self.status = OrderStatus::Cancelled;
        self.updated_at = now;
        Ok(Transition::Checked {
            from,
            to: OrderStatus::Cancelled,
        })
    }

    /// Sets a status without consulting the lifecycle. Operator use only.
    ///
    /// Stock is never moved by a forced transition. A cancelled order has
    /// already been restocked, so it cannot be moved to any other status.
    pub fn force_status(
        &mut self,
        target: OrderStatus,
        now: DateTime<Utc>,
    ) -> Result<Transition, DomainError> {
        if self.status == OrderStatus::Cancelled && target != OrderStatus::Cancelled {
            return Err(DomainError::InvalidTransition {
                current: self.status,
                action: "reopen",
            });
        }

        let from = self.status;
        self.status = target;
        self.updated_at = now;
        Ok(Transition::Forced { from, to: target })
    }

    /// Hides the order from its owner. There is no way back.
    pub fn soft_delete(&mut self, now: DateTime<Utc>) {
        self.is_deleted = true;
        self.updated_at = now;
    }
}
