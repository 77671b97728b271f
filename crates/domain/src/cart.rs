//! Per-user shopping cart.

use chrono::{DateTime, Utc};
use common::{ItemId, UserId};
use serde::{Deserialize, Serialize};

use crate::catalog::CatalogItem;
use crate::error::DomainError;
use crate::value_objects::Money;

/// One item in a cart, priced at the moment it was first added.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLine {
    pub item_id: ItemId,
    pub quantity: u32,
    pub price: Money,
}

impl CartLine {
    /// Returns `price * quantity`.
    pub fn line_total(&self) -> Money {
        self.price.multiply(self.quantity)
    }
}

/// A user's cart.
///
/// The total is derived: every mutation recomputes it from the lines, so a
/// persisted cart always carries a total consistent with its lines.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Cart {
    user_id: UserId,
    lines: Vec<CartLine>,
    total: Money,
    updated_at: DateTime<Utc>,
}

impl Cart {
    /// Creates an empty cart for a user.
    pub fn new(user_id: UserId, now: DateTime<Utc>) -> Self {
        Self {
            user_id,
            lines: Vec::new(),
            total: Money::zero(),
            updated_at: now,
        }
    }

    /// Rebuilds a persisted cart. The stored total is ignored and recomputed.
    pub fn restore(user_id: UserId, lines: Vec<CartLine>, updated_at: DateTime<Utc>) -> Self {
        let mut cart = Self {
            user_id,
            lines,
            total: Money::zero(),
            updated_at,
        };
        cart.recalculate();
        cart
    }

    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    pub fn total(&self) -> Money {
        self.total
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Returns the line for an item, if present.
    pub fn line(&self, item_id: ItemId) -> Option<&CartLine> {
        self.lines.iter().find(|line| line.item_id == item_id)
    }

    /// Adds `quantity` units of an item.
    ///
    /// An existing line is merged; the merged quantity must still fit the
    /// item's stock. A new line snapshots the item's current price, and an
    /// existing line keeps the price it was added at.
    pub fn add_line(
        &mut self,
        item: &CatalogItem,
        quantity: u32,
        now: DateTime<Utc>,
    ) -> Result<(), DomainError> {
        if quantity == 0 {
            return Err(DomainError::validation("quantity", "must be at least 1"));
        }

        let existing = self.lines.iter().position(|line| line.item_id == item.id);
        let merged = existing
            .and_then(|idx| self.lines.get(idx))
            .map_or(quantity, |line| line.quantity.saturating_add(quantity));
        item.ensure_available(merged)?;
        let price = existing
            .and_then(|idx| self.lines.get(idx))
            .map_or(item.unit_price, |line| line.price);
        self.total_with(item.id, merged, price)?;

        if let Some(line) = existing.and_then(|idx| self.lines.get_mut(idx)) {
            line.quantity = merged;
        } else {
            self.lines.push(CartLine {
                item_id: item.id,
                quantity,
                price: item.unit_price,
            });
        }

        self.touch(now);
        Ok(())
    }

    /// Overwrites the quantity of an existing line after re-checking stock.
    pub fn set_line_quantity(
        &mut self,
        item: &CatalogItem,
        quantity: u32,
        now: DateTime<Utc>,
    ) -> Result<(), DomainError> {
        if quantity == 0 {
            self.remove_line(item.id, now);
            return Ok(());
        }

        if self.line(item.id).is_none() {
            return Err(DomainError::LineNotFound { item_id: item.id });
        }
        item.ensure_available(quantity)?;
        if let Some(price) = self.line(item.id).map(|line| line.price) {
            self.total_with(item.id, quantity, price)?;
        }

        if let Some(line) = self.lines.iter_mut().find(|line| line.item_id == item.id) {
            line.quantity = quantity;
        }
        self.touch(now);
        Ok(())
    }

    /// Removes the line for an item. Returns false if there was none.
    pub fn remove_line(&mut self, item_id: ItemId, now: DateTime<Utc>) -> bool {
        let before = self.lines.len();
        self.lines.retain(|line| line.item_id != item_id);
        let removed = self.lines.len() != before;
        self.touch(now);
        removed
    }

    /// Empties the cart.
    pub fn clear(&mut self, now: DateTime<Utc>) {
        self.lines.clear();
        self.touch(now);
    }

    fn touch(&mut self, now: DateTime<Utc>) {
        self.updated_at = now;
        self.recalculate();
    }

    /// The total the cart would have with `item_id` at `quantity` units.
    ///
    /// Fails instead of overflowing.
    fn total_with(&self, item_id: ItemId, quantity: u32, price: Money) -> Result<Money, DomainError> {
        let others = self
            .lines
            .iter()
            .filter(|line| line.item_id != item_id)
            .map(|line| line.price.checked_multiply(line.quantity));
        std::iter::once(price.checked_multiply(quantity))
            .chain(others)
            .try_fold(Money::zero(), |acc, amount| amount.and_then(|a| acc.checked_add(a)))
            .ok_or_else(|| DomainError::validation("quantity", "cart total is too large"))
    }

    fn recalculate(&mut self) {
        self.total = self.lines.iter().map(CartLine::line_total).sum();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::tests::item;

    fn assert_total_consistent(cart: &Cart) {
        let expected: i64 = cart
            .lines()
            .iter()
            .map(|l| l.price.cents() * i64::from(l.quantity))
            .sum();
        assert_eq!(cart.total().cents(), expected);
    }

    #[test]
    fn test_new_cart_is_empty() {
        let cart = Cart::new(UserId::new(), Utc::now());
        assert!(cart.is_empty());
        assert_eq!(cart.total(), Money::zero());
    }

    #[test]
    fn test_add_line_snapshots_price() {
        let mut chair = item("Chair", 10, 2500);
        let mut cart = Cart::new(UserId::new(), Utc::now());

        cart.add_line(&chair, 2, Utc::now()).unwrap();
        chair.unit_price = Money::from_cents(9999);
        cart.add_line(&chair, 1, Utc::now()).unwrap();

        let line = cart.line(chair.id).unwrap();
        assert_eq!(line.quantity, 3);
        assert_eq!(line.price.cents(), 2500);
        assert_eq!(cart.total().cents(), 7500);
    }

    #[test]
    fn test_add_line_rejects_total_overflow() {
        let mut ring = item("Ring", 10, 0);
        ring.unit_price = Money::from_cents(i64::MAX / 2 + 1);
        let mut cart = Cart::new(UserId::new(), Utc::now());

        let err = cart.add_line(&ring, 2, Utc::now()).unwrap_err();
        assert!(matches!(err, DomainError::Validation { field: "quantity", .. }));
        assert!(cart.is_empty());
        assert_eq!(cart.total(), Money::zero());
    }

    #[test]
    fn test_add_line_rejects_zero_quantity() {
        let chair = item("Chair", 10, 2500);
        let mut cart = Cart::new(UserId::new(), Utc::now());

        let err = cart.add_line(&chair, 0, Utc::now()).unwrap_err();
        assert!(matches!(err, DomainError::Validation { field: "quantity", .. }));
    }

    #[test]
    fn test_merge_beyond_stock_is_rejected_and_line_unchanged() {
        let x = item("X", 5, 1000);
        let mut cart = Cart::new(UserId::new(), Utc::now());

        cart.add_line(&x, 3, Utc::now()).unwrap();
        let err = cart.add_line(&x, 3, Utc::now()).unwrap_err();

        assert!(matches!(
            err,
            DomainError::InsufficientStock {
                available: 5,
                requested: 6,
                ..
            }
        ));
        assert_eq!(cart.line(x.id).unwrap().quantity, 3);
        assert_total_consistent(&cart);
    }

    #[test]
    fn test_set_line_quantity() {
        let table = item("Table", 4, 12000);
        let mut cart = Cart::new(UserId::new(), Utc::now());
        cart.add_line(&table, 1, Utc::now()).unwrap();

        cart.set_line_quantity(&table, 4, Utc::now()).unwrap();
        assert_eq!(cart.total().cents(), 48000);

        let err = cart.set_line_quantity(&table, 5, Utc::now()).unwrap_err();
        assert!(matches!(err, DomainError::InsufficientStock { .. }));
        assert_eq!(cart.line(table.id).unwrap().quantity, 4);
    }

    #[test]
    fn test_set_line_quantity_requires_existing_line() {
        let table = item("Table", 4, 12000);
        let mut cart = Cart::new(UserId::new(), Utc::now());

        let err = cart.set_line_quantity(&table, 1, Utc::now()).unwrap_err();
        assert_eq!(err, DomainError::LineNotFound { item_id: table.id });
    }

    #[test]
    fn test_remove_and_clear_recompute_total() {
        let a = item("A", 10, 100);
        let b = item("B", 10, 250);
        let mut cart = Cart::new(UserId::new(), Utc::now());
        cart.add_line(&a, 2, Utc::now()).unwrap();
        cart.add_line(&b, 2, Utc::now()).unwrap();
        assert_eq!(cart.total().cents(), 700);

        assert!(cart.remove_line(a.id, Utc::now()));
        assert!(!cart.remove_line(a.id, Utc::now()));
        assert_eq!(cart.total().cents(), 500);

        cart.clear(Utc::now());
        assert!(cart.is_empty());
        assert_eq!(cart.total(), Money::zero());
    }

    #[test]
    fn test_restore_recomputes_total() {
        let lines = vec![
            CartLine {
                item_id: ItemId::new(),
                quantity: 2,
                price: Money::from_cents(300),
            },
            CartLine {
                item_id: ItemId::new(),
                quantity: 1,
                price: Money::from_cents(50),
            },
        ];
        let cart = Cart::restore(UserId::new(), lines, Utc::now());
        assert_eq!(cart.total().cents(), 650);
    }
}
