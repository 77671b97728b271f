use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{ItemId, OrderId, UserId};
use domain::{Cart, CatalogItem, Order, OrderStatus};

use crate::{OrderQuery, Result};

/// Core trait for marketplace storage.
///
/// All implementations must be thread-safe (Send + Sync) and must make
/// [`place_order`](ShopStore::place_order) and
/// [`cancel_order`](ShopStore::cancel_order) atomic: either every write of
/// the unit is applied or none is.
#[async_trait]
pub trait ShopStore: Send + Sync {
    /// Inserts a new catalog item.
    ///
    /// Fails with `DuplicateItemNo` if the item number is taken.
    async fn insert_item(&self, item: &CatalogItem) -> Result<()>;

    /// Replaces a catalog item's attributes.
    async fn update_item(&self, item: &CatalogItem) -> Result<()>;

    /// Removes a catalog item. Orders keep their line snapshots.
    async fn delete_item(&self, item_id: ItemId) -> Result<()>;

    /// Retrieves a catalog item.
    async fn get_item(&self, item_id: ItemId) -> Result<Option<CatalogItem>>;

    /// Retrieves all catalog items ordered by item number.
    async fn list_items(&self) -> Result<Vec<CatalogItem>>;

    /// Takes `quantity` units off the shelf if at least that many are on hand.
    ///
    /// The check and the write are one compare-and-swap. On
    /// `InsufficientStock` nothing is written. Returns the remaining quantity.
    async fn decrement_quantity(&self, item_id: ItemId, quantity: u32) -> Result<u32>;

    /// Puts `quantity` units back on the shelf. Returns the new quantity.
    async fn increment_quantity(&self, item_id: ItemId, quantity: u32) -> Result<u32>;

    /// Retrieves a user's cart.
    async fn get_cart(&self, user_id: UserId) -> Result<Option<Cart>>;

    /// Inserts or replaces a user's cart, including its derived total.
    async fn save_cart(&self, cart: &Cart) -> Result<()>;

    /// Retrieves an order, soft-deleted or not.
    async fn get_order(&self, order_id: OrderId) -> Result<Option<Order>>;

    /// Retrieves orders matching a query, newest first.
    async fn query_orders(&self, query: &OrderQuery) -> Result<Vec<Order>>;

    /// Sets an order's soft-delete flag and update time.
    ///
    /// Status, lines and bill are left as stored.
    async fn mark_order_deleted(&self, order_id: OrderId, at: DateTime<Utc>) -> Result<()>;

    /// Writes an operator-forced status and update time.
    ///
    /// The stored status must still be `expected`; otherwise the write fails
    /// with `StatusConflict` and nothing changes. No stock moves.
    async fn force_order_status(&self, order: &Order, expected: OrderStatus) -> Result<()>;

    /// Reserves stock and records a new order as one atomic unit.
    ///
    /// For each line the stock is decremented with a conditional write. If
    /// any line is short, or the order number is taken, everything is rolled
    /// back. When `clear_cart_of` is set, that user's cart is emptied in the
    /// same unit.
    async fn place_order(&self, order: &Order, clear_cart_of: Option<UserId>) -> Result<()>;

    /// Records a cancellation and restocks every line as one atomic unit.
    ///
    /// The stored status must still be `expected`; otherwise the unit fails
    /// with `StatusConflict` and no stock moves. This makes the restock
    /// happen at most once per order.
    async fn cancel_order(&self, order: &Order, expected: OrderStatus) -> Result<()>;
}
