use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{ItemId, OrderId, UserId};
use domain::{Cart, CatalogItem, Order, OrderStatus};
use tokio::sync::RwLock;

use crate::{OrderQuery, Result, ShopStore, StoreError};

#[derive(Debug, Default)]
struct ShopState {
    items: HashMap<ItemId, CatalogItem>,
    carts: HashMap<UserId, Cart>,
    orders: HashMap<OrderId, Order>,
    order_numbers: HashSet<String>,
}

impl ShopState {
    /// Computes the post-reservation quantity of every item touched by
    /// `order`, without writing anything.
    fn stage_reservation(&self, order: &Order) -> Result<HashMap<ItemId, u32>> {
        let mut staged: HashMap<ItemId, u32> = HashMap::new();

        for line in order.lines() {
            let on_hand = match staged.get(&line.item_id) {
                Some(quantity) => *quantity,
                None => {
                    self.items
                        .get(&line.item_id)
                        .ok_or(StoreError::ItemNotFound(line.item_id))?
                        .quantity
                }
            };

            let remaining =
                on_hand
                    .checked_sub(line.quantity)
                    .ok_or(StoreError::InsufficientStock {
                        item_id: line.item_id,
                        available: on_hand,
                        requested: line.quantity,
                    })?;
            staged.insert(line.item_id, remaining);
        }

        Ok(staged)
    }
}

/// In-memory store implementation for tests and single-process runs.
///
/// A single `RwLock` guards the whole state, so each atomic unit runs
/// under one write guard and stages its changes before applying them.
#[derive(Debug, Clone, Default)]
pub struct InMemoryShopStore {
    state: Arc<RwLock<ShopState>>,
}

impl InMemoryShopStore {
    /// Creates a new empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the total number of orders stored, deleted ones included.
    pub async fn order_count(&self) -> usize {
        self.state.read().await.orders.len()
    }

    /// Clears all items, carts and orders.
    pub async fn clear(&self) {
        let mut state = self.state.write().await;
        *state = ShopState::default();
    }
}

#[async_trait]
impl ShopStore for InMemoryShopStore {
    async fn insert_item(&self, item: &CatalogItem) -> Result<()> {
        let mut state = self.state.write().await;

        if state.items.values().any(|i| i.item_no == item.item_no) {
            return Err(StoreError::DuplicateItemNo(item.item_no.clone()));
        }

        state.items.insert(item.id, item.clone());
        Ok(())
    }

    async fn update_item(&self, item: &CatalogItem) -> Result<()> {
        let mut state = self.state.write().await;

        if !state.items.contains_key(&item.id) {
            return Err(StoreError::ItemNotFound(item.id));
        }
        if state
            .items
            .values()
            .any(|i| i.id != item.id && i.item_no == item.item_no)
        {
            return Err(StoreError::DuplicateItemNo(item.item_no.clone()));
        }

        state.items.insert(item.id, item.clone());
        Ok(())
    }

    async fn delete_item(&self, item_id: ItemId) -> Result<()> {
        let mut state = self.state.write().await;
        state
            .items
            .remove(&item_id)
            .map(|_| ())
            .ok_or(StoreError::ItemNotFound(item_id))
    }

    async fn get_item(&self, item_id: ItemId) -> Result<Option<CatalogItem>> {
        let state = self.state.read().await;
        Ok(state.items.get(&item_id).cloned())
    }

    async fn list_items(&self) -> Result<Vec<CatalogItem>> {
        let state = self.state.read().await;
        let mut items: Vec<_> = state.items.values().cloned().collect();
        items.sort_by(|a, b| a.item_no.cmp(&b.item_no));
        Ok(items)
    }

    async fn decrement_quantity(&self, item_id: ItemId, quantity: u32) -> Result<u32> {
        let mut state = self.state.write().await;
        let item = state
            .items
            .get_mut(&item_id)
            .ok_or(StoreError::ItemNotFound(item_id))?;

        item.quantity = item
            .quantity
            .checked_sub(quantity)
            .ok_or(StoreError::InsufficientStock {
                item_id,
                available: item.quantity,
                requested: quantity,
            })?;
        Ok(item.quantity)
    }

    async fn increment_quantity(&self, item_id: ItemId, quantity: u32) -> Result<u32> {
        let mut state = self.state.write().await;
        let item = state
            .items
            .get_mut(&item_id)
            .ok_or(StoreError::ItemNotFound(item_id))?;

        item.quantity = item.quantity.saturating_add(quantity);
        Ok(item.quantity)
    }

    async fn get_cart(&self, user_id: UserId) -> Result<Option<Cart>> {
        let state = self.state.read().await;
        Ok(state.carts.get(&user_id).cloned())
    }

    async fn save_cart(&self, cart: &Cart) -> Result<()> {
        let mut state = self.state.write().await;
        state.carts.insert(cart.user_id(), cart.clone());
        Ok(())
    }

    async fn get_order(&self, order_id: OrderId) -> Result<Option<Order>> {
        let state = self.state.read().await;
        Ok(state.orders.get(&order_id).cloned())
    }

    async fn query_orders(&self, query: &OrderQuery) -> Result<Vec<Order>> {
        let state = self.state.read().await;
        let mut orders: Vec<_> = state
            .orders
            .values()
            .filter(|order| query.matches(order))
            .cloned()
            .collect();
        orders.sort_by_key(|order| std::cmp::Reverse(order.created_at()));
        Ok(orders)
    }

    async fn mark_order_deleted(&self, order_id: OrderId, at: DateTime<Utc>) -> Result<()> {
        let mut state = self.state.write().await;
        state
            .orders
            .get_mut(&order_id)
            .ok_or(StoreError::OrderNotFound(order_id))?
            .soft_delete(at);
        Ok(())
    }

    async fn force_order_status(&self, order: &Order, expected: OrderStatus) -> Result<()> {
        let mut state = self.state.write().await;
        let stored = state
            .orders
            .get_mut(&order.id())
            .ok_or(StoreError::OrderNotFound(order.id()))?;

        let actual = stored.status();
        let conflict = StoreError::StatusConflict {
            order_id: order.id(),
            expected,
            actual,
        };
        if actual != expected {
            return Err(conflict);
        }
        stored
            .force_status(order.status(), order.updated_at())
            .map_err(|_| conflict)?;
        Ok(())
    }

    async fn place_order(&self, order: &Order, clear_cart_of: Option<UserId>) -> Result<()> {
        let mut state = self.state.write().await;

        let number = order.order_number().as_str();
        if state.order_numbers.contains(number) {
            return Err(StoreError::DuplicateOrderNumber(number.to_string()));
        }

        let staged = state.stage_reservation(order)?;

        for (item_id, remaining) in staged {
            if let Some(item) = state.items.get_mut(&item_id) {
                item.quantity = remaining;
            }
        }
        state.order_numbers.insert(number.to_string());
        state.orders.insert(order.id(), order.clone());
        if let Some(user_id) = clear_cart_of
            && let Some(cart) = state.carts.get_mut(&user_id)
        {
            cart.clear(order.created_at());
        }

        Ok(())
    }

    async fn cancel_order(&self, order: &Order, expected: OrderStatus) -> Result<()> {
        let mut state = self.state.write().await;

        let actual = state
            .orders
            .get(&order.id())
            .ok_or(StoreError::OrderNotFound(order.id()))?
            .status();
        if actual != expected {
            return Err(StoreError::StatusConflict {
                order_id: order.id(),
                expected,
                actual,
            });
        }

        for line in order.lines() {
            match state.items.get_mut(&line.item_id) {
                Some(item) => item.quantity = item.quantity.saturating_add(line.quantity),
                None => tracing::warn!(
                    order_id = %order.id(),
                    item_id = %line.item_id,
                    "restock skipped: item no longer in catalog"
                ),
            }
        }
        state.orders.insert(order.id(), order.clone());

        Ok(())
    }
}
