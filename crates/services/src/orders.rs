//! Order placement, cancellation and administration.

use std::sync::Arc;
use std::time::Instant;

use common::{ItemId, OrderId, UserId};
use domain::{
    Clock, NewOrder, Order, OrderStatus, PaymentMethod, ShippingAddress, Transition,
};
use store::{OrderQuery, ShopStore, StoreError};

use crate::error::{Result, ServiceError};
use crate::reservation::{self, LineRequest};

/// Delivery and payment details supplied at checkout.
#[derive(Debug, Clone)]
pub struct Checkout {
    pub address: ShippingAddress,
    pub payment_method: PaymentMethod,
}

/// Service for the order lifecycle.
#[derive(Clone)]
pub struct OrderService<S> {
    store: S,
    clock: Arc<dyn Clock>,
}

impl<S: ShopStore> OrderService<S> {
    /// Creates a new order service.
    pub fn new(store: S, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// Turns the user's cart into an order and empties the cart.
    ///
    /// Lines keep the price captured when they were added to the cart.
    #[tracing::instrument(skip(self, checkout))]
    pub async fn create_from_cart(&self, user_id: UserId, checkout: Checkout) -> Result<Order> {
        let started = Instant::now();
        let result = self.place_cart(user_id, checkout).await;
        self.record_placement(&result, started);
        result
    }

    /// Orders a single item directly at its current price.
    #[tracing::instrument(skip(self, checkout))]
    pub async fn create_single_item(
        &self,
        user_id: UserId,
        item_id: ItemId,
        quantity: u32,
        checkout: Checkout,
    ) -> Result<Order> {
        let started = Instant::now();
        let result = self.place_single(user_id, item_id, quantity, checkout).await;
        self.record_placement(&result, started);
        result
    }

    /// The user's visible orders, newest first.
    pub async fn list_for_user(&self, user_id: UserId) -> Result<Vec<Order>> {
        Ok(self.store.query_orders(&OrderQuery::for_user(user_id)).await?)
    }

    /// One of the user's visible orders.
    pub async fn get_for_user(&self, user_id: UserId, order_id: OrderId) -> Result<Order> {
        self.store
            .get_order(order_id)
            .await?
            .filter(|order| order.is_visible_to(user_id))
            .ok_or_else(|| ServiceError::not_found("Order not found"))
    }

    /// Cancels a pending or processing order and restocks its lines.
    ///
    /// The status write and the restock are one atomic unit guarded by the
    /// status read here, so a second cancel never restocks again.
    #[tracing::instrument(skip(self))]
    pub async fn cancel(&self, user_id: UserId, order_id: OrderId) -> Result<Order> {
        let mut order = self.get_for_user(user_id, order_id).await?;
        let transition = order.cancel(self.clock.now())?;
        let expected = transition.from_status();

        self.store
            .cancel_order(&order, expected)
            .await
            .map_err(|err| match err {
                StoreError::StatusConflict { actual, .. } => ServiceError::InvalidTransition {
                    current: actual,
                    action: "cancel",
                },
                other => other.into(),
            })?;

        let units: u64 = order.lines().iter().map(|l| u64::from(l.quantity)).sum();
        metrics::counter!("orders_cancelled_total").increment(1);
        metrics::counter!("stock_units_restocked_total").increment(units);
        tracing::info!(
            order_number = %order.order_number(),
            from = %expected,
            units,
            "order cancelled"
        );

        Ok(order)
    }

    /// Hides an order from its owner. Stock is untouched.
    #[tracing::instrument(skip(self))]
    pub async fn soft_delete(&self, user_id: UserId, order_id: OrderId) -> Result<()> {
        let order = self.get_for_user(user_id, order_id).await?;
        self.store
            .mark_order_deleted(order_id, self.clock.now())
            .await?;

        tracing::info!(order_number = %order.order_number(), "order deleted");
        Ok(())
    }

    /// Every visible order, optionally filtered by status.
    pub async fn admin_list(&self, status: Option<OrderStatus>) -> Result<Vec<Order>> {
        let query = OrderQuery::new().maybe_status(status);
        Ok(self.store.query_orders(&query).await?)
    }

    /// Sets any status, bypassing the lifecycle. Stock is never moved.
    ///
    /// The write only lands if the status read here is still stored, so a
    /// concurrent cancel is never overwritten. Cancelled orders stay
    /// cancelled.
    #[tracing::instrument(skip(self))]
    pub async fn admin_set_status(&self, order_id: OrderId, status: OrderStatus) -> Result<Order> {
        let mut order = self
            .store
            .get_order(order_id)
            .await?
            .filter(|order| !order.is_deleted())
            .ok_or_else(|| ServiceError::not_found("Order not found"))?;

        let transition = order.force_status(status, self.clock.now())?;
        self.store
            .force_order_status(&order, transition.from_status())
            .await
            .map_err(|err| match err {
                StoreError::StatusConflict { actual, .. } => ServiceError::InvalidTransition {
                    current: actual,
                    action: "update",
                },
                other => other.into(),
            })?;

        metrics::counter!(
            "order_status_forced_total",
            "from" => transition.from_status().as_str(),
            "to" => transition.to_status().as_str()
        )
        .increment(1);
        log_forced(&order, transition);

        Ok(order)
    }

    async fn place_cart(&self, user_id: UserId, checkout: Checkout) -> Result<Order> {
        let cart = self
            .store
            .get_cart(user_id)
            .await?
            .filter(|cart| !cart.is_empty())
            .ok_or_else(|| ServiceError::validation("items", "cart is empty"))?;

        let mut requests = Vec::with_capacity(cart.lines().len());
        for line in cart.lines() {
            let item = self
                .store
                .get_item(line.item_id)
                .await?
                .ok_or_else(|| ServiceError::not_found("Item not found"))?;
            requests.push(LineRequest {
                item,
                quantity: line.quantity,
                unit_price: line.price,
            });
        }

        self.place(user_id, &requests, checkout, Some(user_id)).await
    }

    async fn place_single(
        &self,
        user_id: UserId,
        item_id: ItemId,
        quantity: u32,
        checkout: Checkout,
    ) -> Result<Order> {
        if quantity == 0 {
            return Err(ServiceError::validation("quantity", "must be at least 1"));
        }

        let item = self
            .store
            .get_item(item_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Item not found"))?;
        let unit_price = item.unit_price;

        self.place(
            user_id,
            &[LineRequest {
                item,
                quantity,
                unit_price,
            }],
            checkout,
            None,
        )
        .await
    }

    async fn place(
        &self,
        user_id: UserId,
        requests: &[LineRequest],
        checkout: Checkout,
        clear_cart_of: Option<UserId>,
    ) -> Result<Order> {
        let lines = reservation::snapshot_lines(requests)?;
        let now = self.clock.now();
        let mut order = Order::place(
            NewOrder {
                user_id,
                lines,
                address: checkout.address,
                payment_method: checkout.payment_method,
            },
            reservation::next_order_number(now),
            now,
        )?;

        reservation::reserve_and_place(&self.store, &mut order, clear_cart_of).await?;

        tracing::info!(
            order_id = %order.id(),
            order_number = %order.order_number(),
            lines = order.lines().len(),
            total_cents = order.total_bill().cents(),
            "order placed"
        );
        Ok(order)
    }

    fn record_placement(&self, result: &Result<Order>, started: Instant) {
        match result {
            Ok(_) => {
                metrics::counter!("orders_created_total").increment(1);
                metrics::histogram!("order_placement_duration_seconds")
                    .record(started.elapsed().as_secs_f64());
            }
            Err(err) => {
                metrics::counter!("order_creation_rejected_total", "reason" => err.kind())
                    .increment(1);
                tracing::info!(reason = err.kind(), error = %err, "order rejected");
            }
        }
    }
}

fn log_forced(order: &Order, transition: Transition) {
    if transition.follows_lifecycle() {
        tracing::warn!(
            order_number = %order.order_number(),
            from = %transition.from_status(),
            to = %transition.to_status(),
            "order status forced"
        );
    } else {
        tracing::warn!(
            order_number = %order.order_number(),
            from = %transition.from_status(),
            to = %transition.to_status(),
            "order status forced outside the lifecycle"
        );
    }
}
