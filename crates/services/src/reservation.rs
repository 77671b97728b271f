//! Stock reservation routine shared by both order-creation paths.
//!
//! Every requested line is checked against the catalog before anything is
//! written. The conditional decrements, the order insert and the cart clear
//! then run as one atomic unit in the store, so a line that loses a race
//! rolls the whole placement back.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use common::{ItemId, UserId};
use domain::{CatalogItem, Money, Order, OrderLine, OrderNumber};
use store::{ShopStore, StoreError};

use crate::error::{Result, ServiceError};

/// Number of order numbers tried before giving up on a placement.
pub const MAX_ORDER_NUMBER_ATTEMPTS: usize = 5;

/// One line of a placement request, resolved against the catalog.
#[derive(Debug, Clone)]
pub struct LineRequest {
    pub item: CatalogItem,
    pub quantity: u32,
    pub unit_price: Money,
}

/// Validates every request against current stock and snapshots the lines.
///
/// Repeated items are checked on their combined quantity. The first
/// shortfall aborts; nothing is written either way.
pub fn snapshot_lines(requests: &[LineRequest]) -> Result<Vec<OrderLine>> {
    let mut combined: HashMap<ItemId, u32> = HashMap::new();

    for request in requests {
        if request.quantity == 0 {
            return Err(ServiceError::validation("quantity", "must be at least 1"));
        }
        let total = combined.entry(request.item.id).or_default();
        *total = total.saturating_add(request.quantity);
        request.item.ensure_available(*total)?;
    }

    Ok(requests
        .iter()
        .map(|r| OrderLine::snapshot(&r.item, r.quantity, r.unit_price))
        .collect())
}

/// Draws an order number for an order placed at `placed_at`.
pub fn next_order_number(placed_at: DateTime<Utc>) -> OrderNumber {
    OrderNumber::generate(placed_at, &mut rand::thread_rng())
}

/// Reserves stock and records `order` in one atomic unit.
///
/// Order-number collisions are retried with a fresh number up to
/// [`MAX_ORDER_NUMBER_ATTEMPTS`] times.
pub async fn reserve_and_place<S: ShopStore + ?Sized>(
    store: &S,
    order: &mut Order,
    clear_cart_of: Option<UserId>,
) -> Result<()> {
    for attempt in 1..=MAX_ORDER_NUMBER_ATTEMPTS {
        match store.place_order(order, clear_cart_of).await {
            Ok(()) => {
                let units: u64 = order.lines().iter().map(|l| u64::from(l.quantity)).sum();
                metrics::counter!("stock_units_reserved_total").increment(units);
                return Ok(());
            }
            Err(StoreError::DuplicateOrderNumber(number)) => {
                tracing::warn!(attempt, %number, "order number collision, regenerating");
                order.renumber(next_order_number(order.created_at()));
            }
            Err(StoreError::InsufficientStock {
                item_id,
                available,
                requested,
            }) => {
                let item_name = order
                    .lines()
                    .iter()
                    .find(|line| line.item_id == item_id)
                    .map(|line| line.name.clone())
                    .unwrap_or_else(|| item_id.to_string());
                tracing::info!(%item_id, available, requested, "stock taken by a concurrent order");
                return Err(ServiceError::InsufficientStock {
                    item_id,
                    item_name,
                    available,
                    requested,
                });
            }
            Err(err) => return Err(err.into()),
        }
    }

    Err(ServiceError::Unexpected(format!(
        "no unique order number after {MAX_ORDER_NUMBER_ATTEMPTS} attempts"
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain::ItemDetails;

    fn item(name: &str, quantity: u32) -> CatalogItem {
        CatalogItem::create(
            ItemDetails {
                item_no: format!("N-{name}"),
                name: name.to_string(),
                description: None,
                quantity,
                unit_price: Money::from_cents(500),
                category: "Decor".to_string(),
                reorder_level: 1,
            },
            Utc::now(),
        )
        .unwrap()
    }

    fn request(item: &CatalogItem, quantity: u32) -> LineRequest {
        LineRequest {
            item: item.clone(),
            quantity,
            unit_price: item.unit_price,
        }
    }

    #[test]
    fn snapshots_every_line_when_stock_suffices() {
        let vase = item("Vase", 3);
        let rug = item("Rug", 1);

        let lines = snapshot_lines(&[request(&vase, 3), request(&rug, 1)]).unwrap();

        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].subtotal, Money::from_cents(1_500));
        assert_eq!(lines[1].name, "Rug");
    }

    #[test]
    fn first_shortfall_names_the_item() {
        let vase = item("Vase", 3);
        let rug = item("Rug", 1);

        let err = snapshot_lines(&[request(&vase, 1), request(&rug, 2)]).unwrap_err();

        assert_eq!(
            err.to_string(),
            "Not enough stock for Rug. Available: 1, Requested: 2"
        );
    }

    #[test]
    fn repeated_items_are_checked_together() {
        let vase = item("Vase", 3);

        let err = snapshot_lines(&[request(&vase, 2), request(&vase, 2)]).unwrap_err();

        assert!(matches!(
            err,
            ServiceError::InsufficientStock {
                available: 3,
                requested: 4,
                ..
            }
        ));
    }

    #[test]
    fn zero_quantity_is_rejected() {
        let vase = item("Vase", 3);
        let err = snapshot_lines(&[request(&vase, 0)]).unwrap_err();
        assert!(matches!(err, ServiceError::Validation { field: "quantity", .. }));
    }
}
