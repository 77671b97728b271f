//! Integration tests for the cart-to-order flow.
//!
//! These tests drive the aggregates together the way the services do,
//! without any store behind them.

use chrono::{Duration, TimeZone, Utc};
use domain::{
    Cart, CatalogItem, DomainError, ItemDetails, Money, NewOrder, Order, OrderLine, OrderNumber,
    OrderStatus, PaymentMethod, ShippingAddress, Transition, UserId,
};
use rand::SeedableRng;
use rand::rngs::StdRng;

fn now() -> chrono::DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 1, 9, 30, 0).unwrap()
}

fn catalog_item(item_no: &str, quantity: u32, cents: i64) -> CatalogItem {
    CatalogItem::create(
        ItemDetails {
            item_no: item_no.to_string(),
            name: format!("Item {item_no}"),
            description: None,
            quantity,
            unit_price: Money::from_cents(cents),
            category: "Furniture".to_string(),
            reorder_level: 2,
        },
        now(),
    )
    .unwrap()
}

fn address() -> ShippingAddress {
    ShippingAddress {
        street: "12 Elm Row".to_string(),
        city: "Leeds".to_string(),
        state: "West Yorkshire".to_string(),
        zip_code: "LS1 4AP".to_string(),
        country: "UK".to_string(),
    }
}

fn order_number() -> OrderNumber {
    OrderNumber::generate(now(), &mut StdRng::seed_from_u64(7))
}

fn checkout(cart: &Cart, catalog: &[CatalogItem]) -> Order {
    let lines = cart
        .lines()
        .iter()
        .map(|line| {
            let item = catalog.iter().find(|i| i.id == line.item_id).unwrap();
            OrderLine::snapshot(item, line.quantity, line.price)
        })
        .collect();

    Order::place(
        NewOrder {
            user_id: cart.user_id(),
            lines,
            address: address(),
            payment_method: PaymentMethod::new("cash on delivery").unwrap(),
        },
        order_number(),
        now() + Duration::minutes(5),
    )
    .unwrap()
}

mod cart_to_order {
    use super::*;

    #[test]
    fn order_bill_matches_cart_total() {
        let chair = catalog_item("CH-1", 10, 4_500);
        let lamp = catalog_item("LP-1", 3, 1_999);
        let mut cart = Cart::new(UserId::new(), now());

        cart.add_line(&chair, 2, now()).unwrap();
        cart.add_line(&lamp, 1, now()).unwrap();
        cart.add_line(&chair, 1, now()).unwrap();

        assert_eq!(cart.lines().len(), 2);
        assert_eq!(cart.total(), Money::from_cents(3 * 4_500 + 1_999));

        let order = checkout(&cart, &[chair, lamp]);
        assert_eq!(order.total_bill(), cart.total());
        assert_eq!(order.status(), OrderStatus::Pending);
        assert_eq!(order.lines().len(), 2);
        assert!(order.order_number().as_str().starts_with("ORD-20240601-"));
    }

    #[test]
    fn cart_keeps_price_from_first_add() {
        let mut chair = catalog_item("CH-1", 10, 4_500);
        let mut cart = Cart::new(UserId::new(), now());
        cart.add_line(&chair, 1, now()).unwrap();

        chair
            .update(
                ItemDetails {
                    item_no: chair.item_no.clone(),
                    name: "Renamed Chair".to_string(),
                    description: None,
                    quantity: chair.quantity,
                    unit_price: Money::from_cents(9_000),
                    category: chair.category.clone(),
                    reorder_level: chair.reorder_level,
                },
                now(),
            )
            .unwrap();
        cart.add_line(&chair, 1, now()).unwrap();

        let order = checkout(&cart, &[chair]);
        assert_eq!(order.lines()[0].unit_price, Money::from_cents(4_500));
        assert_eq!(order.lines()[0].name, "Renamed Chair");
        assert_eq!(order.total_bill(), Money::from_cents(9_000));
    }

    #[test]
    fn cart_refuses_more_than_stock() {
        let lamp = catalog_item("LP-1", 3, 1_999);
        let mut cart = Cart::new(UserId::new(), now());
        cart.add_line(&lamp, 2, now()).unwrap();

        let err = cart.add_line(&lamp, 2, now()).unwrap_err();
        assert!(matches!(
            err,
            DomainError::InsufficientStock {
                available: 3,
                requested: 4,
                ..
            }
        ));
        assert_eq!(cart.line(lamp.id).unwrap().quantity, 2);
    }
}

mod order_lifecycle {
    use super::*;

    fn placed_order() -> Order {
        let chair = catalog_item("CH-1", 10, 4_500);
        let mut cart = Cart::new(UserId::new(), now());
        cart.add_line(&chair, 1, now()).unwrap();
        checkout(&cart, &[chair])
    }

    #[test]
    fn cancel_from_processing() {
        let mut order = placed_order();
        order.force_status(OrderStatus::Processing, now()).unwrap();

        let transition = order.cancel(now()).unwrap();
        assert_eq!(
            transition,
            Transition::Checked {
                from: OrderStatus::Processing,
                to: OrderStatus::Cancelled,
            }
        );
        assert!(order.cancel(now()).is_err());
    }

    #[test]
    fn forced_status_can_leave_lifecycle() {
        let mut order = placed_order();
        order.force_status(OrderStatus::Delivered, now()).unwrap();

        let transition = order.force_status(OrderStatus::Pending, now()).unwrap();
        assert!(!transition.follows_lifecycle());
        assert_eq!(order.status(), OrderStatus::Pending);
        assert_eq!(order.total_bill(), Money::from_cents(4_500));
    }

    #[test]
    fn soft_delete_hides_from_owner() {
        let mut order = placed_order();
        let owner = order.user_id();
        assert!(order.is_visible_to(owner));

        order.soft_delete(now());
        assert!(!order.is_visible_to(owner));
        assert_eq!(order.status(), OrderStatus::Pending);
    }
}
