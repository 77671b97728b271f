use chrono::Utc;
use criterion::{Criterion, criterion_group, criterion_main};
use domain::{
    Cart, CatalogItem, ItemDetails, Money, NewOrder, Order, OrderLine, OrderNumber,
    PaymentMethod, ShippingAddress, UserId,
};
use rand::SeedableRng;
use rand::rngs::StdRng;

fn catalog(n: usize) -> Vec<CatalogItem> {
    (0..n)
        .map(|i| {
            CatalogItem::create(
                ItemDetails {
                    item_no: format!("ITM-{i:04}"),
                    name: format!("Bench Item {i}"),
                    description: None,
                    quantity: 1_000,
                    unit_price: Money::from_cents(1_000 + i as i64),
                    category: "Bench".to_string(),
                    reorder_level: 5,
                },
                Utc::now(),
            )
            .unwrap()
        })
        .collect()
}

fn address() -> ShippingAddress {
    ShippingAddress {
        street: "1 Bench Road".to_string(),
        city: "Galle".to_string(),
        state: "Southern".to_string(),
        zip_code: "80000".to_string(),
        country: "Sri Lanka".to_string(),
    }
}

fn bench_cart_add_lines(c: &mut Criterion) {
    let items = catalog(50);

    c.bench_function("domain/cart_add_50_lines", |b| {
        b.iter(|| {
            let mut cart = Cart::new(UserId::new(), Utc::now());
            for item in &items {
                cart.add_line(item, 2, Utc::now()).unwrap();
            }
            cart.total()
        });
    });
}

fn bench_cart_merge(c: &mut Criterion) {
    let items = catalog(1);
    let item = &items[0];

    c.bench_function("domain/cart_merge_same_line", |b| {
        b.iter(|| {
            let mut cart = Cart::new(UserId::new(), Utc::now());
            for _ in 0..100 {
                cart.add_line(item, 1, Utc::now()).unwrap();
            }
            cart.total()
        });
    });
}

fn bench_place_order(c: &mut Criterion) {
    let items = catalog(20);
    let mut rng = StdRng::seed_from_u64(1);

    c.bench_function("domain/place_order_20_lines", |b| {
        b.iter(|| {
            let lines = items
                .iter()
                .map(|item| OrderLine::snapshot(item, 3, item.unit_price))
                .collect();
            Order::place(
                NewOrder {
                    user_id: UserId::new(),
                    lines,
                    address: address(),
                    payment_method: PaymentMethod::new("card").unwrap(),
                },
                OrderNumber::generate(Utc::now(), &mut rng),
                Utc::now(),
            )
            .unwrap()
        });
    });
}

criterion_group!(
    benches,
    bench_cart_add_lines,
    bench_cart_merge,
    bench_place_order
);
criterion_main!(benches);
