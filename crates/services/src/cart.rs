//! Shopping cart workflows.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use common::{ItemId, UserId};
use domain::{Cart, CatalogItem, Clock, Money};
use serde::Serialize;
use store::ShopStore;

use crate::error::{Result, ServiceError};

/// Catalog attributes shown next to a cart line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemSummary {
    pub name: String,
    pub item_no: String,
    pub category: String,
    pub unit_price: Money,
}

impl From<&CatalogItem> for ItemSummary {
    fn from(item: &CatalogItem) -> Self {
        Self {
            name: item.name.clone(),
            item_no: item.item_no.clone(),
            category: item.category.clone(),
            unit_price: item.unit_price,
        }
    }
}

/// A cart line with its catalog item, if the item still exists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLineView {
    pub item_id: ItemId,
    pub quantity: u32,
    pub price: Money,
    pub item: Option<ItemSummary>,
}

/// A cart as returned to its owner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartView {
    pub user_id: UserId,
    pub items: Vec<CartLineView>,
    pub total: Money,
    pub updated_at: DateTime<Utc>,
}

/// Service for a user's cart.
///
/// Every mutation recomputes the total and persists the cart before
/// returning the populated view.
#[derive(Clone)]
pub struct CartService<S> {
    store: S,
    clock: Arc<dyn Clock>,
}

impl<S: ShopStore> CartService<S> {
    /// Creates a new cart service.
    pub fn new(store: S, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// Loads the user's cart, creating an empty one on first use.
    pub async fn get(&self, user_id: UserId) -> Result<Cart> {
        if let Some(cart) = self.store.get_cart(user_id).await? {
            return Ok(cart);
        }

        let cart = Cart::new(user_id, self.clock.now());
        self.store.save_cart(&cart).await?;
        Ok(cart)
    }

    /// Loads the user's cart with each line's catalog item.
    #[tracing::instrument(skip(self))]
    pub async fn view(&self, user_id: UserId) -> Result<CartView> {
        let cart = self.get(user_id).await?;
        self.populate(cart).await
    }

    /// Adds units of an item, merging with an existing line.
    #[tracing::instrument(skip(self))]
    pub async fn add(&self, user_id: UserId, item_id: ItemId, quantity: u32) -> Result<CartView> {
        if quantity == 0 {
            return Err(ServiceError::validation("quantity", "must be at least 1"));
        }

        let item = self.find_item(item_id).await?;
        let mut cart = self.get(user_id).await?;
        cart.add_line(&item, quantity, self.clock.now())?;
        self.store.save_cart(&cart).await?;

        self.populate(cart).await
    }

    /// Overwrites a line's quantity. Zero removes the line.
    #[tracing::instrument(skip(self))]
    pub async fn update(
        &self,
        user_id: UserId,
        item_id: ItemId,
        quantity: u32,
    ) -> Result<CartView> {
        let mut cart = self.get(user_id).await?;
        if cart.line(item_id).is_none() {
            return Err(ServiceError::not_found("Item not in cart"));
        }

        if quantity == 0 {
            cart.remove_line(item_id, self.clock.now());
        } else {
            let item = self.find_item(item_id).await?;
            cart.set_line_quantity(&item, quantity, self.clock.now())?;
        }
        self.store.save_cart(&cart).await?;

        self.populate(cart).await
    }

    /// Drops a line. Removing an absent line is not an error.
    #[tracing::instrument(skip(self))]
    pub async fn remove(&self, user_id: UserId, item_id: ItemId) -> Result<CartView> {
        let mut cart = self.get(user_id).await?;
        if cart.remove_line(item_id, self.clock.now()) {
            self.store.save_cart(&cart).await?;
        }

        self.populate(cart).await
    }

    /// Empties the cart.
    #[tracing::instrument(skip(self))]
    pub async fn clear(&self, user_id: UserId) -> Result<CartView> {
        let mut cart = self.get(user_id).await?;
        cart.clear(self.clock.now());
        self.store.save_cart(&cart).await?;

        self.populate(cart).await
    }

    async fn find_item(&self, item_id: ItemId) -> Result<CatalogItem> {
        self.store
            .get_item(item_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Item not found"))
    }

    async fn populate(&self, cart: Cart) -> Result<CartView> {
        let mut items = Vec::with_capacity(cart.lines().len());
        for line in cart.lines() {
            let item = self.store.get_item(line.item_id).await?;
            items.push(CartLineView {
                item_id: line.item_id,
                quantity: line.quantity,
                price: line.price,
                item: item.as_ref().map(ItemSummary::from),
            });
        }

        Ok(CartView {
            user_id: cart.user_id(),
            items,
            total: cart.total(),
            updated_at: cart.updated_at(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain::{FixedClock, ItemDetails};
    use store::InMemoryShopStore;

    struct Fixture {
        store: InMemoryShopStore,
        carts: CartService<InMemoryShopStore>,
        user: UserId,
    }

    fn fixture() -> Fixture {
        let store = InMemoryShopStore::new();
        let carts = CartService::new(store.clone(), Arc::new(FixedClock::new(Utc::now())));
        Fixture {
            store,
            carts,
            user: UserId::new(),
        }
    }

    async fn stock(store: &InMemoryShopStore, name: &str, quantity: u32, cents: i64) -> CatalogItem {
        let item = CatalogItem::create(
            ItemDetails {
                item_no: format!("SKU-{name}"),
                name: name.to_string(),
                description: None,
                quantity,
                unit_price: Money::from_cents(cents),
                category: "Kitchen".to_string(),
                reorder_level: 1,
            },
            Utc::now(),
        )
        .unwrap();
        store.insert_item(&item).await.unwrap();
        item
    }

    #[tokio::test]
    async fn get_creates_an_empty_cart() {
        let f = fixture();
        let cart = f.carts.view(f.user).await.unwrap();

        assert!(cart.items.is_empty());
        assert_eq!(cart.total, Money::zero());
        assert!(f.store.get_cart(f.user).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn add_populates_lines_and_total() {
        let f = fixture();
        let kettle = stock(&f.store, "Kettle", 5, 2_000).await;

        let cart = f.carts.add(f.user, kettle.id, 2).await.unwrap();

        assert_eq!(cart.items.len(), 1);
        assert_eq!(cart.total, Money::from_cents(4_000));
        let summary = cart.items[0].item.as_ref().unwrap();
        assert_eq!(summary.name, "Kettle");
        assert_eq!(summary.item_no, "SKU-Kettle");
    }

    #[tokio::test]
    async fn add_rejects_merged_quantity_above_stock() {
        let f = fixture();
        let kettle = stock(&f.store, "Kettle", 5, 2_000).await;
        f.carts.add(f.user, kettle.id, 3).await.unwrap();

        let err = f.carts.add(f.user, kettle.id, 3).await.unwrap_err();
        assert!(matches!(
            err,
            ServiceError::InsufficientStock {
                available: 5,
                requested: 6,
                ..
            }
        ));

        let cart = f.carts.view(f.user).await.unwrap();
        assert_eq!(cart.items[0].quantity, 3);
    }

    #[tokio::test]
    async fn add_unknown_item_is_not_found() {
        let f = fixture();
        let err = f.carts.add(f.user, ItemId::new(), 1).await.unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(msg) if msg == "Item not found"));
    }

    #[tokio::test]
    async fn add_zero_is_a_validation_error() {
        let f = fixture();
        let kettle = stock(&f.store, "Kettle", 5, 2_000).await;
        let err = f.carts.add(f.user, kettle.id, 0).await.unwrap_err();
        assert!(matches!(err, ServiceError::Validation { field: "quantity", .. }));
    }

    #[tokio::test]
    async fn update_overwrites_or_removes() {
        let f = fixture();
        let kettle = stock(&f.store, "Kettle", 5, 2_000).await;
        let pan = stock(&f.store, "Pan", 5, 1_000).await;
        f.carts.add(f.user, kettle.id, 1).await.unwrap();
        f.carts.add(f.user, pan.id, 1).await.unwrap();

        let cart = f.carts.update(f.user, kettle.id, 4).await.unwrap();
        assert_eq!(cart.total, Money::from_cents(9_000));

        let cart = f.carts.update(f.user, pan.id, 0).await.unwrap();
        assert_eq!(cart.items.len(), 1);
        assert_eq!(cart.total, Money::from_cents(8_000));

        let err = f.carts.update(f.user, kettle.id, 6).await.unwrap_err();
        assert!(matches!(err, ServiceError::InsufficientStock { .. }));
    }

    #[tokio::test]
    async fn update_of_absent_line_is_not_found() {
        let f = fixture();
        let kettle = stock(&f.store, "Kettle", 5, 2_000).await;

        let err = f.carts.update(f.user, kettle.id, 1).await.unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(msg) if msg == "Item not in cart"));
    }

    #[tokio::test]
    async fn remove_is_idempotent() {
        let f = fixture();
        let kettle = stock(&f.store, "Kettle", 5, 2_000).await;
        f.carts.add(f.user, kettle.id, 1).await.unwrap();

        let cart = f.carts.remove(f.user, kettle.id).await.unwrap();
        assert!(cart.items.is_empty());
        let cart = f.carts.remove(f.user, kettle.id).await.unwrap();
        assert!(cart.items.is_empty());
    }

    #[tokio::test]
    async fn clear_empties_the_cart() {
        let f = fixture();
        let kettle = stock(&f.store, "Kettle", 5, 2_000).await;
        f.carts.add(f.user, kettle.id, 2).await.unwrap();

        let cart = f.carts.clear(f.user).await.unwrap();
        assert!(cart.items.is_empty());
        assert_eq!(cart.total, Money::zero());
    }

    #[tokio::test]
    async fn deleted_items_render_without_summary() {
        let f = fixture();
        let kettle = stock(&f.store, "Kettle", 5, 2_000).await;
        f.carts.add(f.user, kettle.id, 2).await.unwrap();
        f.store.delete_item(kettle.id).await.unwrap();

        let cart = f.carts.view(f.user).await.unwrap();
        assert_eq!(cart.items.len(), 1);
        assert!(cart.items[0].item.is_none());
        assert_eq!(cart.total, Money::from_cents(4_000));
    }

    #[tokio::test]
    async fn line_price_is_kept_from_add_time() {
        let f = fixture();
        let mut kettle = stock(&f.store, "Kettle", 5, 2_000).await;
        f.carts.add(f.user, kettle.id, 1).await.unwrap();

        kettle.unit_price = Money::from_cents(2_500);
        f.store.update_item(&kettle).await.unwrap();

        let cart = f.carts.view(f.user).await.unwrap();
        assert_eq!(cart.items[0].price, Money::from_cents(2_000));
        assert_eq!(
            cart.items[0].item.as_ref().unwrap().unit_price,
            Money::from_cents(2_500)
        );
    }
}
