//! Catalog administration.

use std::sync::Arc;

use common::ItemId;
use domain::{CatalogItem, Clock, ItemDetails};
use store::ShopStore;

use crate::error::{Result, ServiceError};

/// Service for managing sellable items.
#[derive(Clone)]
pub struct CatalogService<S> {
    store: S,
    clock: Arc<dyn Clock>,
}

impl<S: ShopStore> CatalogService<S> {
    /// Creates a new catalog service.
    pub fn new(store: S, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// Adds an item. The item number must be unique.
    #[tracing::instrument(skip(self, details), fields(item_no = %details.item_no))]
    pub async fn create(&self, details: ItemDetails) -> Result<CatalogItem> {
        let item = CatalogItem::create(details, self.clock.now())?;
        self.store.insert_item(&item).await?;

        tracing::info!(item_id = %item.id, quantity = item.quantity, "catalog item created");
        Ok(item)
    }

    /// Lists every item, ordered by item number.
    pub async fn list(&self) -> Result<Vec<CatalogItem>> {
        Ok(self.store.list_items().await?)
    }

    /// Fetches one item.
    pub async fn get(&self, item_id: ItemId) -> Result<CatalogItem> {
        self.store
            .get_item(item_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Item not found"))
    }

    /// Replaces an item's editable attributes.
    #[tracing::instrument(skip(self, details))]
    pub async fn update(&self, item_id: ItemId, details: ItemDetails) -> Result<CatalogItem> {
        let mut item = self.get(item_id).await?;
        item.update(details, self.clock.now())?;
        self.store.update_item(&item).await?;
        Ok(item)
    }

    /// Removes an item. Placed orders keep their snapshots.
    #[tracing::instrument(skip(self))]
    pub async fn delete(&self, item_id: ItemId) -> Result<()> {
        self.store.delete_item(item_id).await?;
        tracing::info!(%item_id, "catalog item deleted");
        Ok(())
    }

    /// Items whose quantity on hand is below their reorder level.
    pub async fn low_stock(&self) -> Result<Vec<CatalogItem>> {
        let items = self.store.list_items().await?;
        Ok(items.into_iter().filter(CatalogItem::is_low_stock).collect())
    }
}
