//! Catalog items and their stock level.

use chrono::{DateTime, Utc};
use common::ItemId;
use serde::{Deserialize, Serialize};

use crate::error::DomainError;
use crate::value_objects::Money;

/// Highest accepted unit price in cents. Any price up to this bound times
/// any `u32` quantity fits in an `i64`.
pub const MAX_UNIT_PRICE_CENTS: i64 = 1_000_000_000;

/// Editable attributes of a catalog item, as supplied by an operator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemDetails {
    pub item_no: String,
    pub name: String,
    pub description: Option<String>,
    pub quantity: u32,
    pub unit_price: Money,
    pub category: String,
    pub reorder_level: u32,
}

impl ItemDetails {
    /// Validates the attributes before they reach the catalog.
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.item_no.trim().is_empty() {
            return Err(DomainError::validation("itemNo", "is required"));
        }
        if self.name.trim().is_empty() {
            return Err(DomainError::validation("name", "is required"));
        }
        if self.category.trim().is_empty() {
            return Err(DomainError::validation("category", "is required"));
        }
        if self.unit_price.is_negative() {
            return Err(DomainError::validation(
                "unitPrice",
                format!("must not be negative, got {}", self.unit_price.cents()),
            ));
        }
        if self.unit_price.cents() > MAX_UNIT_PRICE_CENTS {
            return Err(DomainError::validation(
                "unitPrice",
                format!("must not exceed {MAX_UNIT_PRICE_CENTS}"),
            ));
        }
        if self.reorder_level < 1 {
            return Err(DomainError::validation(
                "reorderLevel",
                "must be at least 1",
            ));
        }
        Ok(())
    }
}

/// A sellable item with its quantity on hand.
///
/// `quantity` is unsigned, so a negative stock level cannot be represented.
/// Stores must refuse any decrement larger than the current quantity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogItem {
    pub id: ItemId,
    pub item_no: String,
    pub name: String,
    pub description: Option<String>,
    pub quantity: u32,
    pub unit_price: Money,
    pub category: String,
    pub reorder_level: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CatalogItem {
    /// Creates a new catalog item from validated details.
    pub fn create(details: ItemDetails, now: DateTime<Utc>) -> Result<Self, DomainError> {
        details.validate()?;

        Ok(Self {
            id: ItemId::new(),
            item_no: details.item_no,
            name: details.name,
            description: details.description,
            quantity: details.quantity,
            unit_price: details.unit_price,
            category: details.category,
            reorder_level: details.reorder_level,
            created_at: now,
            updated_at: now,
        })
    }

    /// Replaces the editable attributes.
    pub fn update(&mut self, details: ItemDetails, now: DateTime<Utc>) -> Result<(), DomainError> {
        details.validate()?;

        self.item_no = details.item_no;
        self.name = details.name;
        self.description = details.description;
        self.quantity = details.quantity;
        self.unit_price = details.unit_price;
        self.category = details.category;
        self.reorder_level = details.reorder_level;
        self.updated_at = now;
        Ok(())
    }

    /// True when the quantity on hand has fallen below the reorder level.
    pub fn is_low_stock(&self) -> bool {
        self.quantity < self.reorder_level
    }

    /// Fails with `InsufficientStock` unless `requested` units are on hand.
    pub fn ensure_available(&self, requested: u32) -> Result<(), DomainError> {
        if self.quantity < requested {
            return Err(DomainError::InsufficientStock {
                item_id: self.id,
                item_name: self.name.clone(),
                available: self.quantity,
                requested,
            });
        }
        Ok(())
    }
}
