use common::{ItemId, OrderId};
use domain::OrderStatus;
use thiserror::Error;

/// Errors that can occur when interacting with the store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// No catalog item with this id.
    #[error("Item not found: {0}")]
    ItemNotFound(ItemId),

    /// No order with this id.
    #[error("Order not found: {0}")]
    OrderNotFound(OrderId),

    /// A conditional decrement found fewer units than requested.
    /// Nothing was written.
    #[error("Insufficient stock for item {item_id}: available {available}, requested {requested}")]
    InsufficientStock {
        item_id: ItemId,
        available: u32,
        requested: u32,
    },

    /// Another catalog item already uses this item number.
    #[error("Item number already in use: {0}")]
    DuplicateItemNo(String),

    /// Another order already uses this order number.
    #[error("Order number already in use: {0}")]
    DuplicateOrderNumber(String),

    /// The order's stored status was not the one the caller expected.
    #[error("Order {order_id} status changed: expected {expected}, found {actual}")]
    StatusConflict {
        order_id: OrderId,
        expected: OrderStatus,
        actual: OrderStatus,
    },

    /// A stored row could not be mapped back to a domain value.
    #[error("Corrupt record: {0}")]
    Corrupt(String),

    /// A database error occurred.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A database migration error occurred.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
