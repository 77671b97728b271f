//! Domain error types.

use common::ItemId;
use thiserror::Error;

use crate::order::OrderStatus;

/// Invariant violations raised by the aggregates.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomainError {
    /// A field is missing or malformed.
    #[error("Invalid {field}: {message}")]
    Validation {
        field: &'static str,
        message: String,
    },

    /// Requested quantity exceeds the quantity on hand.
    #[error("Not enough stock for {item_name}. Available: {available}, Requested: {requested}")]
    InsufficientStock {
        item_id: ItemId,
        item_name: String,
        available: u32,
        requested: u32,
    },

    /// The cart has no line for the item.
    #[error("Item {item_id} is not in the cart")]
    LineNotFound { item_id: ItemId },

    /// The order status does not allow the requested action.
    #[error("Cannot {action} an order that is {current}")]
    InvalidTransition {
        current: OrderStatus,
        action: &'static str,
    },
}

impl DomainError {
    /// Shorthand for a [`DomainError::Validation`].
    pub fn validation(field: &'static str, message: impl Into<String>) -> Self {
        Self::Validation {
            field,
            message: message.into(),
        }
    }
}
