//! Service error types.

use common::ItemId;
use domain::{DomainError, OrderStatus};
use store::StoreError;
use thiserror::Error;

/// Errors surfaced by the catalog, cart and order services.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// A field is missing or malformed.
    #[error("Invalid {field}: {message}")]
    Validation {
        field: &'static str,
        message: String,
    },

    /// The requested resource does not exist or is not visible to the caller.
    #[error("{0}")]
    NotFound(String),

    /// Requested quantity exceeds the quantity on hand.
    #[error("Not enough stock for {item_name}. Available: {available}, Requested: {requested}")]
    InsufficientStock {
        item_id: ItemId,
        item_name: String,
        available: u32,
        requested: u32,
    },

    /// The order status does not allow the requested action.
    #[error("Cannot {action} an order that is {current}")]
    InvalidTransition {
        current: OrderStatus,
        action: &'static str,
    },

    /// Anything the caller cannot fix.
    #[error("Unexpected error: {0}")]
    Unexpected(String),
}

impl ServiceError {
    pub fn validation(field: &'static str, message: impl Into<String>) -> Self {
        Self::Validation {
            field,
            message: message.into(),
        }
    }

    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    /// Short, stable label used in metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            ServiceError::Validation { .. } => "validation",
            ServiceError::NotFound(_) => "not_found",
            ServiceError::InsufficientStock { .. } => "insufficient_stock",
            ServiceError::InvalidTransition { .. } => "invalid_transition",
            ServiceError::Unexpected(_) => "unexpected",
        }
    }
}

impl From<DomainError> for ServiceError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::Validation { field, message } => Self::Validation { field, message },
            DomainError::InsufficientStock {
                item_id,
                item_name,
                available,
                requested,
            } => Self::InsufficientStock {
                item_id,
                item_name,
                available,
                requested,
            },
            DomainError::LineNotFound { .. } => Self::not_found("Item not in cart"),
            DomainError::InvalidTransition { current, action } => {
                Self::InvalidTransition { current, action }
            }
        }
    }
}

impl From<StoreError> for ServiceError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::ItemNotFound(_) => Self::not_found("Item not found"),
            StoreError::OrderNotFound(_) => Self::not_found("Order not found"),
            StoreError::DuplicateItemNo(item_no) => {
                Self::validation("itemNo", format!("{item_no} is already in use"))
            }
            // The store only knows the id. Callers holding the order lines
            // map this variant themselves to name the item.
            StoreError::InsufficientStock {
                item_id,
                available,
                requested,
            } => Self::InsufficientStock {
                item_id,
                item_name: item_id.to_string(),
                available,
                requested,
            },
            StoreError::StatusConflict { actual, .. } => Self::InvalidTransition {
                current: actual,
                action: "update",
            },
            other => Self::Unexpected(other.to_string()),
        }
    }
}

/// Result type for service operations.
pub type Result<T> = std::result::Result<T, ServiceError>;
