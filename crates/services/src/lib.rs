//! Application services for the marketplace backend.
//!
//! The services load aggregates from a [`store::ShopStore`], apply domain
//! commands and persist the result. Order placement and cancellation hand
//! their multi-step writes to the store as single atomic units.

pub mod cart;
pub mod catalog;
pub mod error;
pub mod orders;
pub mod reservation;

pub use cart::{CartLineView, CartService, CartView, ItemSummary};
pub use catalog::CatalogService;
pub use error::{Result, ServiceError};
pub use orders::{Checkout, OrderService};
pub use reservation::MAX_ORDER_NUMBER_ATTEMPTS;
