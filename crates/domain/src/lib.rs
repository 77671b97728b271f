//! Domain layer for the marketplace backend.
//!
//! This crate holds the aggregates and the invariants they protect:
//! - `CatalogItem` with its never-negative quantity-on-hand
//! - `Cart` with a total derived from its lines on every mutation
//! - `Order` with frozen line snapshots, an immutable bill and a status machine
//!
//! Nothing here performs I/O. Persistence lives in the `store` crate and
//! orchestration in `services`.

pub mod cart;
pub mod catalog;
pub mod clock;
pub mod error;
pub mod order;
pub mod value_objects;

pub use cart::{Cart, CartLine};
pub use catalog::{CatalogItem, ItemDetails};
pub use clock::{Clock, FixedClock, SystemClock};
pub use common::{ItemId, OrderId, UserId};
pub use error::DomainError;
pub use order::{NewOrder, Order, OrderLine, OrderNumber, OrderParts, OrderStatus, Transition};
pub use value_objects::{Money, PaymentMethod, ShippingAddress};
