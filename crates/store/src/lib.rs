//! Persistence for the marketplace backend.
//!
//! [`ShopStore`] is the storage seam. Besides plain reads and writes it
//! exposes two atomic units, [`ShopStore::place_order`] and
//! [`ShopStore::cancel_order`], which carry the stock reservation: every
//! decrement is a conditional compare-and-swap, and either all writes of
//! the unit land or none do.

pub mod error;
pub mod memory;
pub mod postgres;
pub mod query;
pub mod store;

pub use error::{Result, StoreError};
pub use memory::InMemoryShopStore;
pub use postgres::PostgresShopStore;
pub use query::OrderQuery;
pub use store::ShopStore;
