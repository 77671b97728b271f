//! Order aggregate and related types.

mod aggregate;
mod number;
mod status;

pub use aggregate::{NewOrder, Order, OrderLine, OrderParts, Transition};
pub use number::OrderNumber;
pub use status::OrderStatus;
