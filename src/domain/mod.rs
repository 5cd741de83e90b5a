//! Domain types: orders, the price-time tracker, the ordered order sets
//! built from it, and the trade event the book emits on a match.

pub mod order;
pub mod order_set;
pub mod trade;
pub mod tracker;

pub use order::{Order, OrderKind, OrderParams, Side, MIN_QTY};
pub use order_set::{ActiveOrderSet, StopOrderSet};
pub use trade::EventTradeSuccess;
pub use tracker::OrderTracker;
