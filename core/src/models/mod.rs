// till/core/src/models/mod.rs

pub mod order;
pub mod template;

pub use order::{LineItem, NewOrder, Order, OrderStatus};
pub use template::Template;
