//! Domain models
//!
//! Persisted by the server store and serialized on the wire as-is.

pub mod order;
pub mod product;
pub mod transaction;

pub use order::{Order, OrderItem, OrderStatus};
pub use product::{Discount, DiscountType, Product, ProductView};
pub use transaction::{GatewayKind, Transaction, TransactionStatus};
