//! Shared types for the shop workspace
//!
//! Wire types, the error system, domain models and the pricing engine.
//! Used by both `shop-server` and `shop-client` so that the storefront
//! display and the server-side recomputation agree on prices.

pub mod checkout;
pub mod error;
pub mod models;
pub mod pricing;
pub mod util;

// Re-exports
pub use axum::Json;
pub use http;
pub use serde::{Deserialize, Serialize};

pub use error::{ApiResponse, AppError, AppResult, ErrorCode};
pub use pricing::effective_price;
