//! Unified error system for the shop
//!
//! - [`ErrorCode`]: Standardized error codes for all error types
//! - [`ErrorCategory`]: Classification of errors by domain
//! - [`AppError`]: Rich error type with codes, messages, and details
//! - [`ApiResponse`]: Unified API response format
//!
//! # Error Code Ranges
//!
//! - 0xxx: General errors
//! - 1xxx: Operator authentication errors
//! - 4xxx: Order / reservation errors
//! - 5xxx: Payment errors
//! - 6xxx: Product errors
//! - 9xxx: System errors
//!
//! Every error response carries `details.reason`, one of `validation`,
//! `inventory_issue`, `gateway_error`, `signature_invalid`,
//! `already_settled`, `not_found`, `unauthorized` or `internal`.
//!
//! # Example
//!
//! ```
//! use shared::error::{AppError, ErrorCode, ApiResponse};
//!
//! let err = AppError::insufficient_stock("prod-1", 0);
//! assert_eq!(err.code, ErrorCode::InsufficientStock);
//!
//! let response = ApiResponse::<()>::error(&err);
//! assert_eq!(response.reason(), Some("inventory_issue"));
//! ```

mod category;
mod codes;
mod http;
mod types;

pub use category::ErrorCategory;
pub use codes::{ErrorCode, InvalidErrorCode};
pub use types::{ApiResponse, AppError, AppResult};
