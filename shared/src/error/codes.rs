//! Unified error codes for the shop
//!
//! Error codes are organized by category:
//! - 0xxx: General errors
//! - 1xxx: Operator authentication errors
//! - 4xxx: Order / reservation errors
//! - 5xxx: Payment errors
//! - 6xxx: Product errors
//! - 9xxx: System errors

use serde::{Deserialize, Serialize};
use std::fmt;

/// Unified error code enum
///
/// Represented as u16 on the wire so the storefront can switch on the
/// number without parsing messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u16", try_from = "u16")]
#[repr(u16)]
pub enum ErrorCode {
    // ==================== 0xxx: General ====================
    /// Operation completed successfully
    Success = 0,
    /// Unknown error
    Unknown = 1,
    /// Validation failed
    ValidationFailed = 2,
    /// Resource not found
    NotFound = 3,
    /// Invalid request
    InvalidRequest = 5,
    /// Invalid format
    InvalidFormat = 6,
    /// Required field missing
    RequiredField = 7,
    /// Value out of range
    ValueOutOfRange = 8,

    // ==================== 1xxx: Auth ====================
    /// Operator token missing or wrong
    NotAuthenticated = 1001,

    // ==================== 4xxx: Order ====================
    /// Order not found
    OrderNotFound = 4001,
    /// Not enough stock to reserve the requested quantity
    InsufficientStock = 4002,
    /// Order status transition not allowed
    InvalidStatusTransition = 4003,
    /// Order has no items
    OrderEmpty = 4004,
    /// Item quantity must be positive
    InvalidQuantity = 4005,

    // ==================== 5xxx: Payment ====================
    /// Payment gateway call failed or returned malformed data
    PaymentGatewayError = 5001,
    /// Webhook signature rejected
    SignatureInvalid = 5002,
    /// Transaction reference unknown
    TransactionNotFound = 5003,
    /// Transaction already in a terminal state
    AlreadySettled = 5004,
    /// Gateway not configured
    UnsupportedGateway = 5005,

    // ==================== 6xxx: Product ====================
    /// Product not found
    ProductNotFound = 6001,
    /// Product has invalid price
    ProductInvalidPrice = 6002,

    // ==================== 9xxx: System ====================
    /// Internal server error
    InternalError = 9001,
    /// Database error
    DatabaseError = 9002,
    /// Network error
    NetworkError = 9003,
    /// Operation timed out
    TimeoutError = 9004,
    /// Configuration error
    ConfigError = 9005,
}

impl ErrorCode {
    /// Get the numeric code value
    #[inline]
    pub const fn code(&self) -> u16 {
        *self as u16
    }

    /// Check if this is a success code
    #[inline]
    pub const fn is_success(&self) -> bool {
        matches!(self, ErrorCode::Success)
    }

    /// Get the developer-facing English message for this error code
    pub const fn message(&self) -> &'static str {
        match self {
            ErrorCode::Success => "Operation completed successfully",
            ErrorCode::Unknown => "An unknown error occurred",
            ErrorCode::ValidationFailed => "Validation failed",
            ErrorCode::NotFound => "Resource not found",
            ErrorCode::InvalidRequest => "Invalid request",
            ErrorCode::InvalidFormat => "Invalid format",
            ErrorCode::RequiredField => "Required field is missing",
            ErrorCode::ValueOutOfRange => "Value is out of range",

            ErrorCode::NotAuthenticated => "Operator token is missing or invalid",

            ErrorCode::OrderNotFound => "Order not found",
            ErrorCode::InsufficientStock => "Insufficient stock for one or more items",
            ErrorCode::InvalidStatusTransition => "Order status transition is not allowed",
            ErrorCode::OrderEmpty => "Order has no items",
            ErrorCode::InvalidQuantity => "Item quantity must be positive",

            ErrorCode::PaymentGatewayError => "Payment gateway request failed",
            ErrorCode::SignatureInvalid => "Webhook signature is invalid",
            ErrorCode::TransactionNotFound => "Transaction not found",
            ErrorCode::AlreadySettled => "Transaction has already been settled",
            ErrorCode::UnsupportedGateway => "Payment gateway is not configured",

            ErrorCode::ProductNotFound => "Product not found",
            ErrorCode::ProductInvalidPrice => "Product has an invalid price",

            ErrorCode::InternalError => "Internal server error",
            ErrorCode::DatabaseError => "Database error",
            ErrorCode::NetworkError => "Network error",
            ErrorCode::TimeoutError => "Operation timed out",
            ErrorCode::ConfigError => "Configuration error",
        }
    }

    /// Machine-readable failure reason shown to the storefront
    ///
    /// Lets the checkout page tell "stock unavailable" from "payment failed"
    /// without depending on individual numeric codes.
    pub const fn reason(&self) -> &'static str {
        match self {
            ErrorCode::Success => "ok",

            ErrorCode::ValidationFailed
            | ErrorCode::InvalidRequest
            | ErrorCode::InvalidFormat
            | ErrorCode::RequiredField
            | ErrorCode::ValueOutOfRange
            | ErrorCode::OrderEmpty
            | ErrorCode::InvalidQuantity
            | ErrorCode::InvalidStatusTransition
            | ErrorCode::UnsupportedGateway
            | ErrorCode::ProductInvalidPrice => "validation",

            ErrorCode::InsufficientStock => "inventory_issue",
            ErrorCode::PaymentGatewayError => "gateway_error",
            ErrorCode::SignatureInvalid => "signature_invalid",
            ErrorCode::NotAuthenticated => "unauthorized",
            ErrorCode::AlreadySettled => "already_settled",

            ErrorCode::NotFound
            | ErrorCode::OrderNotFound
            | ErrorCode::TransactionNotFound
            | ErrorCode::ProductNotFound => "not_found",

            ErrorCode::Unknown
            | ErrorCode::InternalError
            | ErrorCode::DatabaseError
            | ErrorCode::NetworkError
            | ErrorCode::TimeoutError
            | ErrorCode::ConfigError => "internal",
        }
    }
}

impl From<ErrorCode> for u16 {
    #[inline]
    fn from(code: ErrorCode) -> Self {
        code.code()
    }
}

/// Error returned when a u16 does not map to a known [`ErrorCode`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidErrorCode(pub u16);

impl fmt::Display for InvalidErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid error code: {}", self.0)
    }
}

impl std::error::Error for InvalidErrorCode {}

impl TryFrom<u16> for ErrorCode {
    type Error = InvalidErrorCode;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        match value {
            // General
            0 => Ok(ErrorCode::Success),
            1 => Ok(ErrorCode::Unknown),
            2 => Ok(ErrorCode::ValidationFailed),
            3 => Ok(ErrorCode::NotFound),
            5 => Ok(ErrorCode::InvalidRequest),
            6 => Ok(ErrorCode::InvalidFormat),
            7 => Ok(ErrorCode::RequiredField),
            8 => Ok(ErrorCode::ValueOutOfRange),

            // Auth
            1001 => Ok(ErrorCode::NotAuthenticated),

            // Order
            4001 => Ok(ErrorCode::OrderNotFound),
            4002 => Ok(ErrorCode::InsufficientStock),
            4003 => Ok(ErrorCode::InvalidStatusTransition),
            4004 => Ok(ErrorCode::OrderEmpty),
            4005 => Ok(ErrorCode::InvalidQuantity),

            // Payment
            5001 => Ok(ErrorCode::PaymentGatewayError),
            5002 => Ok(ErrorCode::SignatureInvalid),
            5003 => Ok(ErrorCode::TransactionNotFound),
            5004 => Ok(ErrorCode::AlreadySettled),
            5005 => Ok(ErrorCode::UnsupportedGateway),

            // Product
            6001 => Ok(ErrorCode::ProductNotFound),
            6002 => Ok(ErrorCode::ProductInvalidPrice),

            // System
            9001 => Ok(ErrorCode::InternalError),
            9002 => Ok(ErrorCode::DatabaseError),
            9003 => Ok(ErrorCode::NetworkError),
            9004 => Ok(ErrorCode::TimeoutError),
            9005 => Ok(ErrorCode::ConfigError),

            _ => Err(InvalidErrorCode(value)),
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}
