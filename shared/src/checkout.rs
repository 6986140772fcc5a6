//! Checkout wire types
//!
//! Request and response bodies for the checkout, verify and cleanup
//! endpoints, shared by the server handlers and the client orchestrator.

use crate::error::AppError;
use crate::models::{GatewayKind, OrderStatus};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError, ValidationErrors, ValidationErrorsKind};

fn non_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new("blank"));
    }
    Ok(())
}

/// One requested line; price is never accepted from the caller
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct ReserveItem {
    #[validate(length(min = 1, max = 200))]
    pub product_id: String,
    #[validate(range(min = 1, max = 9999))]
    pub quantity: i64,
}

/// Customer contact fields captured on the order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct CustomerInfo {
    #[validate(email, length(max = 254))]
    pub email: String,
    #[validate(custom(function = "non_blank"), length(max = 200))]
    pub customer_name: String,
    #[validate(custom(function = "non_blank"), length(max = 100))]
    pub phone: String,
    #[validate(custom(function = "non_blank"), length(max = 500))]
    pub address: String,
}

/// `POST /api/checkout`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct CheckoutRequest {
    #[serde(flatten)]
    #[validate(nested)]
    pub customer: CustomerInfo,
    #[validate(length(min = 1), nested)]
    pub items: Vec<ReserveItem>,
    /// Falls back to the server's default gateway
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gateway: Option<GatewayKind>,
}

impl CheckoutRequest {
    /// Run field validation, mapping failures to a `validation` AppError
    pub fn check(&self) -> Result<(), AppError> {
        self.validate().map_err(validation_error)
    }
}

/// Map validator output to an AppError listing the offending fields
pub fn validation_error(errors: ValidationErrors) -> AppError {
    let mut fields = Vec::new();
    collect_fields(&errors, "", &mut fields);
    fields.sort();
    AppError::validation(format!("Invalid checkout request: {}", fields.join(", ")))
        .with_detail("fields", fields)
}

/// Flattened field paths, e.g. `email` or `items[0].quantity`
fn collect_fields(errors: &ValidationErrors, prefix: &str, out: &mut Vec<String>) {
    for (field, kind) in errors.errors() {
        match kind {
            ValidationErrorsKind::Field(_) => out.push(format!("{prefix}{field}")),
            // flattened on the wire, so no prefix
            ValidationErrorsKind::Struct(inner) => collect_fields(inner, prefix, out),
            ValidationErrorsKind::List(entries) => {
                for (idx, inner) in entries {
                    collect_fields(inner, &format!("{prefix}{field}[{idx}]."), out);
                }
            }
        }
    }
}

/// Result of a successful reservation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reservation {
    pub transaction_id: String,
    pub order_id: String,
    pub amount: Decimal,
    pub expires_at: i64,
}

/// Response of `POST /api/checkout`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckoutResponse {
    pub transaction_id: String,
    pub amount: Decimal,
    pub currency: String,
    pub expires_at: i64,
    pub payment_url: String,
    pub gateway: GatewayKind,
}

/// `POST /api/verify-payment`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerifyRequest {
    pub reference: String,
}

/// Payment outcome as reported to the storefront
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerifyStatus {
    Success,
    Pending,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerifyResponse {
    pub status: VerifyStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Response of `POST /api/cleanup-orders`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CleanupResponse {
    pub abandoned_count: usize,
}

/// `PATCH /api/admin/orders/{id}/status`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateOrderStatus {
    pub status: OrderStatus,
}
