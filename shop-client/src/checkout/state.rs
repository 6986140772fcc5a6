use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use shared::checkout::{CheckoutRequest, CheckoutResponse};
use shared::models::GatewayKind;
use std::time::Duration;

use crate::ClientError;

/// A reservation waiting for payment, persisted so a reload resumes it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingCheckout {
    /// Transaction id returned by the server, also the gateway reference
    pub reservation_id: String,
    pub payment_url: String,
    pub amount: Decimal,
    pub currency: String,
    pub gateway: GatewayKind,
    /// Unix millis
    pub expires_at: i64,
    /// Form as submitted
    pub form: CheckoutRequest,
}

impl PendingCheckout {
    pub fn from_response(response: CheckoutResponse, form: CheckoutRequest) -> Self {
        Self {
            reservation_id: response.transaction_id,
            payment_url: response.payment_url,
            amount: response.amount,
            currency: response.currency,
            gateway: response.gateway,
            expires_at: response.expires_at,
            form,
        }
    }

    pub fn is_expired(&self, now: i64) -> bool {
        now >= self.expires_at
    }

    /// Time until expiry, zero once passed
    pub fn time_left(&self, now: i64) -> Duration {
        let millis = u64::try_from(self.expires_at.saturating_sub(now)).unwrap_or(0);
        Duration::from_millis(millis)
    }
}

/// What the storefront should offer after a failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoveryHint {
    /// Reservation is gone; build a new cart
    StartOver,
    /// Same form can be submitted again
    TryAgain,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureReason {
    StockUnavailable,
    PaymentFailed,
    /// Reservation window elapsed before payment
    TimedOut,
    Validation,
    Network,
}

impl FailureReason {
    pub fn hint(&self) -> RecoveryHint {
        match self {
            Self::TimedOut => RecoveryHint::StartOver,
            _ => RecoveryHint::TryAgain,
        }
    }

    /// Map a server reason string (`details.reason`)
    pub fn from_reason(reason: &str) -> Self {
        match reason {
            "inventory_issue" => Self::StockUnavailable,
            "validation" | "not_found" => Self::Validation,
            "gateway_error" | "signature_invalid" | "already_settled" => Self::PaymentFailed,
            _ => Self::Network,
        }
    }
}

impl From<&ClientError> for FailureReason {
    fn from(err: &ClientError) -> Self {
        match err.reason() {
            Some(reason) => Self::from_reason(reason),
            None => Self::Network,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutFailure {
    pub reason: FailureReason,
    pub message: String,
}

impl CheckoutFailure {
    pub fn new(reason: FailureReason, message: impl Into<String>) -> Self {
        Self {
            reason,
            message: message.into(),
        }
    }

    pub fn hint(&self) -> RecoveryHint {
        self.reason.hint()
    }
}

impl From<&ClientError> for CheckoutFailure {
    fn from(err: &ClientError) -> Self {
        Self::new(FailureReason::from(err), err.to_string())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum CheckoutState {
    Idle,
    Submitting,
    Ready(PendingCheckout),
    Expired(PendingCheckout),
    Error(CheckoutFailure),
}

impl CheckoutState {
    pub fn pending(&self) -> Option<&PendingCheckout> {
        match self {
            Self::Ready(p) => Some(p),
            _ => None,
        }
    }

    /// Failure to show, expiry included
    pub fn failure(&self) -> Option<CheckoutFailure> {
        match self {
            Self::Expired(_) => Some(CheckoutFailure::new(
                FailureReason::TimedOut,
                "Reservation expired before payment",
            )),
            Self::Error(f) => Some(f.clone()),
            _ => None,
        }
    }
}

/// `M:SS`, minutes unbounded
pub fn format_countdown(left: Duration) -> String {
    let secs = left.as_secs();
    format!("{}:{:02}", secs / 60, secs % 60)
}
