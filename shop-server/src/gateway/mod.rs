//! Payment gateway adapters
//!
//! Paystack and Flutterwave behind one [`PaymentGateway`] trait. Callers
//! pick an adapter from the [`GatewayRegistry`] by the `GatewayKind`
//! persisted on the transaction; settlement never sees which gateway
//! produced an outcome.
//!
//! Both adapters talk plain REST through `reqwest` (no SDKs).

pub mod flutterwave;
pub mod paystack;

#[cfg(test)]
pub(crate) mod mock;

use async_trait::async_trait;
use http::HeaderMap;
use rust_decimal::Decimal;
use rust_decimal::prelude::FromPrimitive;
use serde_json::Value;
use shared::checkout::VerifyStatus;
use shared::models::GatewayKind;
use shared::{AppError, ErrorCode};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

pub use flutterwave::FlutterwaveGateway;
pub use paystack::PaystackGateway;

/// Upstream body characters kept in error messages
const MAX_ERROR_BODY: usize = 512;

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("{gateway} request failed: {source}")]
    Http {
        gateway: GatewayKind,
        #[source]
        source: reqwest::Error,
    },

    #[error("{0} request timed out")]
    Timeout(GatewayKind),

    #[error("{gateway} returned HTTP {status}: {body}")]
    Status {
        gateway: GatewayKind,
        status: u16,
        body: String,
    },

    #[error("{gateway} rejected the request: {message}")]
    Rejected { gateway: GatewayKind, message: String },

    #[error("{gateway} response malformed: {reason}")]
    Malformed { gateway: GatewayKind, reason: String },

    #[error("Amount {0} cannot be expressed in minor units")]
    InvalidAmount(Decimal),

    #[error("Missing signature header {0}")]
    MissingSignature(&'static str),

    #[error("Webhook signature mismatch")]
    InvalidSignature,

    #[error("Invalid webhook payload: {0}")]
    InvalidPayload(String),

    #[error("Payment gateway {0} is not configured")]
    NotConfigured(GatewayKind),

    #[error("Failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),
}

impl GatewayError {
    pub(crate) fn http(gateway: GatewayKind, source: reqwest::Error) -> Self {
        if source.is_timeout() {
            Self::Timeout(gateway)
        } else {
            Self::Http { gateway, source }
        }
    }

    pub(crate) fn malformed(gateway: GatewayKind, reason: impl Into<String>) -> Self {
        Self::Malformed {
            gateway,
            reason: reason.into(),
        }
    }

    /// Webhook authenticity failures (respond 401, never settle)
    pub fn is_signature_error(&self) -> bool {
        matches!(self, Self::MissingSignature(_) | Self::InvalidSignature)
    }
}

impl From<GatewayError> for AppError {
    fn from(err: GatewayError) -> Self {
        let message = err.to_string();
        match err {
            GatewayError::MissingSignature(_) | GatewayError::InvalidSignature => {
                AppError::new(ErrorCode::SignatureInvalid)
            }
            GatewayError::InvalidPayload(_) => AppError::invalid_request(message),
            GatewayError::NotConfigured(kind) => {
                AppError::with_message(ErrorCode::UnsupportedGateway, message)
                    .with_detail("gateway", kind.as_str())
            }
            GatewayError::Client(_) => AppError::internal(message),
            _ => AppError::gateway(message),
        }
    }
}

/// Everything a gateway needs to open a hosted payment page
#[derive(Debug, Clone, PartialEq)]
pub struct InitializeRequest {
    /// Our transaction id, used as the gateway reference
    pub reference: String,
    /// Major currency units
    pub amount: Decimal,
    pub currency: String,
    pub email: String,
    pub customer_name: String,
    pub phone: String,
    /// Where the gateway sends the buyer afterwards
    pub redirect_url: String,
}

/// Gateway-reported state of a payment
#[derive(Debug, Clone, PartialEq)]
pub struct VerifyOutcome {
    pub status: VerifyStatus,
    pub message: Option<String>,
    /// Raw gateway payload, stored on the transaction when settled
    pub raw: Value,
}

/// What a verified webhook asks us to do
#[derive(Debug, Clone, PartialEq)]
pub enum WebhookEvent {
    Settle {
        reference: String,
        success: bool,
        payload: Value,
    },
    /// Authentic but not a terminal payment event; acknowledge only
    Ignored { event: String },
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    fn kind(&self) -> GatewayKind;

    /// Create a payment and return the hosted payment page URL
    async fn initialize(&self, request: &InitializeRequest) -> Result<String, GatewayError>;

    /// Ask the gateway for the current state of `reference`
    async fn verify(&self, reference: &str) -> Result<VerifyOutcome, GatewayError>;

    /// Check the webhook signature over the raw body
    fn verify_signature(&self, headers: &HeaderMap, body: &[u8]) -> Result<(), GatewayError>;

    /// Extract reference and outcome from an authenticated webhook body
    fn parse_webhook(&self, body: &[u8]) -> Result<WebhookEvent, GatewayError>;
}

/// Configured gateways, keyed by kind
#[derive(Clone)]
pub struct GatewayRegistry {
    gateways: HashMap<GatewayKind, Arc<dyn PaymentGateway>>,
    default: GatewayKind,
}

impl GatewayRegistry {
    pub fn new(default: GatewayKind) -> Self {
        Self {
            gateways: HashMap::new(),
            default,
        }
    }

    pub fn with(mut self, gateway: Arc<dyn PaymentGateway>) -> Self {
        self.gateways.insert(gateway.kind(), gateway);
        self
    }

    pub fn default_kind(&self) -> GatewayKind {
        self.default
    }

    pub fn get(&self, kind: GatewayKind) -> Result<Arc<dyn PaymentGateway>, GatewayError> {
        self.gateways
            .get(&kind)
            .cloned()
            .ok_or(GatewayError::NotConfigured(kind))
    }
}

/// Build the shared reqwest client for an adapter
pub(crate) fn build_client(timeout: std::time::Duration) -> Result<reqwest::Client, GatewayError> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(GatewayError::Client)
}

/// Join base URL and path without doubling slashes
pub(crate) fn join_url(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

/// Read a JSON body, turning non-2xx into [`GatewayError::Status`]
pub(crate) async fn read_json(
    gateway: GatewayKind,
    resp: reqwest::Response,
) -> Result<Value, GatewayError> {
    let status = resp.status();
    if !status.is_success() {
        let body: String = resp
            .text()
            .await
            .unwrap_or_default()
            .chars()
            .take(MAX_ERROR_BODY)
            .collect();
        return Err(GatewayError::Status {
            gateway,
            status: status.as_u16(),
            body,
        });
    }
    resp.json::<Value>()
        .await
        .map_err(|e| GatewayError::malformed(gateway, e.to_string()))
}

/// Read a money field that may arrive as a number or a numeric string
pub(crate) fn decimal_field(value: &Value) -> Option<Decimal> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .map(Decimal::from)
            .or_else(|| n.as_f64().and_then(Decimal::from_f64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Header value as &str, or `MissingSignature`
pub(crate) fn signature_header<'a>(
    headers: &'a HeaderMap,
    name: &'static str,
) -> Result<&'a str, GatewayError> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or(GatewayError::MissingSignature(name))
}
