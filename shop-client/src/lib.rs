//! Shop Client - storefront side of checkout
//!
//! HTTP calls to the shop server plus the checkout orchestrator that
//! drives a single checkout from the form to the payment page and back.

pub mod checkout;
pub mod config;
pub mod error;
pub mod http;

pub use checkout::{
    CheckoutApi, CheckoutFailure, CheckoutOrchestrator, CheckoutState, FailureReason,
    PendingCheckout, PendingStore, RecoveryHint, SubmitOutcome, format_countdown,
};
pub use config::ClientConfig;
pub use error::{ClientError, ClientResult};
pub use http::HttpClient;

// Re-export shared types for convenience
pub use shared::checkout::{
    CheckoutRequest, CheckoutResponse, CustomerInfo, ReserveItem, VerifyResponse, VerifyStatus,
};
