//! Client checkout orchestrator
//!
//! `idle -> submitting -> ready -> {expired, error}`. The countdown is a UX
//! aid only; the server reaper owns the real expiry.

mod orchestrator;
mod state;
mod store;

pub use orchestrator::{CheckoutApi, CheckoutOrchestrator, SubmitOutcome};
pub use state::{
    CheckoutFailure, CheckoutState, FailureReason, PendingCheckout, RecoveryHint,
    format_countdown,
};
pub use store::PendingStore;
