//! Checkout and payment verification

mod service;
mod verify;

pub use service::CheckoutService;
pub use verify::VerifyService;
