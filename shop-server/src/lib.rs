//! Shop Server - order reservation and payment reconciliation
//!
//! # Modules
//!
//! - [`store`] - redb-backed store for products, orders and transactions
//! - [`reservation`] - atomic stock reservation
//! - [`settlement`] - idempotent settlement, the only path to a terminal state
//! - [`gateway`] - Paystack and Flutterwave adapters
//! - [`checkout`] - checkout orchestration and the verify fallback
//! - [`reaper`] - expiry sweep
//! - [`api`] - HTTP routes
//! - [`core`] - config, state, background tasks, server

pub mod api;
pub mod catalog;
pub mod checkout;
pub mod core;
pub mod gateway;
pub mod orders;
pub mod reaper;
pub mod reservation;
pub mod settlement;
pub mod store;
pub mod utils;

pub use crate::core::{Config, Server, ServerError, ServerState};
