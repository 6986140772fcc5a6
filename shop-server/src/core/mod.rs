//! Core: configuration, shared state, background tasks and the server
//!
//! - [`Config`] - environment configuration
//! - [`ServerState`] - services shared by handlers
//! - [`Server`] - HTTP server
//! - [`BackgroundTasks`] - spawned task registry
//! - [`ServerError`] - startup errors

pub mod config;
pub mod error;
pub mod server;
pub mod state;
pub mod tasks;

pub use config::Config;
pub use error::{Result, ServerError};
pub use server::Server;
pub use state::ServerState;
pub use tasks::BackgroundTasks;
