//! Startup and runtime errors outside request handling

use thiserror::Error;

use crate::gateway::GatewayError;
use crate::store::StorageError;

#[derive(Error, Debug)]
pub enum ServerError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Gateway setup failed: {0}")]
    Gateway(#[from] GatewayError),

    #[error("Catalog seed {path}: {reason}")]
    Seed { path: String, reason: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ServerError>;
