//! Reservation store

mod storage;

pub use storage::{PendingEntry, ShopStorage, StorageError, StorageResult};
